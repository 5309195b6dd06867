use crate::model::RowId;

/// The website (tenant) a dashboard action runs on behalf of.
///
/// Passed explicitly into every orchestration call instead of being read from
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub website_id: RowId,
}

impl SessionContext {
    pub fn for_website(website_id: RowId) -> Self {
        Self { website_id }
    }
}
