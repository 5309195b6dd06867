//! SEO form state and its field rules.
//!
//! The bounds and messages are product requirements and are reproduced as
//! shipped. Two of them are known to disagree with their own wording: the
//! SEO title message says "less than 60" while the check allows up to 80,
//! and the page title demands *at least* 70 characters.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug pattern is valid"));

pub const SEO_TITLE_MIN: usize = 10;
pub const SEO_TITLE_MAX: usize = 80;
pub const SEO_DESCRIPTION_MIN: usize = 110;
pub const SEO_DESCRIPTION_MAX: usize = 180;
pub const TITLE_MIN: usize = 70;
pub const MIN_KEYWORDS: usize = 3;

/// Fields with validation rules, keyed by their form names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeoField {
    SeoTitle,
    SeoKeywords,
    SeoDescription,
    Title,
    Slug,
}

impl SeoField {
    pub const ALL: [SeoField; 5] = [
        SeoField::SeoTitle,
        SeoField::SeoKeywords,
        SeoField::SeoDescription,
        SeoField::Title,
        SeoField::Slug,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeoField::SeoTitle => "seoTitle",
            SeoField::SeoKeywords => "seoKeywords",
            SeoField::SeoDescription => "seoDescription",
            SeoField::Title => "title",
            SeoField::Slug => "slug",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("SEO title is required")]
    SeoTitleRequired,
    #[error("SEO title must be at least 10 characters")]
    SeoTitleTooShort,
    #[error("SEO title must be less than 60 characters")]
    SeoTitleTooLong,
    #[error("SEO keywords are required")]
    KeywordsRequired,
    #[error("Please enter at least 3 keywords, separated by commas")]
    TooFewKeywords,
    #[error("SEO description is required")]
    SeoDescriptionRequired,
    #[error("SEO description must be at least 110 characters")]
    SeoDescriptionTooShort,
    #[error("SEO description must be less than 180 characters")]
    SeoDescriptionTooLong,
    #[error("Title is required")]
    TitleRequired,
    #[error("Title must be at least 70 characters")]
    TitleTooShort,
    #[error("Slug is required")]
    SlugRequired,
    #[error("Slug can only contain lowercase letters, numbers, and hyphens")]
    SlugInvalid,
}

/// Apply the rule for `field` to `value`.
pub fn check(field: SeoField, value: &str) -> Result<(), FieldError> {
    let blank = value.trim().is_empty();
    let len = value.chars().count();

    match field {
        SeoField::SeoTitle => {
            if blank {
                Err(FieldError::SeoTitleRequired)
            } else if len < SEO_TITLE_MIN {
                Err(FieldError::SeoTitleTooShort)
            } else if len > SEO_TITLE_MAX {
                Err(FieldError::SeoTitleTooLong)
            } else {
                Ok(())
            }
        }
        SeoField::SeoKeywords => {
            if blank {
                Err(FieldError::KeywordsRequired)
            } else if keyword_count(value) < MIN_KEYWORDS {
                Err(FieldError::TooFewKeywords)
            } else {
                Ok(())
            }
        }
        SeoField::SeoDescription => {
            if blank {
                Err(FieldError::SeoDescriptionRequired)
            } else if len < SEO_DESCRIPTION_MIN {
                Err(FieldError::SeoDescriptionTooShort)
            } else if len > SEO_DESCRIPTION_MAX {
                Err(FieldError::SeoDescriptionTooLong)
            } else {
                Ok(())
            }
        }
        SeoField::Title => {
            if blank {
                Err(FieldError::TitleRequired)
            } else if len < TITLE_MIN {
                Err(FieldError::TitleTooShort)
            } else {
                Ok(())
            }
        }
        SeoField::Slug => {
            if blank {
                Err(FieldError::SlugRequired)
            } else if !SLUG_PATTERN.is_match(value) {
                Err(FieldError::SlugInvalid)
            } else {
                Ok(())
            }
        }
    }
}

/// Comma-separated keywords, ignoring blank pieces: `"a,,b"` and `"a, b,"`
/// both count 2, so padding the list with commas cannot satisfy the minimum.
fn keyword_count(value: &str) -> usize {
    value
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .count()
}

/// Values and per-field errors of the SEO editing form.
#[derive(Debug, Clone, Default)]
pub struct SeoForm {
    values: BTreeMap<SeoField, String>,
    errors: BTreeMap<SeoField, FieldError>,
}

impl SeoForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value without validating it.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        if let Some(field) = SeoField::parse(name) {
            self.values.insert(field, value.into());
        }
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        SeoField::parse(name)
            .and_then(|f| self.values.get(&f))
            .map(String::as_str)
    }

    /// Validate one field, recording or clearing its error. Fields without a
    /// rule always pass.
    pub fn validate_field(&mut self, name: &str, value: &str) -> bool {
        let Some(field) = SeoField::parse(name) else {
            return true;
        };
        match check(field, value) {
            Ok(()) => {
                self.errors.remove(&field);
                true
            }
            Err(e) => {
                self.errors.insert(field, e);
                false
            }
        }
    }

    /// Validate every ruled field against its stored value (missing values
    /// count as empty). All errors are recorded; no short-circuit.
    pub fn validate_all_fields(&mut self) -> bool {
        SeoField::ALL.into_iter().fold(true, |ok, field| {
            let value = self.values.get(&field).cloned().unwrap_or_default();
            self.validate_field(field.name(), &value) && ok
        })
    }

    /// Human-readable error for a field, if any.
    pub fn error(&self, name: &str) -> Option<String> {
        SeoField::parse(name)
            .and_then(|f| self.errors.get(&f))
            .map(ToString::to_string)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&'static str, String)> + '_ {
        self.errors.iter().map(|(f, e)| (f.name(), e.to_string()))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Clear values and errors together.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(n: usize) -> String {
        "a".repeat(n)
    }

    #[test]
    fn keyword_boundary() {
        let mut form = SeoForm::new();
        assert!(!form.validate_field("seoKeywords", "plumbing, pipes"));
        assert_eq!(
            form.error("seoKeywords").as_deref(),
            Some("Please enter at least 3 keywords, separated by commas")
        );
        assert!(form.validate_field("seoKeywords", "plumbing, pipes, repair"));
        assert_eq!(form.error("seoKeywords"), None);
    }

    #[test]
    fn empty_keyword_tokens_do_not_count() {
        assert_eq!(check(SeoField::SeoKeywords, "a,,b, ,"), Err(FieldError::TooFewKeywords));
        assert_eq!(keyword_count("a,,b"), 2);
        assert_eq!(keyword_count("a, b, c"), 3);
    }

    #[test]
    fn seo_title_bounds_and_message_mismatch() {
        assert_eq!(check(SeoField::SeoTitle, &chars(9)), Err(FieldError::SeoTitleTooShort));
        assert!(check(SeoField::SeoTitle, &chars(10)).is_ok());
        assert!(check(SeoField::SeoTitle, &chars(70)).is_ok());
        assert!(check(SeoField::SeoTitle, &chars(80)).is_ok());
        let err = check(SeoField::SeoTitle, &chars(81)).unwrap_err();
        assert_eq!(err.to_string(), "SEO title must be less than 60 characters");
    }

    #[test]
    fn seo_description_bounds() {
        assert!(check(SeoField::SeoDescription, &chars(109)).is_err());
        assert!(check(SeoField::SeoDescription, &chars(110)).is_ok());
        assert!(check(SeoField::SeoDescription, &chars(180)).is_ok());
        assert_eq!(
            check(SeoField::SeoDescription, &chars(181)),
            Err(FieldError::SeoDescriptionTooLong)
        );
    }

    #[test]
    fn title_has_lower_bound_only() {
        assert_eq!(check(SeoField::Title, &chars(69)), Err(FieldError::TitleTooShort));
        assert!(check(SeoField::Title, &chars(70)).is_ok());
        assert!(check(SeoField::Title, &chars(500)).is_ok());
    }

    #[test]
    fn slug_pattern() {
        assert!(check(SeoField::Slug, "pipe-repair-2").is_ok());
        assert_eq!(check(SeoField::Slug, "Pipe Repair"), Err(FieldError::SlugInvalid));
        assert_eq!(check(SeoField::Slug, "pipe_repair"), Err(FieldError::SlugInvalid));
        assert_eq!(check(SeoField::Slug, "  "), Err(FieldError::SlugRequired));
    }

    #[test]
    fn unknown_fields_pass() {
        let mut form = SeoForm::new();
        assert!(form.validate_field("featuredImage", ""));
        assert!(!form.has_errors());
    }

    #[test]
    fn validate_all_records_every_error() {
        let mut form = SeoForm::new();
        form.set_value("slug", "home");
        assert!(!form.validate_all_fields());
        let fields: Vec<&str> = form.errors().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["seoTitle", "seoKeywords", "seoDescription", "title"]);
        assert_eq!(form.error("title").as_deref(), Some("Title is required"));
    }

    #[test]
    fn validate_all_passes_with_valid_values() {
        let mut form = SeoForm::new();
        form.set_value("seoTitle", "Emergency Pipe Repair in LA");
        form.set_value("seoKeywords", "pipe repair, plumber, los angeles");
        form.set_value("seoDescription", chars(150));
        form.set_value("title", chars(72));
        form.set_value("slug", "emergency-pipe-repair");
        assert!(form.validate_all_fields());
    }

    #[test]
    fn reset_clears_values_and_errors() {
        let mut form = SeoForm::new();
        form.set_value("slug", "BAD SLUG");
        form.validate_all_fields();
        assert!(form.has_errors());

        form.reset();
        assert!(!form.has_errors());
        assert_eq!(form.value("slug"), None);
    }
}
