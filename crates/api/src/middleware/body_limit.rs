use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body. Article text sent for metadata is the
/// biggest payload.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn body_limit_layer() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_BODY_BYTES)
}
