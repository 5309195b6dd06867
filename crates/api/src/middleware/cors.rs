use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS for the JSON endpoints. Session cookies are only sent
/// same-origin, so credentials are not allowed cross-origin.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
