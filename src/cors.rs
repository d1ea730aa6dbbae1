use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build the CORS layer attached to all routes.
///
/// Credentialed requests require the allowed origin to match the request
/// origin, so the request's origin is mirrored rather than using a wildcard.
pub fn layer() -> CorsLayer {
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN])
        .allow_methods([
            Method::DELETE,
            Method::GET,
            Method::OPTIONS,
            Method::POST,
            Method::PUT,
        ])
        .allow_origin(AllowOrigin::mirror_request())
}
