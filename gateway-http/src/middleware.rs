//! CORS/trace/request-id layering, grounded on
//! `examples/iqrahapp-iqrah-mobile/backend/crates/api/src/main.rs`'s tower
//! stack (`CorsLayer`, `SetRequestIdLayer`/`PropagateRequestIdLayer`,
//! `TraceLayer`).

use axum::http::{HeaderName, Request};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Builds a CORS layer allowing any origin matching `origin_regex`.
/// `regex::Regex::new` is validated at config-load time (§SPEC_FULL
/// ambient stack), so a bad pattern fails startup rather than silently
/// allowing nothing.
pub fn cors_layer(origin_regex: &str) -> CorsLayer {
    let regex = regex::Regex::new(origin_regex).expect("cors_allow_origin_regex must be valid");
    CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .allow_origin(tower_http::cors::AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|s| regex.is_match(s))
                .unwrap_or(false)
        }))
}

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn with_ambient_layers(router: Router, origin_regex: &str) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id_header.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    tracing::info_span!("request", method = %req.method(), uri = %req.uri())
                }),
            )
            .layer(PropagateRequestIdLayer::new(request_id_header))
            .layer(cors_layer(origin_regex)),
    )
}
