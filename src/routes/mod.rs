pub mod gateway_routes;

use axum::routing::post;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::middleware::{handle_panic, log_requests};
use crate::service::relay_service::RelayService;
use gateway_routes::{method_not_allowed, relay_handler, route_not_found};

/// Builds the gateway router with its full middleware stack.
pub fn router(service: RelayService) -> Router {
    let routes = Router::new()
        .route("/", post(relay_handler).fallback(method_not_allowed))
        .fallback(route_not_found)
        .with_state(service);
    with_layers(routes)
}

/// Wraps `routes` in correlation ids, access logging and panic recovery.
pub fn with_layers(routes: Router) -> Router {
    routes
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(axum::middleware::from_fn(log_requests))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
