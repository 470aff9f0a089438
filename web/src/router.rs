//! Router configuration for the composite service.

use crate::handlers::{composites, health, lookup, query, webhook};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE, LINK, LOCATION},
    },
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Composite routes, relative to the API base path.
///
/// - `POST /composites/` - Create a composite
/// - `GET /composites/` - List composites
/// - `GET /composites/:id/` - Get one breeder
/// - `PUT /composites/both/:breeder_id/:pet_id/` - Update breeder and pet
/// - `GET /composites/breeders/id/:id/` - Breeder via pub/sub
/// - `GET /composites/customers/id/:id/` - Customer via workflow
/// - `POST /composites/webhook` - Notification webhook
/// - `GET /composites/graph/breeders/:breeder_id/` - Breeder graph query
pub fn composite_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/composites/",
            post(composites::create_composite).get(composites::list_composites),
        )
        .route("/composites/:id/", get(composites::get_composite))
        .route(
            "/composites/both/:breeder_id/:pet_id/",
            put(composites::update_both),
        )
        .route("/composites/breeders/id/:id/", get(lookup::breeder_by_id))
        .route("/composites/customers/id/:id/", get(lookup::customer_by_id))
        .route("/composites/webhook", post(webhook::handle_webhook))
        .route(
            "/composites/graph/breeders/:breeder_id/",
            get(query::breeder_pets_with_waitlist),
        )
}

/// Build the complete Axum router.
///
/// Composite routes are nested under `API_BASE_PATH`; health and metrics stay
/// at the root. Every response carries `X-Correlation-ID`.
pub fn build_router(state: AppState) -> Router {
    let server = &state.config.server;
    let base_path = server.api_base_path.clone();
    let cors = cors_layer(&server.cors_origins);
    let timeout = TimeoutLayer::new(server.request_timeout);

    let root = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let app = if base_path.is_empty() {
        root.merge(composite_routes())
    } else {
        root.nest(&base_path, composite_routes())
    };

    app.with_state(state)
        .layer(timeout)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let correlation = HeaderName::from_static("x-correlation-id");

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, correlation.clone()])
        .expose_headers([LOCATION, LINK, correlation])
        .allow_credentials(true)
}
