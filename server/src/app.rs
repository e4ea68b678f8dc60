use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let app = Router::new()
        .route(
            "/api/territories",
            get(routes::api::list_territories).post(routes::api::insert_territory),
        )
        .route(
            "/api/territories/{id}",
            put(routes::api::update_territory).delete(routes::api::delete_territory),
        )
        .route("/api/ranking", get(routes::api::ranking))
        .route("/api/events", get(routes::sse::territory_events))
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics));

    app.layer(CompressionLayer::new())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}
