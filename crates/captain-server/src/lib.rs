pub mod error;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue};
use axum::routing::{delete, get, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Cards
        .route(
            "/v1/card/{card_id}",
            get(routes::cards::get_card)
                .put(routes::cards::put_card)
                .post(routes::cards::put_card),
        )
        // Robot control through a card
        .route("/v1/card/{card_id}/run", get(routes::control::run))
        .route("/v1/card/{card_id}/stop", get(routes::control::stop))
        .route("/v1/card/{card_id}/ping", get(routes::control::ping))
        .route(
            "/v1/card/{card_id}/upload",
            get(routes::control::upload)
                .put(routes::control::upload)
                .post(routes::control::upload),
        )
        // Robots
        .route("/v1/robots", get(routes::robots::list_robots))
        .route(
            "/v1/robot/{name}",
            get(routes::robots::get_robot)
                .put(routes::robots::put_robot)
                .post(routes::robots::put_robot)
                .delete(routes::robots::delete_robot),
        )
        .route("/v1/robot/{name}/ping", get(routes::robots::ping_robot))
        .route(
            "/v1/robot/{name}/card/{card_id}",
            put(routes::robots::associate).post(routes::robots::associate),
        )
        .route("/v1/robot/{name}/card", delete(routes::robots::dissociate))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the card-store service on `0.0.0.0:{port}`.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener).await
}

/// Start the service on a pre-bound listener, so the caller can read the
/// actual port first when binding port 0.
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(app_state);

    tracing::info!("Captain card store listening on http://localhost:{actual_port}/v1");

    axum::serve(listener, app).await?;
    Ok(())
}
