pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Build the full router, with every route nested under `/api`.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/rooms",
            get(handlers::handle_room_list).post(handlers::handle_room_create),
        )
        .route("/rooms/{room}", delete(handlers::handle_room_destroy))
        .route(
            "/rooms/{room}/keepalive/start",
            post(handlers::handle_keepalive_start),
        )
        .route(
            "/rooms/{room}/keepalive/stop",
            post(handlers::handle_keepalive_stop),
        )
        .route(
            "/rooms/{room}/peers",
            get(handlers::handle_peer_list).post(handlers::handle_peer_add),
        )
        .route(
            "/rooms/{room}/peers/{peer}",
            get(handlers::handle_peer_inspect).delete(handlers::handle_peer_remove),
        )
        .route(
            "/rooms/{room}/peers/{peer}/ping",
            post(handlers::handle_peer_ping),
        )
        .route(
            "/rooms/{room}/peers/{peer}/pong",
            post(handlers::handle_peer_pong),
        )
        .route(
            "/rooms/{room}/stats",
            post(handlers::handle_stats_create).delete(handlers::handle_stats_destroy),
        )
        .route(
            "/rooms/{room}/traffic",
            get(handlers::handle_traffic_snapshot).post(handlers::handle_traffic_record),
        )
        .route(
            "/rooms/{room}/traffic/lost",
            post(handlers::handle_traffic_lost),
        )
        .route(
            "/rooms/{room}/traffic/report",
            get(handlers::handle_traffic_report),
        )
        .route(
            "/rooms/{room}/traffic/{peer}",
            delete(handlers::handle_traffic_peer_remove),
        )
        .route("/daemon/shutdown", post(handlers::handle_shutdown))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "API listening on 127.0.0.1");
    serve_on(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: ApiState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}
