use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use log::info;

use crate::{AppState, ServiceError, player::Player};

pub async fn run(
    app_state: AppState,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) {
    let router = Router::new()
        .route("/players", get(get_players_list).post(create_player))
        .route("/players/count", get(get_players_count))
        .route(
            "/players/{id}",
            get(get_player_by_id)
                .post(update_player)
                .delete(delete_player),
        )
        .with_state(app_state);

    let port = std::env::var("PLAYER_HTTP_PORT")
        .expect("PLAYER_HTTP_PORT must be set")
        .parse::<u16>()
        .expect("PLAYER_HTTP_PORT must be a valid u16");

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .unwrap();

    info!("Player API listening on port {}", port);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .unwrap();

    info!("HTTP API shut down gracefully");
}

async fn get_players_list(
    State(app_state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Player>>, ServiceError> {
    Ok(Json(app_state.player_service.find_all_players(&params)?))
}

async fn get_players_count(
    State(app_state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<usize>, ServiceError> {
    Ok(Json(app_state.player_service.find_players_count(&params)?))
}

async fn create_player(
    State(app_state): State<AppState>,
    body: Option<Json<HashMap<String, String>>>,
) -> Result<Json<Player>, ServiceError> {
    let params = body.map(|Json(params)| params).unwrap_or_default();
    Ok(Json(app_state.player_service.create_player(&params)?))
}

async fn get_player_by_id(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Player>, ServiceError> {
    Ok(Json(app_state.player_service.get_player(&id)?))
}

async fn update_player(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<HashMap<String, String>>>,
) -> Result<Json<Player>, ServiceError> {
    let params = body.map(|Json(params)| params).unwrap_or_default();
    Ok(Json(app_state.player_service.update_player(&id, &params)?))
}

async fn delete_player(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    app_state.player_service.delete_player(&id)?;
    Ok(StatusCode::OK)
}
