use std::sync::Arc;

use axum::response::IntoResponse;
use thiserror::Error;

use crate::{
    persistence::players::{PlayerRepository, PlayerRepositoryImpl},
    player::{PlayerService, PlayerServiceImpl},
};

pub type ArcPlayerService = Arc<Box<dyn PlayerService + Send + Sync + 'static>>;

pub type ArcPlayerRepository = Arc<Box<dyn PlayerRepository + Send + Sync + 'static>>;

#[derive(Clone)]
pub struct AppState {
    pub player_service: ArcPlayerService,
    pub player_repository: ArcPlayerRepository,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection error: {0}")]
    ConnectionError(r2d2::Error),
    #[error("query error: {0}")]
    QueryError(rusqlite::Error),
}

impl ServiceError {
    pub fn invalid_param<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::InvalidParam(msg.into()))
    }

    pub fn not_found<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::NotFound(msg.into()))
    }

    pub fn internal<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::Internal(msg.into()))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::http::Response<axum::body::Body> {
        let (status, msg) = match self {
            ServiceError::InvalidParam(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            ServiceError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            ServiceError::Database(_) => (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            ServiceError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = serde_json::json!({ "error": msg });
        (status, axum::Json(body)).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub fn construct_app() -> AppState {
    let player_repository: ArcPlayerRepository = Arc::new(Box::new(PlayerRepositoryImpl::new()));

    let player_service: ArcPlayerService = Arc::new(Box::new(PlayerServiceImpl::new(
        player_repository.clone(),
    )));

    AppState {
        player_service,
        player_repository,
    }
}
