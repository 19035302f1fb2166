//! Errores de la aplicación y su traducción a respuestas HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Petición inválida: {0}")]
    Validation(String),

    #[error("No encontrado: {0}")]
    NotFound(String),

    #[error("Archivo ZIP inválido: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error interno: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Fallo de disco al leer el ZIP guardado, no un archivo mal formado.
            AppError::Archive(zip::result::ZipError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::Archive(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("La tarea en segundo plano falló: {err}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;
