use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forms::payloads::ErroResponse;
use thiserror::Error;
use tracing::error;

use crate::{crypto::CryptoError, database::DatabaseError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Dados inválidos")]
    MalformedPayload,

    #[error("CSRF inválido")]
    InvalidCsrf,

    #[error("Não autenticado")]
    Unauthorized,

    #[error("Acesso negado")]
    NotAdmin,

    /// Credentials that do not match, with the reason shown to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Invalid(String),

    #[error("CPF ou telefone já cadastrado")]
    AlreadyRegistered,

    #[error("Dados não encontrados")]
    NotFound,

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<DatabaseError> for AppError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Conflict => AppError::AlreadyRegistered,
            DatabaseError::Missing => AppError::NotFound,
            DatabaseError::Edit(edit) => AppError::Invalid(edit.to_string()),
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload | AppError::Invalid(_) | AppError::AlreadyRegistered => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidCsrf | AppError::NotAdmin | AppError::Rejected(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Crypto(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let erro = if status.is_server_error() {
            error!("{self}");
            "Erro interno".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErroResponse { erro })).into_response()
    }
}
