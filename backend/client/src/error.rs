use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },

    #[error("CSRF token missing")]
    MissingCsrf,
}

impl ClientError {
    /// Message sent back by the server in `{"erro": ...}`, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Whether the request never got an answer.
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Http(_) | ClientError::InvalidUrl(_))
    }
}
