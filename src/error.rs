// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Problems found while loading or compiling template files.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {file}: missing parameter section [{level}]")]
    MissingLevel { file: String, level: String },
    #[error("template {file}: unknown section [{section}]")]
    UnknownSection { file: String, section: String },
    #[error("template {file}: malformed line {line}: {text}")]
    MalformedLine {
        file: String,
        line: usize,
        text: String,
    },
    #[error("template {file}: missing `---` body separator")]
    MissingBody { file: String },
    #[error("template {file}: unknown placeholder {{{{{name}}}}}")]
    UnknownPlaceholder { file: String, name: String },
    #[error("template {file}: unterminated placeholder")]
    UnterminatedPlaceholder { file: String },
    #[error("template {file}: body has no {{{{main}}}} slot")]
    MissingMainBlock { file: String },
    #[error("no template for {0}")]
    MissingTemplate(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bad values in the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failures of the remote chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("API key rejected")]
    Unauthorized,
    #[error("rate limited by upstream")]
    RateLimited,
    #[error("upstream server error ({0})")]
    Server(u16),
    #[error("upstream request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Timeout | LlmError::Network(_) | LlmError::Server(_))
    }
}
