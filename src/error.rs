use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// BackendError
///
/// Failure of a call to the GraphQL data service. Cloneable so it can live in the
/// request-scoped query store and be rendered more than once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{message}")]
    GraphQl {
        message: String,
        code: Option<String>,
    },
    #[error("malformed response from data service: {0}")]
    Decode(String),
    #[error("not authenticated")]
    Unauthenticated,
}

impl BackendError {
    pub fn graphql(message: impl Into<String>, code: Option<&str>) -> Self {
        BackendError::GraphQl {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    /// The machine readable error code carried by the failure, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            BackendError::GraphQl { code, .. } => code.as_deref(),
            BackendError::Unauthenticated => Some("LOGIN"),
            BackendError::Network(_) | BackendError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// ActionError
///
/// A failed user action (mutation), shaped for the inline error banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    pub message: String,
    pub code: Option<String>,
}

impl From<&BackendError> for ActionError {
    fn from(e: &BackendError) -> Self {
        ActionError {
            message: e.to_string(),
            code: e.code().map(str::to_string),
        }
    }
}

impl From<BackendError> for ActionError {
    fn from(e: BackendError) -> Self {
        ActionError::from(&e)
    }
}

/// AppError
///
/// Failures that cannot be shown inside a page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
