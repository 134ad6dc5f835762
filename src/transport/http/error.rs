//! HTTP error type shared by gates and handlers.
//!
//! Every failure a controller produces is a status code plus a short plain-text body.
//! Persistence and render failures are logged and surface as a bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    /// Content negotiation rejected the request. Carries the exact body text.
    #[error("{0}")]
    NotAcceptable(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Body could not be decoded.
    #[error("Invalid request body: {0}")]
    UnprocessableEntity(String),

    #[error("Not Implemented.")]
    NotImplemented,

    /// Handler-level failure with a message meant for the client.
    #[error("{0}")]
    Internal(String),

    #[error("persistence error: {0:#}")]
    Persistence(anyhow::Error),

    #[error("render error: {0:#}")]
    Render(anyhow::Error),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HttpError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            HttpError::Internal(_) | HttpError::Persistence(_) | HttpError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        HttpError::Persistence(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            HttpError::Persistence(_) | HttpError::Render(_) => {
                tracing::error!(error = %self, "request failed");
                "Internal Server Error".to_string()
            }
            HttpError::NotFound(_) | HttpError::Internal(_) => {
                tracing::warn!(status = status.as_u16(), "{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_variants() {
        assert_eq!(HttpError::NotAcceptable("x").status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(HttpError::NotImplemented.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            HttpError::from(anyhow::anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            HttpError::NotFound("Can not find model by id 3.".into()).to_string(),
            "Can not find model by id 3."
        );
    }
}
