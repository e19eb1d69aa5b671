use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error taxonomy shared by every route handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input, rejected before any persistence call.
    #[error("{0}")]
    Validation(String),

    /// Duplicate email on registration.
    #[error("{0}")]
    Conflict(String),

    /// No usable bearer token on a protected route.
    #[error("{0}")]
    Unauthenticated(String),

    /// Token present but its signature does not check out.
    #[error("{0}")]
    Forbidden(String),

    /// History item absent or owned by someone else; the two are
    /// indistinguishable to the caller.
    #[error("{0}")]
    NotFound(String),

    /// Reset credential missing, mismatched, already consumed or expired.
    #[error("{0}")]
    InvalidOrExpired(String),

    /// Database or mail transport failure; logged, never leaked.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(m) | ApiError::Conflict(m) | ApiError::InvalidOrExpired(m) => {
                (StatusCode::BAD_REQUEST, m)
            }
            ApiError::Unauthenticated(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on the server.".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        let cases = [
            (
                ApiError::Validation("bad".into()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Conflict("dup".into()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Unauthenticated("no token".into()).into_response(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Forbidden("bad token".into()).into_response(),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::NotFound("gone".into()).into_response(),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::InvalidOrExpired("stale".into()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (response, expected) in cases {
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn internal_error_hides_the_cause() {
        let response = ApiError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
