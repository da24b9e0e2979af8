use axum::{
    Json,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tracing::error;

/// Error returned by every handler. Rendered as `{"error": ..., "status": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] treats_store::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid token")]
    InvalidToken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body whose parse failures render as a 400 [`ApiError`].
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;

/// Query string whose parse failures render as a 400 [`ApiError`].
pub type QueryParams<T> = WithRejection<Query<T>, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(treats_store::Error::InvalidInput(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(treats_store::Error::AccessDenied(_) | treats_store::Error::InvalidToken)
            | Self::InvalidToken => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({
                "error": message,
                "status": status.as_u16(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status() {
        let bad = ApiError::from(treats_store::Error::InvalidInput("nope".into()));
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
        let denied = ApiError::from(treats_store::Error::AccessDenied("no".into()));
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(treats_store::Error::InvalidToken).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
