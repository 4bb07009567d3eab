//! API error types rendered as the response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::db::DatabaseError;
use crate::lifecycle::LifecycleError;

use super::types::{Envelope, ResponseCode};

pub(crate) const GENERIC_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Detail of an internal error, attached to the 500 response as an
/// extension. The body always carries the generic message; the
/// `internal_detail` middleware swaps the detail in where the environment
/// allows it.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("{0}")]
    Failed(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(detail) => {
                (StatusCode::BAD_REQUEST, ResponseCode::ValidationError, detail)
            }
            ApiError::Failed(detail) => (StatusCode::BAD_REQUEST, ResponseCode::Failed, detail),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, ResponseCode::Failed, detail),
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, ResponseCode::ResourceNotFound, detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                let mut response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(Envelope::failure(
                        ResponseCode::InternalServerError,
                        GENERIC_INTERNAL_MESSAGE,
                    )),
                )
                    .into_response();
                response.extensions_mut().insert(InternalErrorDetail(detail));
                return response;
            }
        };

        (status, Json(Envelope::failure(code, message))).into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation(msg) => ApiError::Validation(msg),
            e @ LifecycleError::InvalidTransition { .. } => ApiError::Failed(e.to_string()),
            LifecycleError::Rejected(msg) => ApiError::Failed(msg),
            LifecycleError::NotFound(what) => {
                ApiError::NotFound(format!("Appointment not found: {what}"))
            }
            e @ LifecycleError::Conflict { .. } => ApiError::Conflict(e.to_string()),
            LifecycleError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        LifecycleError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn validation_returns_400() {
        let response = ApiError::Validation("action is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["status"]["code"], "validation_error");
        assert_eq!(json["status"]["message"], "action is required");
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn invalid_transition_is_business_failure() {
        let api: ApiError = LifecycleError::InvalidTransition {
            from: AppointmentStatus::Canceled,
            to: AppointmentStatus::Reported,
        }
        .into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["status"]["code"], "failed");
        assert_eq!(
            json["status"]["message"],
            "Invalid status transition from Canceled to Reported"
        );
    }

    #[tokio::test]
    async fn conflict_returns_409_failed() {
        let api: ApiError = LifecycleError::Conflict { id: "a-1".into() }.into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["status"]["code"], "failed");
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let api: ApiError = DatabaseError::appointment_not_found("a-404").into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["status"]["code"], "resource_not_found");
    }

    #[tokio::test]
    async fn internal_returns_500_and_hides_detail() {
        let api: ApiError = DatabaseError::LockPoisoned.into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<InternalErrorDetail>().is_some());
        let json = body_json(response).await;
        assert_eq!(json["status"]["code"], "internal_server_error");
        assert_eq!(json["status"]["message"], GENERIC_INTERNAL_MESSAGE);
    }
}
