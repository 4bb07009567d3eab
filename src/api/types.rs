//! Shared types for the HTTP layer: context, response envelope, extractors.

use std::sync::Arc;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core_state::CoreState;

use super::error::ApiError;

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Whether 500 responses may carry the underlying error detail.
    pub fn exposes_internal_errors(&self) -> bool {
        self.core.config.environment.exposes_internal_errors()
    }
}

/// Machine-readable outcome carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCode {
    Succeed,
    Failed,
    ValidationError,
    InternalServerError,
    Unauthorized,
    AccessDenied,
    ResourceNotFound,
}

#[derive(Debug, Serialize)]
pub struct ResponseStatus {
    pub code: ResponseCode,
    pub message: String,
}

/// `{status: {code, message}, data}`; `data` is `null` on failure.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: ResponseStatus,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            status: ResponseStatus {
                code: ResponseCode::Succeed,
                message: "OK".into(),
            },
            data: Some(data),
        })
    }
}

impl Envelope<()> {
    pub fn failure(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus {
                code,
                message: message.into(),
            },
            data: None,
        }
    }
}

/// Handler result: success envelope or an `ApiError`.
pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// `Json<T>` whose rejections render as a `validation_error` envelope
/// instead of axum's plain-text body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation(rejection_message(&rejection))),
        }
    }
}

/// Like `ApiJson`, but an empty body (with or without a content type)
/// yields `T::default()`.
pub struct ApiJsonOrDefault<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJsonOrDefault<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_body = has_json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApiJsonOrDefault(T::default()));
        }
        if !json_body {
            return Err(ApiError::Validation(
                "Expected Content-Type: application/json".to_string(),
            ));
        }
        match Json::<T>::from_bytes(&bytes) {
            Ok(Json(value)) => Ok(ApiJsonOrDefault(value)),
            Err(rejection) => Err(ApiError::Validation(rejection_message(&rejection))),
        }
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("application/json") || ct.contains("+json")
        })
        .unwrap_or(false)
}

/// `Query<T>` whose rejections render as a `validation_error` envelope.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(e) => format!("Invalid request body: {}", e.body_text()),
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON body".to_string(),
        JsonRejection::MissingJsonContentType(_) => {
            "Expected Content-Type: application/json".to_string()
        }
        other => other.body_text(),
    }
}
