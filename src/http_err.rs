use axum::body::HttpBody;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::rate_limit::RateLimitResult;

/// The JSON body sent with every error response. The `code` is a stable
/// machine-readable discriminator so clients can branch on failure kinds
/// without parsing `message`, which is free to change.
#[derive(Debug, Serialize)]
pub struct ErrorRep {
    pub code: String,
    pub status: u16,
    pub message: String,
}

impl ErrorRep {
    pub fn new(code: &str, status: StatusCode, message: String) -> Self {
        Self {
            code: code.to_string(),
            status: status.as_u16(),
            message,
        }
    }
}

/// Error responses shared by all endpoints. Failure modes specific to a
/// single endpoint get their own response enum next to the handler instead.
#[derive(Debug)]
pub enum ApiError {
    /// The request body was missing, malformed, or failed domain validation.
    ValidationFailed(String),
    /// The request conflicts with existing state, such as a taken email.
    Conflict(String),
    /// The referenced resource does not exist.
    NotFound(String),
    /// The request lacks valid authentication credentials.
    Unauthorized,
    /// The client has exceeded the rate limit for this operation.
    TooManyRequests,
    /// Something failed on our side. The cause has already been logged.
    InternalServerError,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::ValidationFailed(message)
            | Self::Conflict(message)
            | Self::NotFound(message) => message.clone(),
            Self::Unauthorized => "Authentication credentials are missing or invalid.".to_string(),
            Self::TooManyRequests => "Too many attempts. Please try again later.".to_string(),
            Self::InternalServerError => "Internal server error.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorRep::new(self.code(), status, self.message());

        (status, Json(body)).into_response()
    }
}

impl From<RateLimitResult> for ApiError {
    fn from(result: RateLimitResult) -> Self {
        match result {
            // Converting an unexceeded limit into an error is a logic bug at
            // the call site, but answering 429 is still the safer direction.
            RateLimitResult::NotLimited | RateLimitResult::LimitedUntil(_) => Self::TooManyRequests,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(?error, "Received error.");

        Self::InternalServerError
    }
}

pub type ApiResponse<T> = Result<T, ApiError>;

/// A drop-in replacement for [`axum::Json`] that reports deserialization
/// failures in our error body format rather than axum's plain-text default.
pub struct ApiJson<T>(pub T);

#[async_trait::async_trait]
impl<T, S, B> FromRequest<S, B> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::ValidationFailed(rejection.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn validation_error_includes_stable_code() {
        let response = ApiError::ValidationFailed("Email is required.".to_string()).into_response();

        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, response.status());

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let rep: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!("VALIDATION_FAILED", rep["code"]);
        assert_eq!(422, rep["status"]);
        assert_eq!("Email is required.", rep["message"]);
    }

    #[tokio::test]
    async fn error_kinds_map_to_distinct_codes() {
        let cases = [
            (ApiError::Conflict("dup".to_string()), 409, "CONFLICT"),
            (ApiError::NotFound("gone".to_string()), 404, "NOT_FOUND"),
            (ApiError::Unauthorized, 401, "UNAUTHORIZED"),
            (ApiError::TooManyRequests, 429, "TOO_MANY_REQUESTS"),
            (ApiError::InternalServerError, 500, "INTERNAL_SERVER_ERROR"),
        ];

        for (error, status, code) in cases {
            let response = error.into_response();
            assert_eq!(status, response.status().as_u16());

            let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
            let rep: serde_json::Value = serde_json::from_slice(&body).unwrap();

            assert_eq!(code, rep["code"]);
            assert_eq!(status, rep["status"].as_u64().unwrap() as u16);
        }
    }
}
