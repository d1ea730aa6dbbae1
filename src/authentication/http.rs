use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::client_ip::ClientIp;
use crate::http_err::{ApiError, ApiJson, ApiResponse, ErrorRep};
use crate::passwords;
use crate::rate_limit::{DynRateLimiter, RateLimitResult};
use crate::repos::{DynAuthTokenRepo, DynUserRepo};
use crate::server::AppState;

use super::domain::session::{ApiToken, Session};
use super::models::NewApiToken;

pub fn routes() -> Router<AppState> {
    Router::new().route("/sessions", post(create_session).delete(delete_session))
}

#[derive(Deserialize)]
struct EmailPasswordPair {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct TokenRep {
    #[serde(rename = "type")]
    token_type: &'static str,
    token: String,
}

#[derive(Serialize)]
pub struct TokenEnvelope {
    token: TokenRep,
}

impl TokenEnvelope {
    fn bearer(token: String) -> Self {
        Self {
            token: TokenRep {
                token_type: "bearer",
                token,
            },
        }
    }
}

pub enum CreateSessionResponse {
    Created(TokenEnvelope),
    BadRequest(ErrorRep),
}

impl CreateSessionResponse {
    /// The answer for both an unknown email and a wrong password, so callers
    /// cannot probe which accounts exist.
    fn invalid_credentials() -> Self {
        Self::BadRequest(ErrorRep::new(
            "BAD_REQUEST",
            StatusCode::BAD_REQUEST,
            "Invalid email or password.".to_string(),
        ))
    }
}

impl IntoResponse for CreateSessionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(envelope) => (StatusCode::CREATED, Json(envelope)).into_response(),
            Self::BadRequest(error) => (StatusCode::BAD_REQUEST, Json(error)).into_response(),
        }
    }
}

async fn create_session(
    ClientIp(client_ip): ClientIp,
    State(rate_limiter): State<DynRateLimiter>,
    State(user_repo): State<DynUserRepo>,
    State(token_repo): State<DynAuthTokenRepo>,
    ApiJson(credentials): ApiJson<EmailPasswordPair>,
) -> ApiResponse<CreateSessionResponse> {
    let rate_limit_key = format!("/authentication/sessions_post_{}", client_ip);
    match rate_limiter.is_limited(&rate_limit_key, 10) {
        Ok(RateLimitResult::NotLimited) => (),
        Ok(result @ RateLimitResult::LimitedUntil(_)) => return Err(result.into()),
        Err(error) => {
            error!(?error, "Failed to query rate limiter.");

            return Err(ApiError::InternalServerError);
        }
    };

    let user_model = match user_repo.find_by_email(&credentials.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(CreateSessionResponse::invalid_credentials()),
        Err(error) => {
            error!(?error, "Error finding user by email.");

            return Err(ApiError::InternalServerError);
        }
    };

    let parsed_hash = match passwords::Hash::from_hash_str(&user_model.password_hash) {
        Ok(hash) => hash,
        Err(error) => {
            error!(?error, "Invalid password hash received from model.");

            return Err(ApiError::InternalServerError);
        }
    };

    match parsed_hash.matches_raw_password(&credentials.password) {
        Ok(true) => {
            debug!(user_id = %user_model.id, "Validated user credentials.");

            let api_token = ApiToken::new_for_user(user_model.id);

            match token_repo.insert_token(&NewApiToken::from(&api_token)).await {
                Ok(()) => Ok(CreateSessionResponse::Created(TokenEnvelope::bearer(
                    api_token.token().to_owned(),
                ))),
                Err(error) => {
                    error!(?error, "Failed to persist session token.");

                    Err(ApiError::InternalServerError)
                }
            }
        }
        Ok(false) => Ok(CreateSessionResponse::invalid_credentials()),
        Err(error) => {
            error!(?error, "Failed to compare password and hash.");

            Err(ApiError::InternalServerError)
        }
    }
}

async fn delete_session(
    session: Session,
    State(token_repo): State<DynAuthTokenRepo>,
) -> ApiResponse<StatusCode> {
    match token_repo.delete_token(session.token()).await {
        Ok(()) => {
            debug!(user_id = %session.user_id(), "Revoked session token.");

            Ok(StatusCode::NO_CONTENT)
        }
        Err(error) => {
            error!(?error, "Failed to delete session token.");

            Err(ApiError::InternalServerError)
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::header::AUTHORIZATION;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::testing::{persisted_user, response_json, AlwaysLimitedRateLimiter, TestApp};

    use super::*;

    fn login_request(email: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/sessions")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "email": email, "password": password }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn login_issues_bearer_token() {
        let app = TestApp::new();
        let user = persisted_user("test@test.com", "test", "1234");
        let user_id = user.id;
        app.users.insert(user);

        let response = app
            .router()
            .oneshot(login_request("test@test.com", "1234"))
            .await
            .unwrap();

        assert_eq!(StatusCode::CREATED, response.status());

        let body = response_json(response).await;
        assert_eq!("bearer", body["token"]["type"]);

        let token = body["token"]["token"].as_str().expect("token should exist");
        assert_eq!(64, token.len());
        assert_eq!(Some(user_id), app.auth_tokens.user_for(token));
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_rejected() {
        let app = TestApp::new();
        app.users.insert(persisted_user("test@test.com", "test", "1234"));

        let response = app
            .router()
            .oneshot(login_request("test@test.com", "wrong"))
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, response.status());

        let body = response_json(response).await;
        assert_eq!("BAD_REQUEST", body["code"]);
        assert_eq!(400, body["status"]);
        assert_eq!("Invalid email or password.", body["message"]);
    }

    #[tokio::test]
    async fn login_with_unknown_email_matches_wrong_password_response() {
        let app = TestApp::new();

        let response = app
            .router()
            .oneshot(login_request("nobody@test.com", "1234"))
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, response.status());

        let body = response_json(response).await;
        assert_eq!("Invalid email or password.", body["message"]);
    }

    #[tokio::test]
    async fn login_is_rate_limited() {
        let app = TestApp::with_rate_limiter(Arc::new(AlwaysLimitedRateLimiter));

        let response = app
            .router()
            .oneshot(login_request("test@test.com", "1234"))
            .await
            .unwrap();

        assert_eq!(StatusCode::TOO_MANY_REQUESTS, response.status());
    }

    #[tokio::test]
    async fn logout_revokes_the_presented_token() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        app.auth_tokens.insert("session-token", user_id);

        let request = Request::builder()
            .method("DELETE")
            .uri("/sessions")
            .header(AUTHORIZATION, "Bearer session-token")
            .body(Body::empty())
            .unwrap();

        let response = app.router().oneshot(request).await.unwrap();

        assert_eq!(StatusCode::NO_CONTENT, response.status());
        assert_eq!(None, app.auth_tokens.user_for("session-token"));
    }

    #[tokio::test]
    async fn logout_requires_a_session() {
        let app = TestApp::new();

        let request = Request::builder()
            .method("DELETE")
            .uri("/sessions")
            .body(Body::empty())
            .unwrap();

        let response = app.router().oneshot(request).await.unwrap();

        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
    }
}
