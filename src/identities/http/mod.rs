use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::{debug, error};
use uuid::Uuid;

use crate::authentication::domain::session::Session;
use crate::client_ip::ClientIp;
use crate::http_err::{ApiError, ApiJson, ApiResponse};
use crate::rate_limit::{DynRateLimiter, RateLimitResult};
use crate::server::AppState;

use super::services::{
    CreateUserError, PasswordResetService, RequestResetError, ResetPasswordError, UpdateUserError,
    UserService,
};

pub mod reps;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:user_id", put(update_user))
        .route("/me", get(get_current_user))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

async fn create_user(
    ClientIp(client_ip): ClientIp,
    State(rate_limiter): State<DynRateLimiter>,
    State(user_service): State<UserService>,
    ApiJson(request): ApiJson<reps::NewUserRequest>,
) -> ApiResponse<(StatusCode, Json<reps::UserEnvelope>)> {
    let rate_limit_key = format!("/identities/users_post_{}", client_ip);
    match rate_limiter.is_limited(&rate_limit_key, 10) {
        Ok(RateLimitResult::NotLimited) => (),
        Ok(result @ RateLimitResult::LimitedUntil(_)) => return Err(result.into()),
        Err(error) => {
            error!(?error, "Failed to query rate limiter.");

            return Err(ApiError::InternalServerError);
        }
    };

    match user_service.create_user(request.into()).await {
        Ok(new_user) => Ok((
            StatusCode::CREATED,
            Json(reps::UserEnvelope::from(&new_user)),
        )),
        Err(CreateUserError::InvalidUser(context)) => Err(context.into()),
        Err(CreateUserError::DuplicateEmail) => {
            Err(ApiError::Conflict("Email is already in use.".to_owned()))
        }
        Err(CreateUserError::DuplicateUsername) => {
            Err(ApiError::Conflict("Username is already in use.".to_owned()))
        }
        Err(CreateUserError::Other(error)) => {
            error!(?error, "Failed to create user.");

            Err(ApiError::InternalServerError)
        }
    }
}

/// Overwrite a user's profile. Any authenticated session may update any
/// user's profile; the path ID alone selects the target row.
async fn update_user(
    _session: Session,
    State(user_service): State<UserService>,
    Path(user_id): Path<Uuid>,
    ApiJson(request): ApiJson<reps::UpdateUserRequest>,
) -> ApiResponse<Json<reps::UserEnvelope>> {
    match user_service.update_user(user_id, request.into()).await {
        Ok(user) => Ok(Json(reps::UserEnvelope::from(&user))),
        Err(UpdateUserError::InvalidUser(context)) => Err(context.into()),
        Err(UpdateUserError::DuplicateEmail) => {
            Err(ApiError::Conflict("Email is already in use.".to_owned()))
        }
        Err(UpdateUserError::UserNotFound) => Err(ApiError::NotFound(
            "No user found with the provided ID.".to_owned(),
        )),
        Err(UpdateUserError::Other(error)) => {
            error!(?error, %user_id, "Failed to update user.");

            Err(ApiError::InternalServerError)
        }
    }
}

async fn get_current_user(
    session: Session,
    State(user_service): State<UserService>,
) -> ApiResponse<Json<reps::UserEnvelope>> {
    match user_service.get_user(session.user_id()).await {
        Ok(Some(user)) => Ok(Json(reps::UserEnvelope::from(&user))),
        Ok(None) => Err(ApiError::NotFound(
            "No user found for the current session.".to_owned(),
        )),
        Err(error) => {
            error!(?error, "Failed to load the current user.");

            Err(ApiError::InternalServerError)
        }
    }
}

async fn forgot_password(
    ClientIp(client_ip): ClientIp,
    State(rate_limiter): State<DynRateLimiter>,
    State(reset_service): State<PasswordResetService>,
    ApiJson(request): ApiJson<reps::PasswordResetRequest>,
) -> ApiResponse<StatusCode> {
    let rate_limit_key = format!("/identities/forgot-password_post_{}", client_ip);
    match rate_limiter.is_limited(&rate_limit_key, 10) {
        Ok(RateLimitResult::NotLimited) => (),
        Ok(result @ RateLimitResult::LimitedUntil(_)) => return Err(result.into()),
        Err(error) => {
            error!(?error, "Failed to query rate limiter.");

            return Err(ApiError::InternalServerError);
        }
    };

    match reset_service.request_reset(request.into()).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(RequestResetError::InvalidRequest(context)) => Err(context.into()),
        // Answered exactly like a success so the endpoint cannot be used to
        // probe which email addresses have accounts.
        Err(RequestResetError::UnknownEmail) => {
            debug!("Ignored password reset request for an unknown email.");

            Ok(StatusCode::NO_CONTENT)
        }
        Err(RequestResetError::Other(error)) => {
            error!(?error, "Failed to create password reset.");

            Err(ApiError::InternalServerError)
        }
    }
}

async fn reset_password(
    State(reset_service): State<PasswordResetService>,
    ApiJson(request): ApiJson<reps::ResetPasswordRequest>,
) -> ApiResponse<StatusCode> {
    match reset_service.reset_password(request.into()).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(ResetPasswordError::InvalidSubmission(context)) => Err(context.into()),
        Err(ResetPasswordError::TokenNotFound) => Err(ApiError::NotFound(
            "The provided password reset token has expired or does not exist.".to_owned(),
        )),
        Err(ResetPasswordError::Other(error)) => {
            error!(?error, "Failed to reset password.");

            Err(ApiError::InternalServerError)
        }
    }
}
