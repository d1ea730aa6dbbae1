use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tracing::{debug, error};
use uuid::Uuid;

use crate::http_err::ApiError;
use crate::repos::DynAuthTokenRepo;

const API_TOKEN_LENGTH: usize = 64;

/// An opaque bearer token authorizing requests on behalf of the user it was
/// issued to.
pub struct ApiToken {
    token: String,
    user_id: Uuid,
}

impl ApiToken {
    /// Issue a new token for a specific user.
    pub fn new_for_user(user_id: Uuid) -> Self {
        let token: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(API_TOKEN_LENGTH)
            .map(char::from)
            .collect();

        Self { token, user_id }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

/// An authenticated caller, resolved from the bearer token in the request's
/// `Authorization` header. Extraction fails with a `401` when the header is
/// missing, not a bearer scheme, or names a token that no session owns.
#[derive(Debug)]
pub struct Session {
    token: String,
    user_id: Uuid,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Session
where
    DynAuthTokenRepo: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token_repo = DynAuthTokenRepo::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        let token = match token {
            Some(token) => token.to_owned(),
            None => {
                debug!("No bearer token found in the authorization header.");

                return Err(ApiError::Unauthorized);
            }
        };

        match token_repo.find_user_by_token(&token).await {
            Ok(Some(user_id)) => {
                debug!(%user_id, "Resolved bearer token to a user.");

                Ok(Self { token, user_id })
            }
            Ok(None) => {
                debug!("Received a bearer token that matches no session.");

                Err(ApiError::Unauthorized)
            }
            Err(error) => {
                error!(?error, "Failed to look up bearer token.");

                Err(ApiError::InternalServerError)
            }
        }
    }
}
