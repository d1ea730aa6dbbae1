//! In-memory stand-ins for the application's persistence and delivery
//! boundaries. Tests exercise the real services and routers against these
//! doubles so they stay fast and isolated.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum::response::Response;
use axum::{Extension, Router};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::authentication::models::NewApiToken;
use crate::email;
use crate::email::clients::{EmailClient, Message};
use crate::identities::models::password_resets::{NewPasswordReset, PasswordReset};
use crate::identities::models::users::{NewUserModel, User, UserUpdateModel};
use crate::identities::services::{PasswordResetService, UserService};
use crate::passwords::{Hash, Password};
use crate::rate_limit::{DynRateLimiter, RateLimitResult, RateLimiter};
use crate::repos::{AuthTokenRepo, PasswordResetRepo, UserPersistenceError, UserRepo};
use crate::server::{self, AppState};

/// Decode a response body as JSON.
pub async fn response_json(response: Response) -> serde_json::Value {
    let body = hyper::body::to_bytes(response.into_body())
        .await
        .expect("body should be readable");

    serde_json::from_slice(&body).expect("body should be JSON")
}

/// Build a [`User`] row as it would exist after registration, with the given
/// raw password hashed into the stored credential.
pub fn persisted_user(email: &str, username: &str, password: &str) -> User {
    let hash = Hash::new(&Password::unvalidated(password.to_owned()))
        .expect("password should be hashable");

    User {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        username: username.to_owned(),
        password_hash: hash.value().to_owned(),
        avatar: None,
        created_at: Utc::now(),
    }
}

/// A user store backed by a vector.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
}

impl MemoryUserRepo {
    /// Seed the store with an existing user.
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    /// Fetch a stored user by ID.
    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn persist_new_user(&self, user: &NewUserModel) -> Result<(), UserPersistenceError> {
        let mut users = self.users.lock().unwrap();

        if users.iter().any(|existing| existing.email == user.email) {
            return Err(UserPersistenceError::DuplicateEmail(user.email.clone()));
        }

        if users.iter().any(|existing| existing.username == user.username) {
            return Err(UserPersistenceError::DuplicateUsername(
                user.username.clone(),
            ));
        }

        users.push(User {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            avatar: user.avatar.clone(),
            created_at: Utc::now(),
        });

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.user(id))
    }

    async fn update_user(&self, update: &UserUpdateModel) -> Result<User, UserPersistenceError> {
        let mut users = self.users.lock().unwrap();

        if users
            .iter()
            .any(|existing| existing.id != update.id && existing.email == update.email)
        {
            return Err(UserPersistenceError::DuplicateEmail(update.email.clone()));
        }

        match users.iter_mut().find(|user| user.id == update.id) {
            Some(user) => {
                user.email = update.email.clone();
                user.password_hash = update.password_hash.clone();
                user.avatar = update.avatar.clone();

                Ok(user.clone())
            }
            None => Err(UserPersistenceError::UserNotFound),
        }
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        let mut users = self.users.lock().unwrap();

        if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
            user.password_hash = password_hash.to_owned();
        }

        Ok(())
    }
}

/// A password reset token store keyed by user ID, mirroring the one live
/// token per user constraint.
#[derive(Default)]
pub struct MemoryPasswordResetRepo {
    resets: Mutex<HashMap<Uuid, PasswordReset>>,
}

impl MemoryPasswordResetRepo {
    /// Seed the store with an existing reset token.
    pub fn insert(&self, reset: PasswordReset) {
        self.resets.lock().unwrap().insert(reset.user_id, reset);
    }

    /// List every live reset token.
    pub fn tokens(&self) -> Vec<PasswordReset> {
        self.resets.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl PasswordResetRepo for MemoryPasswordResetRepo {
    async fn upsert_token_for_user(&self, reset: &NewPasswordReset) -> anyhow::Result<()> {
        self.resets.lock().unwrap().insert(
            reset.user_id,
            PasswordReset {
                token: reset.token.clone(),
                user_id: reset.user_id,
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<PasswordReset>> {
        Ok(self
            .resets
            .lock()
            .unwrap()
            .values()
            .find(|reset| reset.token == token)
            .cloned())
    }

    async fn invalidate_token(&self, token: &str) -> anyhow::Result<bool> {
        let mut resets = self.resets.lock().unwrap();

        let user_id = resets
            .iter()
            .find(|(_, reset)| reset.token == token)
            .map(|(user_id, _)| *user_id);

        Ok(match user_id {
            Some(user_id) => resets.remove(&user_id).is_some(),
            None => false,
        })
    }
}

/// An API token store backed by a map from token to owner.
#[derive(Default)]
pub struct MemoryAuthTokenRepo {
    tokens: Mutex<HashMap<String, Uuid>>,
}

impl MemoryAuthTokenRepo {
    /// Seed the store with a token belonging to the given user.
    pub fn insert(&self, token: &str, user_id: Uuid) {
        self.tokens.lock().unwrap().insert(token.to_owned(), user_id);
    }

    /// Look up the owner of a stored token.
    pub fn user_for(&self, token: &str) -> Option<Uuid> {
        self.tokens.lock().unwrap().get(token).copied()
    }
}

#[async_trait]
impl AuthTokenRepo for MemoryAuthTokenRepo {
    async fn insert_token(&self, token: &NewApiToken) -> anyhow::Result<()> {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.token.clone(), token.user_id);

        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        Ok(self.tokens.lock().unwrap().get(token).copied())
    }

    async fn delete_token(&self, token: &str) -> anyhow::Result<()> {
        self.tokens.lock().unwrap().remove(token);

        Ok(())
    }
}

/// An email client that records messages instead of delivering them.
#[derive(Default)]
pub struct CapturingMailer {
    messages: Mutex<Vec<Message>>,
}

impl CapturingMailer {
    /// List every message sent through the client.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailClient for CapturingMailer {
    async fn send(&self, message: &Message) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push(message.clone());

        Ok(())
    }
}

/// A rate limiter that never limits.
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn is_limited(&self, _key: &str, _max_req_per_min: u64) -> anyhow::Result<RateLimitResult> {
        Ok(RateLimitResult::NotLimited)
    }
}

/// A rate limiter that rejects every request.
pub struct AlwaysLimitedRateLimiter;

impl RateLimiter for AlwaysLimitedRateLimiter {
    fn is_limited(&self, _key: &str, _max_req_per_min: u64) -> anyhow::Result<RateLimitResult> {
        Ok(RateLimitResult::LimitedUntil(
            Utc::now() + Duration::minutes(1),
        ))
    }
}

/// A fully wired application backed by in-memory doubles. The repositories
/// and mailer are exposed so tests can seed state and make assertions on what
/// the handlers persisted or delivered.
pub struct TestApp {
    pub auth_tokens: Arc<MemoryAuthTokenRepo>,
    pub mailer: Arc<CapturingMailer>,
    pub rate_limiter: DynRateLimiter,
    pub resets: Arc<MemoryPasswordResetRepo>,
    pub users: Arc<MemoryUserRepo>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_rate_limiter(Arc::new(NoopRateLimiter))
    }

    pub fn with_rate_limiter(rate_limiter: DynRateLimiter) -> Self {
        Self {
            auth_tokens: Arc::new(MemoryAuthTokenRepo::default()),
            mailer: Arc::new(CapturingMailer::default()),
            rate_limiter,
            resets: Arc::new(MemoryPasswordResetRepo::default()),
            users: Arc::new(MemoryUserRepo::default()),
        }
    }

    pub fn state(&self) -> AppState {
        let user_service = UserService::new(self.users.clone());
        let password_reset_service = PasswordResetService::new(
            self.mailer.clone(),
            "no-reply@roleplay.com".to_owned(),
            self.resets.clone(),
            email::templates().expect("templates should parse"),
            self.users.clone(),
        );

        AppState::new(
            self.auth_tokens.clone(),
            password_reset_service,
            self.rate_limiter.clone(),
            self.users.clone(),
            user_service,
        )
    }

    /// Build the application router with every request stamped with a loopback
    /// peer address, matching what the connect-info wiring provides when the
    /// server runs for real.
    pub fn router(&self) -> Router {
        server::app(self.state()).layer(Extension(ConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            8000,
        )))))
    }
}
