use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{extract::FromRef, Router};
use sqlx::postgres::PgPoolOptions;

use crate::{
    cors,
    database::PostgresConnection,
    email::{
        self,
        clients::{ConsoleMailer, SendgridMailer},
    },
    identities::services::{DynEmailClient, PasswordResetService, UserService},
    rate_limit::{DynRateLimiter, RedisRateLimiter},
    repos::{DynAuthTokenRepo, DynPasswordResetRepo, DynUserRepo},
};

pub struct Options {
    pub database_pool_size: u32,
    pub database_timeout_seconds: u8,
    pub database_url: String,

    pub email_from_address: String,
    pub redis_url: String,
    pub sendgrid_key: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    auth_token_repo: DynAuthTokenRepo,
    password_reset_service: PasswordResetService,
    rate_limiter: DynRateLimiter,
    user_repo: DynUserRepo,
    user_service: UserService,
}

impl AppState {
    pub fn new(
        auth_token_repo: DynAuthTokenRepo,
        password_reset_service: PasswordResetService,
        rate_limiter: DynRateLimiter,
        user_repo: DynUserRepo,
        user_service: UserService,
    ) -> Self {
        Self {
            auth_token_repo,
            password_reset_service,
            rate_limiter,
            user_repo,
            user_service,
        }
    }
}

/// Build the application router on top of the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(crate::authentication::http::routes())
        .merge(crate::identities::http::routes())
        .layer(cors::layer())
        .with_state(state)
}

pub async fn serve(opts: Options) -> anyhow::Result<()> {
    let db_pool = PgPoolOptions::new()
        .max_connections(opts.database_pool_size)
        .acquire_timeout(Duration::from_secs(opts.database_timeout_seconds.into()))
        .connect(&opts.database_url)
        .await?;

    let db_connection = PostgresConnection::new(db_pool);

    let auth_token_repo: DynAuthTokenRepo = Arc::new(db_connection.clone());
    let password_reset_repo: DynPasswordResetRepo = Arc::new(db_connection.clone());
    let user_repo: DynUserRepo = Arc::new(db_connection);

    let email_client: DynEmailClient = match opts.sendgrid_key {
        Some(api_key) => Arc::new(SendgridMailer::new(api_key)),
        None => Arc::new(ConsoleMailer {}),
    };

    let rate_limiter: DynRateLimiter = Arc::new(RedisRateLimiter::new(&opts.redis_url)?);

    let user_service = UserService::new(user_repo.clone());
    let password_reset_service = PasswordResetService::new(
        email_client,
        opts.email_from_address,
        password_reset_repo,
        email::templates()?,
        user_repo.clone(),
    );

    let state = AppState::new(
        auth_token_repo,
        password_reset_service,
        rate_limiter,
        user_repo,
        user_service,
    );

    axum::Server::bind(&"0.0.0.0:8000".parse().unwrap())
        .serve(app(state).into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

impl FromRef<AppState> for DynAuthTokenRepo {
    fn from_ref(state: &AppState) -> Self {
        state.auth_token_repo.clone()
    }
}

impl FromRef<AppState> for PasswordResetService {
    fn from_ref(state: &AppState) -> Self {
        state.password_reset_service.clone()
    }
}

impl FromRef<AppState> for DynRateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limiter.clone()
    }
}

impl FromRef<AppState> for DynUserRepo {
    fn from_ref(state: &AppState) -> Self {
        state.user_repo.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.user_service.clone()
    }
}
