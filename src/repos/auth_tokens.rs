use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{authentication::models::NewApiToken, database::PostgresConnection};

pub type DynAuthTokenRepo = Arc<dyn AuthTokenRepo + Send + Sync>;

#[async_trait]
pub trait AuthTokenRepo {
    /// Persist a newly issued API token.
    async fn insert_token(&self, token: &NewApiToken) -> anyhow::Result<()>;

    /// Find the user a bearer token was issued to.
    async fn find_user_by_token(&self, token: &str) -> anyhow::Result<Option<Uuid>>;

    /// Revoke an API token. Revoking a token that does not exist is not an
    /// error.
    async fn delete_token(&self, token: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl AuthTokenRepo for PostgresConnection {
    async fn insert_token(&self, token: &NewApiToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_tokens (token, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .execute(&**self)
        .await?;

        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id
            FROM api_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&**self)
        .await?)
    }

    async fn delete_token(&self, token: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM api_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&**self)
        .await?;

        Ok(())
    }
}
