use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    database::PostgresConnection,
    identities::models::password_resets::{NewPasswordReset, PasswordReset},
};

pub type DynPasswordResetRepo = Arc<dyn PasswordResetRepo + Send + Sync>;

#[async_trait]
pub trait PasswordResetRepo {
    /// Persist a reset token for a user, replacing any token they already
    /// have. A user never holds more than one live token.
    async fn upsert_token_for_user(&self, reset: &NewPasswordReset) -> anyhow::Result<()>;

    /// Look up a reset token row by its token value.
    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<PasswordReset>>;

    /// Delete a reset token, claiming it for the caller.
    ///
    /// # Returns
    ///
    /// Whether the token still existed. Exactly one of any number of
    /// concurrent callers for the same token observes `true`.
    async fn invalidate_token(&self, token: &str) -> anyhow::Result<bool>;
}

#[async_trait]
impl PasswordResetRepo for PostgresConnection {
    async fn upsert_token_for_user(&self, reset: &NewPasswordReset) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (user_id, token)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET token = EXCLUDED.token, created_at = now()
            "#,
        )
        .bind(reset.user_id)
        .bind(&reset.token)
        .execute(&**self)
        .await?;

        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<PasswordReset>> {
        Ok(sqlx::query_as::<_, PasswordReset>(
            r#"
            SELECT token, user_id, created_at
            FROM password_resets
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&**self)
        .await?)
    }

    async fn invalidate_token(&self, token: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_resets
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&**self)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
