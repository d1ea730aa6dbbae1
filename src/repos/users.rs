use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    database::PostgresConnection,
    identities::models::users::{NewUserModel, User, UserUpdateModel},
};

#[derive(Debug, Error)]
pub enum UserPersistenceError {
    #[error("duplicate email address: {0:?}")]
    DuplicateEmail(String),

    #[error("duplicate username: {0:?}")]
    DuplicateUsername(String),

    #[error("no user found to persist changes to")]
    UserNotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DynUserRepo = Arc<dyn UserRepo + Send + Sync>;

#[async_trait]
pub trait UserRepo {
    /// Insert a newly registered user.
    async fn persist_new_user(&self, user: &NewUserModel) -> Result<(), UserPersistenceError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Find a user by their ID.
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Overwrite a user's email, password hash, and avatar, returning the
    /// updated row.
    async fn update_user(&self, update: &UserUpdateModel) -> Result<User, UserPersistenceError>;

    /// Overwrite a user's stored credential.
    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()>;
}

/// The name of the constraint a Postgres unique violation was raised for.
///
/// The names come from the unique constraints on the `user` table's `email`
/// and `username` columns.
fn violated_constraint(db_err: &dyn sqlx::error::DatabaseError) -> Option<&str> {
    db_err
        .try_downcast_ref::<PgDatabaseError>()
        .and_then(PgDatabaseError::constraint)
}

#[async_trait]
impl UserRepo for PostgresConnection {
    async fn persist_new_user(&self, user: &NewUserModel) -> Result<(), UserPersistenceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO "user" (id, email, username, password_hash, avatar)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .execute(&**self)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().unwrap_or_default() == "23505" => {
                match violated_constraint(&*db_err) {
                    Some("user_email_key") => {
                        Err(UserPersistenceError::DuplicateEmail(user.email.clone()))
                    }
                    Some("user_username_key") => Err(UserPersistenceError::DuplicateUsername(
                        user.username.clone(),
                    )),
                    other => Err(UserPersistenceError::Other(anyhow::anyhow!(
                        "unique violation on unexpected constraint: {:?}",
                        other
                    ))),
                }
            }
            Err(err) => Err(anyhow::Error::from(err).into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, avatar, created_at
            FROM "user"
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&**self)
        .await?)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, avatar, created_at
            FROM "user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&**self)
        .await?)
    }

    async fn update_user(&self, update: &UserUpdateModel) -> Result<User, UserPersistenceError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            UPDATE "user"
            SET email = $2, password_hash = $3, avatar = $4
            WHERE id = $1
            RETURNING id, email, username, password_hash, avatar, created_at
            "#,
        )
        .bind(update.id)
        .bind(&update.email)
        .bind(&update.password_hash)
        .bind(&update.avatar)
        .fetch_optional(&**self)
        .await;

        match result {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(UserPersistenceError::UserNotFound),
            Err(sqlx::Error::Database(db_err)) if db_err.code().unwrap_or_default() == "23505" => {
                // Updates never touch the username column, so the email
                // constraint is the only one that can be violated here.
                match violated_constraint(&*db_err) {
                    Some("user_email_key") => {
                        Err(UserPersistenceError::DuplicateEmail(update.email.clone()))
                    }
                    other => Err(UserPersistenceError::Other(anyhow::anyhow!(
                        "unique violation on unexpected constraint: {:?}",
                        other
                    ))),
                }
            }
            Err(err) => Err(anyhow::Error::from(err).into()),
        }
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE "user"
            SET password_hash = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&**self)
        .await?;

        Ok(())
    }
}
