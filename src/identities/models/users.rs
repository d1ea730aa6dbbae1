use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::identities::domain::users::{NewUser, UserUpdate};

/// A fully persisted user row.
#[derive(Clone, Debug, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The columns inserted when registering a new user.
#[derive(Clone, Debug)]
pub struct NewUserModel {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar: Option<String>,
}

impl TryFrom<&NewUser> for NewUserModel {
    type Error = anyhow::Error;

    fn try_from(user: &NewUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: user.id(),
            email: user.email().address().to_owned(),
            username: user.username().value().to_owned(),
            password_hash: user.password_hash()?.value().to_owned(),
            avatar: user.avatar().map(|avatar| avatar.value().to_owned()),
        })
    }
}

/// The columns written when updating an existing user.
#[derive(Clone, Debug)]
pub struct UserUpdateModel {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
}

impl UserUpdateModel {
    /// Build the row updates for a user from a validated set of changes.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the user being updated.
    /// * `update` - The validated changes to apply.
    pub fn for_user(id: Uuid, update: &UserUpdate) -> anyhow::Result<Self> {
        Ok(Self {
            id,
            email: update.email().address().to_owned(),
            password_hash: update.password_hash()?.value().to_owned(),
            avatar: update.avatar().map(|avatar| avatar.value().to_owned()),
        })
    }
}
