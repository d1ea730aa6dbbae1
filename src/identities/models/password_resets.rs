use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::identities::domain;

/// A persisted reset token row.
#[derive(Clone, Debug, FromRow)]
pub struct PasswordReset {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<PasswordReset> for domain::password_resets::PasswordResetTokenData {
    fn from(reset: PasswordReset) -> Self {
        Self {
            user_id: reset.user_id,
            token: reset.token,
            created_at: reset.created_at,
        }
    }
}

/// The columns written when issuing a reset token.
#[derive(Clone, Debug)]
pub struct NewPasswordReset {
    pub user_id: Uuid,
    pub token: String,
}
