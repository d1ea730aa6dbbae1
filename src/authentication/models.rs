use uuid::Uuid;

use super::domain::session::ApiToken;

/// A new API token row awaiting persistence.
#[derive(Debug)]
pub struct NewApiToken {
    pub token: String,
    pub user_id: Uuid,
}

impl From<&ApiToken> for NewApiToken {
    fn from(token: &ApiToken) -> Self {
        Self {
            token: token.token().to_owned(),
            user_id: token.user_id(),
        }
    }
}
