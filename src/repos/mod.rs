mod auth_tokens;
mod password_resets;
mod users;

pub use auth_tokens::{AuthTokenRepo, DynAuthTokenRepo};
pub use password_resets::{DynPasswordResetRepo, PasswordResetRepo};
pub use users::{DynUserRepo, UserPersistenceError, UserRepo};
