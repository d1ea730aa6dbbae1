use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use semval::prelude::*;
use uuid::Uuid;

use crate::passwords::{Password, PasswordInvalidity};

use super::email::{Email, EmailInvalidity};

/// The number of random bytes backing a reset token. Hex encoding doubles
/// this, so the token itself is 48 characters long.
const RESET_TOKEN_BYTES: usize = 24;

/// How long a reset token remains redeemable after it was issued.
pub const RESET_TOKEN_MAX_AGE_HOURS: i64 = 24;

/// A request to start the password reset flow for an email address.
#[derive(Debug)]
pub struct NewPasswordReset {
    email: Email,
    reset_password_url: String,
    token: String,
}

impl NewPasswordReset {
    /// Create a new password reset with a randomly generated token.
    ///
    /// # Arguments
    ///
    /// * `email` - The email address of the user requesting a password reset.
    /// * `reset_password_url` - The location the emailed reset link should
    ///   point at. The token is appended to it as a query parameter.
    pub fn new(email: Email, reset_password_url: String) -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);

        Self {
            email,
            reset_password_url,
            token: hex::encode(bytes),
        }
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The full URL sent to the user, with the token attached as a query
    /// parameter.
    pub fn reset_url(&self) -> String {
        format!("{}?token={}", self.reset_password_url, self.token)
    }
}

#[derive(Debug)]
pub enum NewPasswordResetInvalidity {
    Email(EmailInvalidity),

    /// No location for the emailed reset link was provided. The value is
    /// otherwise treated as opaque.
    MissingResetUrl,
}

impl Validate for NewPasswordReset {
    type Invalidity = NewPasswordResetInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .validate_with(&self.email, NewPasswordResetInvalidity::Email)
            .invalidate_if(
                self.reset_password_url.is_empty(),
                NewPasswordResetInvalidity::MissingResetUrl,
            )
            .into()
    }
}

#[derive(Clone, Debug)]
pub struct NewPasswordResetData {
    pub email: String,
    pub reset_password_url: String,
}

impl ValidatedFrom<NewPasswordResetData> for NewPasswordReset {
    fn validated_from(from: NewPasswordResetData) -> ValidatedResult<Self> {
        let into = Self::new(Email::unvalidated(from.email), from.reset_password_url);

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// A request to redeem a reset token for a new password.
#[derive(Debug)]
pub struct PasswordResetSubmission {
    token: String,
    password: Password,
}

impl PasswordResetSubmission {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn password(&self) -> &Password {
        &self.password
    }
}

#[derive(Debug)]
pub enum PasswordResetSubmissionInvalidity {
    MissingToken,
    Password(PasswordInvalidity),
}

impl Validate for PasswordResetSubmission {
    type Invalidity = PasswordResetSubmissionInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                self.token.is_empty(),
                PasswordResetSubmissionInvalidity::MissingToken,
            )
            .validate_with(&self.password, PasswordResetSubmissionInvalidity::Password)
            .into()
    }
}

#[derive(Clone, Debug)]
pub struct PasswordResetSubmissionData {
    pub token: String,
    pub password: String,
}

impl ValidatedFrom<PasswordResetSubmissionData> for PasswordResetSubmission {
    fn validated_from(from: PasswordResetSubmissionData) -> ValidatedResult<Self> {
        let into = Self {
            token: from.token,
            password: Password::unvalidated(from.password),
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// The data backing a previously issued reset token.
#[derive(Debug)]
pub struct PasswordResetTokenData {
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// A reset token that was issued recently enough to still be redeemable.
#[derive(Debug)]
pub struct PasswordResetToken {
    user_id: Uuid,
    token: String,
    created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum PasswordResetTokenInvalidity {
    /// The token was issued too long ago to be redeemed.
    Expired,
}

impl Validate for PasswordResetToken {
    type Invalidity = PasswordResetTokenInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                Utc::now() - self.created_at > Duration::hours(RESET_TOKEN_MAX_AGE_HOURS),
                PasswordResetTokenInvalidity::Expired,
            )
            .into()
    }
}

impl ValidatedFrom<PasswordResetTokenData> for PasswordResetToken {
    fn validated_from(from: PasswordResetTokenData) -> ValidatedResult<Self> {
        let into = Self {
            user_id: from.user_id,
            token: from.token,
            created_at: from.created_at,
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reset_data() -> NewPasswordResetData {
        NewPasswordResetData {
            email: "test@example.com".to_owned(),
            reset_password_url: "https://x/reset".to_owned(),
        }
    }

    #[test]
    fn generated_token_is_hex_encoded() {
        let reset =
            NewPasswordReset::validated_from(reset_data()).expect("valid data should validate");

        assert_eq!(RESET_TOKEN_BYTES * 2, reset.token().len());
        assert!(reset.token().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_tokens_are_unique() {
        let first = NewPasswordReset::new(
            Email::unvalidated("test@example.com".to_owned()),
            "https://x/reset".to_owned(),
        );
        let second = NewPasswordReset::new(
            Email::unvalidated("test@example.com".to_owned()),
            "https://x/reset".to_owned(),
        );

        assert_ne!(first.token(), second.token());
    }

    #[test]
    fn reset_url_appends_token_as_query_parameter() {
        let reset =
            NewPasswordReset::validated_from(reset_data()).expect("valid data should validate");

        assert_eq!(
            format!("https://x/reset?token={}", reset.token()),
            reset.reset_url()
        );
    }

    #[test]
    fn validated_from_invalid_email() {
        let data = NewPasswordResetData {
            email: "some-invalid-email".to_owned(),
            ..reset_data()
        };

        let (_, context) = NewPasswordReset::validated_from(data)
            .expect_err("invalid email should not validate");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert!(!errors.is_empty());
    }

    #[test]
    fn validated_from_missing_reset_url() {
        let data = NewPasswordResetData {
            reset_password_url: String::new(),
            ..reset_data()
        };

        let (_, context) = NewPasswordReset::validated_from(data)
            .expect_err("missing reset url should not validate");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert!(errors
            .iter()
            .any(|invalidity| matches!(
                invalidity,
                NewPasswordResetInvalidity::MissingResetUrl
            )));
    }

    #[test]
    fn submission_missing_token() {
        let data = PasswordResetSubmissionData {
            token: String::new(),
            password: "newpass123".to_owned(),
        };

        let (_, context) = PasswordResetSubmission::validated_from(data)
            .expect_err("missing token should not validate");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert!(errors
            .iter()
            .any(|invalidity| matches!(
                invalidity,
                PasswordResetSubmissionInvalidity::MissingToken
            )));
    }

    #[test]
    fn submission_short_password() {
        let data = PasswordResetSubmissionData {
            token: "a".repeat(48),
            password: "123".to_owned(),
        };

        let (_, context) = PasswordResetSubmission::validated_from(data)
            .expect_err("short password should not validate");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert!(errors
            .iter()
            .any(|invalidity| matches!(
                invalidity,
                PasswordResetSubmissionInvalidity::Password(_)
            )));
    }

    #[test]
    fn fresh_token_validates() {
        let data = PasswordResetTokenData {
            user_id: Uuid::new_v4(),
            token: "a".repeat(48),
            created_at: Utc::now(),
        };

        assert!(PasswordResetToken::validated_from(data).is_ok());
    }

    #[test]
    fn stale_token_is_expired() {
        let data = PasswordResetTokenData {
            user_id: Uuid::new_v4(),
            token: "a".repeat(48),
            created_at: Utc::now() - Duration::hours(RESET_TOKEN_MAX_AGE_HOURS + 1),
        };

        let (_, context) = PasswordResetToken::validated_from(data)
            .expect_err("stale token should not validate");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert_eq!(vec![PasswordResetTokenInvalidity::Expired], errors);
    }
}
