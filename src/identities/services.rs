use std::sync::Arc;

use anyhow::Context;
use semval::ValidatedFrom;
use tera::Tera;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    email::{
        clients::{EmailClient, Message},
        FORGOT_PASSWORD_TEMPLATE,
    },
    passwords,
    repos::{DynPasswordResetRepo, DynUserRepo, UserPersistenceError},
};

use super::{
    domain::{
        password_resets::{
            NewPasswordReset, NewPasswordResetData, NewPasswordResetInvalidity,
            PasswordResetSubmission, PasswordResetSubmissionData,
            PasswordResetSubmissionInvalidity, PasswordResetToken, PasswordResetTokenData,
        },
        users::{NewUser, NewUserData, NewUserInvalidity, UserUpdate, UserUpdateData,
            UserUpdateInvalidity},
    },
    models,
};

pub type DynEmailClient = Arc<dyn EmailClient>;

/// The product name rendered into transactional email.
pub const PRODUCT_NAME: &str = "Roleplay";

const FORGOT_PASSWORD_SUBJECT: &str = "Roleplay: Recuperação de Senha";

/// A service object providing functionality relating to users.
#[derive(Clone)]
pub struct UserService {
    user_repo: DynUserRepo,
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    /// The provided user data is invalid.
    #[error("invalid user data: {0:?}")]
    InvalidUser(semval::context::Context<NewUserInvalidity>),

    /// Another user already registered with the provided email address.
    #[error("email address is already in use")]
    DuplicateEmail,

    /// Another user already claimed the provided username.
    #[error("username is already in use")]
    DuplicateUsername,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum UpdateUserError {
    /// The provided user data is invalid.
    #[error("invalid user data: {0:?}")]
    InvalidUser(semval::context::Context<UserUpdateInvalidity>),

    /// Another user already registered with the provided email address.
    #[error("email address is already in use")]
    DuplicateEmail,

    /// No user exists with the provided ID.
    #[error("user does not exist")]
    UserNotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UserService {
    /// Create a new user service.
    ///
    /// # Arguments
    ///
    /// * `user_repo` - The repository used to persist and query user
    ///   information.
    pub fn new(user_repo: DynUserRepo) -> Self {
        Self { user_repo }
    }

    /// Register a new user.
    ///
    /// The user's password is hashed before anything is persisted. Duplicate
    /// emails and usernames are reported as distinct errors so the caller can
    /// name the offending field.
    ///
    /// # Arguments
    ///
    /// * `new_user_data` - The new user's information.
    pub async fn create_user(&self, new_user_data: NewUserData) -> Result<NewUser, CreateUserError> {
        let new_user = NewUser::validated_from(new_user_data)
            .map_err(|(_, context)| CreateUserError::InvalidUser(context))?;

        let user_model = models::users::NewUserModel::try_from(&new_user)
            .context("Failed to convert from domain to model.")?;

        match self.user_repo.persist_new_user(&user_model).await {
            Ok(()) => {
                info!(user_id = %new_user.id(), "Registered new user.");

                Ok(new_user)
            }
            Err(UserPersistenceError::DuplicateEmail(_)) => Err(CreateUserError::DuplicateEmail),
            Err(UserPersistenceError::DuplicateUsername(_)) => {
                Err(CreateUserError::DuplicateUsername)
            }
            Err(error) => Err(anyhow::Error::from(error).into()),
        }
    }

    /// Overwrite a user's email, password, and avatar.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The ID of the user to update.
    /// * `update_data` - The changes to apply.
    ///
    /// # Returns
    ///
    /// The updated user row.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        update_data: UserUpdateData,
    ) -> Result<models::users::User, UpdateUserError> {
        let update = UserUpdate::validated_from(update_data)
            .map_err(|(_, context)| UpdateUserError::InvalidUser(context))?;

        let update_model = models::users::UserUpdateModel::for_user(user_id, &update)
            .context("Failed to convert from domain to model.")?;

        match self.user_repo.update_user(&update_model).await {
            Ok(user) => {
                debug!(%user_id, "Updated user profile.");

                Ok(user)
            }
            Err(UserPersistenceError::UserNotFound) => Err(UpdateUserError::UserNotFound),
            Err(UserPersistenceError::DuplicateEmail(_)) => Err(UpdateUserError::DuplicateEmail),
            Err(error) => Err(anyhow::Error::from(error).into()),
        }
    }

    /// Find a user by their ID.
    pub async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<models::users::User>> {
        self.user_repo.find_by_id(user_id).await
    }
}

/// A service object providing the password reset flow.
#[derive(Clone)]
pub struct PasswordResetService {
    email_client: DynEmailClient,
    from_address: String,
    reset_repo: DynPasswordResetRepo,
    templates: Tera,
    user_repo: DynUserRepo,
}

#[derive(Debug, Error)]
pub enum RequestResetError {
    /// The provided reset request data is invalid.
    #[error("invalid reset request: {0:?}")]
    InvalidRequest(semval::context::Context<NewPasswordResetInvalidity>),

    /// No user is registered with the provided email address.
    #[error("no user found with the provided email address")]
    UnknownEmail,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ResetPasswordError {
    /// The provided submission data is invalid.
    #[error("invalid reset submission: {0:?}")]
    InvalidSubmission(semval::context::Context<PasswordResetSubmissionInvalidity>),

    /// The provided token does not resolve to a redeemable reset.
    #[error("reset token does not exist or has expired")]
    TokenNotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PasswordResetService {
    /// Create a new password reset service.
    ///
    /// # Arguments
    ///
    /// * `email_client` - The client used to send emails.
    /// * `from_address` - The sender address for reset emails.
    /// * `reset_repo` - The repository used to persist and query reset tokens.
    /// * `templates` - The templating engine to use for composing email
    ///   content.
    /// * `user_repo` - The repository used to query user information.
    pub fn new(
        email_client: DynEmailClient,
        from_address: String,
        reset_repo: DynPasswordResetRepo,
        templates: Tera,
        user_repo: DynUserRepo,
    ) -> Self {
        Self {
            email_client,
            from_address,
            reset_repo,
            templates,
            user_repo,
        }
    }

    /// Issue a reset token for the user registered with an email address and
    /// mail them a link to redeem it.
    ///
    /// The token replaces any token the user already had, so a user never
    /// holds more than one live token. If sending the email fails after the
    /// token was persisted, the token remains valid.
    ///
    /// # Arguments
    ///
    /// * `reset_data` - The requesting user's email address and the location
    ///   the emailed link should point at.
    pub async fn request_reset(
        &self,
        reset_data: NewPasswordResetData,
    ) -> Result<(), RequestResetError> {
        let reset = NewPasswordReset::validated_from(reset_data)
            .map_err(|(_, context)| RequestResetError::InvalidRequest(context))?;

        let user = self
            .user_repo
            .find_by_email(reset.email().address())
            .await
            .context("Failed to look up user by email.")?
            .ok_or(RequestResetError::UnknownEmail)?;

        let reset_model = models::password_resets::NewPasswordReset {
            user_id: user.id,
            token: reset.token().to_owned(),
        };

        self.reset_repo
            .upsert_token_for_user(&reset_model)
            .await
            .context("Failed to save password reset token.")?;

        let mut context = tera::Context::new();
        context.insert("product_name", PRODUCT_NAME);
        context.insert("name", &user.username);
        context.insert("reset_password_url", &reset.reset_url());

        let content = self
            .templates
            .render(FORGOT_PASSWORD_TEMPLATE, &context)
            .context("Failed to render password reset template.")?;

        let message = Message {
            from: self.from_address.clone(),
            to: user.email.clone(),
            subject: FORGOT_PASSWORD_SUBJECT.to_owned(),
            html: content,
        };

        self.email_client
            .send(&message)
            .await
            .context("Failed to send password reset email.")?;

        info!(user_id = %user.id, "Sent password reset token.");

        Ok(())
    }

    /// Redeem a reset token for a new password.
    ///
    /// Tokens are single use. The token is claimed before the credential is
    /// touched so concurrent redemptions of the same token cannot both
    /// succeed.
    ///
    /// # Arguments
    ///
    /// * `submission_data` - The token being redeemed and the new password.
    pub async fn reset_password(
        &self,
        submission_data: PasswordResetSubmissionData,
    ) -> Result<(), ResetPasswordError> {
        let submission = PasswordResetSubmission::validated_from(submission_data)
            .map_err(|(_, context)| ResetPasswordError::InvalidSubmission(context))?;

        let reset_model = self
            .reset_repo
            .find_by_token(submission.token())
            .await
            .context("Failed to look up password reset token.")?
            .ok_or(ResetPasswordError::TokenNotFound)?;

        let reset_token =
            match PasswordResetToken::validated_from(PasswordResetTokenData::from(reset_model)) {
                Ok(token) => token,
                Err((_, context)) => {
                    debug!(?context, "Rejected stale password reset token.");

                    return Err(ResetPasswordError::TokenNotFound);
                }
            };

        let claimed = self
            .reset_repo
            .invalidate_token(reset_token.token())
            .await
            .context("Failed to invalidate password reset token.")?;
        if !claimed {
            return Err(ResetPasswordError::TokenNotFound);
        }

        debug!(user_id = %reset_token.user_id(), "Deleted password reset token.");

        let hash = passwords::Hash::new(submission.password())
            .context("Failed to hash new password.")?;

        self.user_repo
            .update_password_hash(reset_token.user_id(), hash.value())
            .await
            .context("Failed to persist new password.")?;

        info!(user_id = %reset_token.user_id(), "Reset user's password.");

        Ok(())
    }
}
