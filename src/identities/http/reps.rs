use semval::context::Context as ValidationContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http_err::ApiError;
use crate::identities::domain::email::EmailInvalidity;
use crate::identities::domain::password_resets::{
    NewPasswordResetData, NewPasswordResetInvalidity, PasswordResetSubmissionData,
    PasswordResetSubmissionInvalidity,
};
use crate::identities::domain::users::{
    AvatarInvalidity, NewUser, NewUserData, NewUserInvalidity, UserUpdateData,
    UserUpdateInvalidity, UsernameInvalidity,
};
use crate::identities::models;
use crate::passwords::PasswordInvalidity;

#[derive(Deserialize)]
pub struct NewUserRequest {
    email: String,
    username: String,
    password: String,
    #[serde(default)]
    avatar: Option<String>,
}

impl From<NewUserRequest> for NewUserData {
    fn from(rep: NewUserRequest) -> Self {
        Self {
            email: rep.email,
            username: rep.username,
            password: rep.password,
            avatar: rep.avatar,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    email: String,
    password: String,
    #[serde(default)]
    avatar: Option<String>,
}

impl From<UpdateUserRequest> for UserUpdateData {
    fn from(rep: UpdateUserRequest) -> Self {
        Self {
            email: rep.email,
            password: rep.password,
            avatar: rep.avatar,
        }
    }
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    email: String,
    #[serde(rename = "resetPasswordUrl")]
    reset_password_url: String,
}

impl From<PasswordResetRequest> for NewPasswordResetData {
    fn from(rep: PasswordResetRequest) -> Self {
        Self {
            email: rep.email,
            reset_password_url: rep.reset_password_url,
        }
    }
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    token: String,
    password: String,
}

impl From<ResetPasswordRequest> for PasswordResetSubmissionData {
    fn from(rep: ResetPasswordRequest) -> Self {
        Self {
            token: rep.token,
            password: rep.password,
        }
    }
}

/// The user representation embedded in response envelopes. Password material
/// never appears here.
#[derive(Serialize)]
pub struct UserRep {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub user: UserRep,
}

impl From<&NewUser> for UserEnvelope {
    fn from(user: &NewUser) -> Self {
        Self {
            user: UserRep {
                id: user.id(),
                email: user.email().address().to_owned(),
                username: user.username().value().to_owned(),
                avatar: user.avatar().map(|avatar| avatar.value().to_owned()),
            },
        }
    }
}

impl From<&models::users::User> for UserEnvelope {
    fn from(user: &models::users::User) -> Self {
        Self {
            user: UserRep {
                id: user.id,
                email: user.email.clone(),
                username: user.username.clone(),
                avatar: user.avatar.clone(),
            },
        }
    }
}

fn email_message(invalidity: EmailInvalidity) -> String {
    match invalidity {
        EmailInvalidity::MissingDomain => "Email is missing a domain.".to_owned(),
        EmailInvalidity::MissingLocalPart => "Email is missing a local part.".to_owned(),
        EmailInvalidity::MissingSeparator => "Email is missing an '@' symbol.".to_owned(),
    }
}

fn username_message(invalidity: UsernameInvalidity) -> String {
    match invalidity {
        UsernameInvalidity::Missing => "Username is required.".to_owned(),
        UsernameInvalidity::MaxLength(max) => format!(
            "Usernames may not contain more than {} characters.",
            max
        ),
    }
}

fn password_message(invalidity: PasswordInvalidity) -> String {
    match invalidity {
        PasswordInvalidity::MaxLength(max) => format!(
            "Passwords may not contain more than {} characters.",
            max
        ),
        PasswordInvalidity::MinLength(min) => {
            format!("Passwords must contain at least {} characters.", min)
        }
    }
}

fn avatar_message(invalidity: AvatarInvalidity) -> String {
    match invalidity {
        AvatarInvalidity::InvalidUrl => "Avatar must be a valid URL.".to_owned(),
    }
}

impl From<ValidationContext<NewUserInvalidity>> for ApiError {
    fn from(validation: ValidationContext<NewUserInvalidity>) -> Self {
        let messages = validation
            .into_iter()
            .map(|invalidity| match invalidity {
                NewUserInvalidity::Email(email) => email_message(email),
                NewUserInvalidity::Username(username) => username_message(username),
                NewUserInvalidity::Password(password) => password_message(password),
                NewUserInvalidity::Avatar(avatar) => avatar_message(avatar),
            })
            .collect::<Vec<_>>();

        Self::ValidationFailed(messages.join(" "))
    }
}

impl From<ValidationContext<UserUpdateInvalidity>> for ApiError {
    fn from(validation: ValidationContext<UserUpdateInvalidity>) -> Self {
        let messages = validation
            .into_iter()
            .map(|invalidity| match invalidity {
                UserUpdateInvalidity::Email(email) => email_message(email),
                UserUpdateInvalidity::Password(password) => password_message(password),
                UserUpdateInvalidity::Avatar(avatar) => avatar_message(avatar),
            })
            .collect::<Vec<_>>();

        Self::ValidationFailed(messages.join(" "))
    }
}

impl From<ValidationContext<NewPasswordResetInvalidity>> for ApiError {
    fn from(validation: ValidationContext<NewPasswordResetInvalidity>) -> Self {
        let messages = validation
            .into_iter()
            .map(|invalidity| match invalidity {
                NewPasswordResetInvalidity::Email(email) => email_message(email),
                NewPasswordResetInvalidity::MissingResetUrl => {
                    "A reset password URL is required.".to_owned()
                }
            })
            .collect::<Vec<_>>();

        Self::ValidationFailed(messages.join(" "))
    }
}

impl From<ValidationContext<PasswordResetSubmissionInvalidity>> for ApiError {
    fn from(validation: ValidationContext<PasswordResetSubmissionInvalidity>) -> Self {
        let messages = validation
            .into_iter()
            .map(|invalidity| match invalidity {
                PasswordResetSubmissionInvalidity::MissingToken => {
                    "A password reset token is required.".to_owned()
                }
                PasswordResetSubmissionInvalidity::Password(password) => {
                    password_message(password)
                }
            })
            .collect::<Vec<_>>();

        Self::ValidationFailed(messages.join(" "))
    }
}
