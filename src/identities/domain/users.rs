use anyhow::Result;
use semval::prelude::*;
use url::Url;
use uuid::Uuid;

use crate::passwords::{self, Password, PasswordInvalidity};

use super::email::{Email, EmailInvalidity};

const MAX_USERNAME_LENGTH: usize = 255;

/// The name a user is publicly known by.
#[derive(Debug, Eq, PartialEq)]
pub struct Username(String);

impl Username {
    pub fn unvalidated(value: String) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum UsernameInvalidity {
    Missing,
    MaxLength(usize),
}

impl Validate for Username {
    type Invalidity = UsernameInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(self.0.is_empty(), UsernameInvalidity::Missing)
            .invalidate_if(
                self.0.len() > MAX_USERNAME_LENGTH,
                UsernameInvalidity::MaxLength(MAX_USERNAME_LENGTH),
            )
            .into()
    }
}

/// A link to a user's profile picture. Stored as the raw string the user
/// provided so an invalid value can still be reported back to them.
#[derive(Debug, Eq, PartialEq)]
pub struct Avatar(String);

impl Avatar {
    pub fn unvalidated(value: String) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum AvatarInvalidity {
    /// The value could not be parsed as an absolute URL.
    InvalidUrl,
}

impl Validate for Avatar {
    type Invalidity = AvatarInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(Url::parse(&self.0).is_err(), AvatarInvalidity::InvalidUrl)
            .into()
    }
}

#[derive(Debug)]
pub struct NewUser {
    id: Uuid,
    email: Email,
    username: Username,
    password: Password,
    avatar: Option<Avatar>,
}

impl NewUser {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.as_ref()
    }

    pub fn password_hash(&self) -> Result<passwords::Hash> {
        passwords::Hash::new(&self.password)
    }
}

#[derive(Debug)]
pub enum NewUserInvalidity {
    Email(EmailInvalidity),
    Username(UsernameInvalidity),
    Password(PasswordInvalidity),
    Avatar(AvatarInvalidity),
}

impl Validate for NewUser {
    type Invalidity = NewUserInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let mut context = ValidationContext::new()
            .validate_with(&self.email, NewUserInvalidity::Email)
            .validate_with(&self.username, NewUserInvalidity::Username)
            .validate_with(&self.password, NewUserInvalidity::Password);

        if let Some(avatar) = &self.avatar {
            context = context.validate_with(avatar, NewUserInvalidity::Avatar);
        }

        context.into()
    }
}

#[derive(Clone, Debug)]
pub struct NewUserData {
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar: Option<String>,
}

impl ValidatedFrom<NewUserData> for NewUser {
    fn validated_from(from: NewUserData) -> ValidatedResult<Self> {
        let into = NewUser {
            id: Uuid::new_v4(),
            email: Email::unvalidated(from.email),
            username: Username::unvalidated(from.username),
            password: Password::unvalidated(from.password),
            avatar: from.avatar.map(Avatar::unvalidated),
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// A validated set of changes to an existing user.
///
/// The email and password must always be provided. An omitted avatar clears
/// any previously stored value.
#[derive(Debug)]
pub struct UserUpdate {
    email: Email,
    password: Password,
    avatar: Option<Avatar>,
}

impl UserUpdate {
    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.as_ref()
    }

    pub fn password_hash(&self) -> Result<passwords::Hash> {
        passwords::Hash::new(&self.password)
    }
}

#[derive(Debug)]
pub enum UserUpdateInvalidity {
    Email(EmailInvalidity),
    Password(PasswordInvalidity),
    Avatar(AvatarInvalidity),
}

impl Validate for UserUpdate {
    type Invalidity = UserUpdateInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let mut context = ValidationContext::new()
            .validate_with(&self.email, UserUpdateInvalidity::Email)
            .validate_with(&self.password, UserUpdateInvalidity::Password);

        if let Some(avatar) = &self.avatar {
            context = context.validate_with(avatar, UserUpdateInvalidity::Avatar);
        }

        context.into()
    }
}

#[derive(Clone, Debug)]
pub struct UserUpdateData {
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

impl ValidatedFrom<UserUpdateData> for UserUpdate {
    fn validated_from(from: UserUpdateData) -> ValidatedResult<Self> {
        let into = UserUpdate {
            email: Email::unvalidated(from.email),
            password: Password::unvalidated(from.password),
            avatar: from.avatar.map(Avatar::unvalidated),
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
