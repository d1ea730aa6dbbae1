use semval::prelude::*;

#[derive(Debug, Eq, PartialEq)]
pub struct Email(String);

impl Email {
    /// Create an unvalidated email.
    ///
    /// This can be useful when constructing an object that contains an email
    /// but has not been validated yet.
    ///
    /// # Arguments
    ///
    /// * `address` - The email's address.
    pub fn unvalidated(address: String) -> Self {
        Self(address)
    }

    pub fn address(&self) -> &str {
        &self.0
    }

    fn has_local_part(&self) -> bool {
        if let Some(index) = self.0.find('@') {
            index > 0
        } else {
            false
        }
    }

    fn has_domain(&self) -> bool {
        if let Some(index) = self.0.find('@') {
            index < self.0.len() - 1
        } else {
            false
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum EmailInvalidity {
    /// The address does not have a domain portion.
    MissingDomain,

    /// The address does not have anything before the `@` symbol.
    MissingLocalPart,

    /// The address is missing the `@` symbol separating the local and domain
    /// parts.
    MissingSeparator,
}

impl Validate for Email {
    type Invalidity = EmailInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(!self.0.contains('@'), EmailInvalidity::MissingSeparator)
            .invalidate_if(!self.has_local_part(), EmailInvalidity::MissingLocalPart)
            .invalidate_if(!self.has_domain(), EmailInvalidity::MissingDomain)
            .into()
    }
}

impl ValidatedFrom<&str> for Email {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Self(from.to_owned());

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
