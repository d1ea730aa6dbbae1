pub mod clients;

use tera::Tera;

/// The template used for the forgot-password email body.
pub const FORGOT_PASSWORD_TEMPLATE: &str = "emails/forgot_password.html";

/// Build the template engine used for email content.
///
/// Templates are embedded in the binary so that rendering never depends on
/// the working directory the server happens to be launched from.
pub fn templates() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(
        FORGOT_PASSWORD_TEMPLATE,
        include_str!("../../templates/emails/forgot_password.html"),
    )?;

    Ok(tera)
}
