use anyhow::Context;
use tracing::{info, instrument};

use crate::api::TaskApi;
use crate::error::ValidationError;
use crate::model::{LoginRequest, RegisterRequest, User};
use crate::session::Session;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Checks sign-in input before anything is sent.
pub fn validate_login(creds: &Credentials) -> Result<LoginRequest, ValidationError> {
    let email = creds.email.trim();
    if email.is_empty() || creds.password.trim().is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(LoginRequest {
        email: email.to_string(),
        password: creds.password.clone(),
    })
}

/// Checks sign-up input before anything is sent.
pub fn validate_register(
    name: &str,
    creds: &Credentials,
) -> Result<RegisterRequest, ValidationError> {
    if creds.email.trim().is_empty() || creds.password.trim().is_empty() {
        return Err(ValidationError::MissingFields);
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    let login = validate_login(creds)?;
    Ok(RegisterRequest {
        name: name.to_string(),
        email: login.email,
        password: login.password,
    })
}

#[instrument(skip(api, session, creds), fields(email = %creds.email))]
pub fn login<A: TaskApi>(api: &A, session: &Session, creds: &Credentials) -> anyhow::Result<User> {
    let payload = validate_login(creds)?;
    let user = api.login(&payload).context("failed to sign in")?;
    session.save_user_id(user.id)?;
    info!(user_id = user.id, "signed in");
    Ok(user)
}

#[instrument(skip(api, session, name, creds), fields(email = %creds.email))]
pub fn register<A: TaskApi>(
    api: &A,
    session: &Session,
    name: &str,
    creds: &Credentials,
) -> anyhow::Result<User> {
    let payload = validate_register(name, creds)?;
    let user = api.register(&payload).context("failed to register")?;
    session.save_user_id(user.id)?;
    info!(user_id = user.id, "registered and signed in");
    Ok(user)
}

#[instrument(skip(session))]
pub fn logout(session: &Session) -> anyhow::Result<()> {
    session.clear()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn login_requires_both_fields() {
        assert_eq!(
            validate_login(&creds("  ", "secret1")).expect_err("rejected"),
            ValidationError::MissingFields
        );
        assert_eq!(
            validate_login(&creds("a@b.c", "   ")).expect_err("rejected"),
            ValidationError::MissingFields
        );
    }

    #[test]
    fn short_password_is_rejected() {
        assert_eq!(
            validate_login(&creds("a@b.c", "12345")).expect_err("rejected"),
            ValidationError::PasswordTooShort
        );
    }

    #[test]
    fn email_is_trimmed_password_is_not() {
        let req = validate_login(&creds(" a@b.c ", " pass word ")).expect("valid");
        assert_eq!(req.email, "a@b.c");
        assert_eq!(req.password, " pass word ");
    }

    #[test]
    fn register_needs_a_name() {
        assert_eq!(
            validate_register(" ", &creds("a@b.c", "secret1")).expect_err("rejected"),
            ValidationError::MissingName
        );
        let req = validate_register(" Ada ", &creds("a@b.c", "secret1")).expect("valid");
        assert_eq!(req.name, "Ada");
    }
}
