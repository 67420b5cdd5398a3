use garde::Validate;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Longest accepted password, in bytes.
const MAX_PASSWORD_LEN: usize = 128;
/// Longest accepted nick, in characters.
const MAX_NICK_LEN: usize = 30;

/// The request payload for user registration.
///
/// Absent fields deserialize to empty strings so that they are reported by
/// validation instead of failing to parse.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[garde(custom(not_blank), length(max = 100))]
    pub name: String,
    #[serde(default)]
    #[garde(custom(not_blank), length(max = 100))]
    pub last_name: String,
    #[serde(default)]
    #[garde(custom(nick_rule))]
    pub nick: String,
    #[serde(default)]
    #[garde(email)]
    pub email: String,
    #[serde(default)]
    #[garde(custom(password_rule))]
    pub password: String,
    #[serde(default)]
    #[garde(length(max = 500))]
    pub bio: Option<String>,
}

/// The request payload for user login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[garde(custom(not_blank))]
    pub email: String,
    #[serde(default)]
    #[garde(custom(not_blank))]
    pub password: String,
}

/// The request payload for a profile update. Every field is optional.
///
/// `role` and other server-managed fields are not part of the payload and
/// are dropped if a client sends them.
#[derive(Deserialize, Validate, Default)]
pub struct UpdateUserRequest {
    #[garde(inner(custom(not_blank)), length(max = 100))]
    pub name: Option<String>,
    #[garde(inner(custom(not_blank)), length(max = 100))]
    pub last_name: Option<String>,
    #[garde(skip)]
    pub nick: Option<String>,
    #[garde(email)]
    pub email: Option<String>,
    #[garde(length(max = 500))]
    pub bio: Option<String>,
    #[garde(skip)]
    pub password: Option<String>,
}

/// The request payload for following a user.
#[derive(Deserialize)]
pub struct FollowRequest {
    #[serde(default)]
    pub followed_user: Option<String>,
}

/// The request payload for a new publication.
#[derive(Deserialize)]
pub struct PublicationRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Runs the derived rules of `value`, folding the report into one
/// `Validation` error.
pub fn check<T>(value: &T) -> Result<()>
where
    T: Validate<Context = ()>,
{
    value
        .validate()
        .map_err(|report| AppError::Validation(report.to_string().trim().to_string()))
}

fn not_blank(value: &str, _: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("is required"));
    }
    Ok(())
}

fn nick_rule(value: &str, _: &()) -> garde::Result {
    nick_problem(value).map_or(Ok(()), |problem| Err(garde::Error::new(problem)))
}

fn password_rule(value: &str, _: &()) -> garde::Result {
    password_problem(value).map_or(Ok(()), |problem| Err(garde::Error::new(problem)))
}

fn nick_problem(nick: &str) -> Option<&'static str> {
    if nick.trim().is_empty() {
        return Some("is required");
    }
    if nick.chars().count() > MAX_NICK_LEN {
        return Some("must be at most 30 characters");
    }
    if !nick
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Some("can only contain letters, numbers, underscores, hyphens and dots");
    }
    None
}

fn password_problem(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        return Some("is required");
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Some("must be at most 128 characters");
    }
    None
}

/// Validates a nick.
///
/// # Arguments
///
/// * `nick` - The nick to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the nick is valid.
pub fn validate_nick(nick: &str) -> Result<()> {
    match nick_problem(nick) {
        Some(problem) => Err(AppError::Validation(format!("nick: {}", problem))),
        None => Ok(()),
    }
}

/// Validates a password.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    match password_problem(password) {
        Some(problem) => Err(AppError::Validation(format!("password: {}", problem))),
        None => Ok(()),
    }
}

/// Parses a path id.
pub fn parse_id(raw: &str, what: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid {} id", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(nick: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Alice".into(),
            last_name: "Liddell".into(),
            nick: nick.into(),
            email: email.into(),
            password: password.into(),
            bio: None,
        }
    }

    #[test]
    fn accepts_a_complete_registration() {
        assert!(check(&register("alice.l", "alice@x.com", "secret")).is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        let mut request = register("alice", "alice@x.com", "secret");
        request.name = "   ".into();
        let err = check(&request).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("name")));
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(check(&register("alice", "not-an-email", "secret")).is_err());
    }

    #[test]
    fn nick_charset() {
        assert!(validate_nick("alice_01-b.c").is_ok());
        assert!(validate_nick("alice smith").is_err());
        assert!(validate_nick("alice@home").is_err());
        assert!(validate_nick("").is_err());
    }

    #[test]
    fn password_bounds() {
        assert!(validate_password("x").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"a".repeat(129)).is_err());
    }

    #[test]
    fn login_requires_both_fields() {
        let request = LoginRequest {
            email: "alice@x.com".into(),
            password: String::new(),
        };
        assert!(check(&request).is_err());
    }

    #[test]
    fn update_accepts_partial_payload() {
        let request = UpdateUserRequest {
            bio: Some("hello".into()),
            ..Default::default()
        };
        assert!(check(&request).is_ok());

        let request = UpdateUserRequest {
            email: Some("broken".into()),
            ..Default::default()
        };
        assert!(check(&request).is_err());
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("nope", "user").is_err());
        assert!(parse_id(&uuid::Uuid::new_v4().to_string(), "user").is_ok());
    }
}
