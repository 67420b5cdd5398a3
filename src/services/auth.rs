use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::{
    error::{AppError, AuthError, Result},
    models::{claims::Claims, user::{NewUser, User}},
    state::AppState,
    validation::users::{check, LoginRequest, RegisterRequest},
};

/// The memory cost for Argon2 in MB.
#[cfg(not(test))]
const ARGON2_MEMORY_MB: u32 = 19;
#[cfg(test)]
const ARGON2_MEMORY_MB: u32 = 1;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-encoded hash.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    salt_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against a stored hash.
///
/// The parameters are read from the hash itself, so hashes made with older
/// settings keep verifying.
///
/// # Returns
///
/// A `Result` containing `true` if the password matches.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(result)
}

/// Signs a session token for `user_id`.
///
/// # Arguments
///
/// * `secret` - The HMAC key.
/// * `user_id` - The user the token is issued to.
/// * `role` - The user's role, copied into the claims.
/// * `now` - Issue time.
/// * `ttl_days` - Days until the token expires.
///
/// # Returns
///
/// A `Result` containing the encoded HS256 token.
pub fn issue_token(
    secret: &[u8],
    user_id: Uuid,
    role: &str,
    now: DateTime<Utc>,
    ttl_days: i64,
) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(ttl_days)).timestamp(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Checks the signature of `token` and that it has not expired at `now`.
///
/// A token is expired from the second its `exp` is reached.
pub fn verify_token(
    secret: &[u8],
    token: &str,
    now: DateTime<Utc>,
) -> std::result::Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| {
            match e.kind() {
                ErrorKind::InvalidSignature => tracing::debug!("Token signature mismatch"),
                other => tracing::debug!("Token rejected: {:?}", other),
            }
            AuthError::InvalidToken
        },
    )?;

    if now.timestamp() >= data.claims.exp {
        return Err(AuthError::Expired);
    }

    Ok(data.claims)
}

/// Creates an account.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The registration payload.
///
/// # Returns
///
/// A `Result` containing the created `User`.
pub async fn register(state: &AppState, request: RegisterRequest) -> Result<User> {
    check(&request)?;
    tracing::debug!("🔐 Registering user: {}", request.nick);

    let clashes = state
        .users
        .find_by_email_or_nick(Some(&request.email), Some(&request.nick))
        .await?;
    if !clashes.is_empty() {
        return Err(AppError::Conflict(
            "A user with that email or nick already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let user = state
        .users
        .create(NewUser {
            name: request.name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            nick: request.nick.trim().to_string(),
            email: request.email.trim().to_string(),
            bio: request.bio.filter(|bio| !bio.trim().is_empty()),
            password_hash,
        })
        .await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Checks credentials and issues a session token.
///
/// # Returns
///
/// A `Result` containing the token and the authenticated `User`.
pub async fn login(state: &AppState, request: LoginRequest) -> Result<(String, User)> {
    check(&request)?;
    tracing::debug!("🔐 Authenticating user: {}", request.email);

    let user = state
        .users
        .find_by_email(request.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !verify_password(&request.password, &user.password)? {
        return Err(AppError::Authentication("Wrong password".to_string()));
    }

    let token = issue_token(
        &state.config.jwt_secret,
        user.id,
        &user.role,
        Utc::now(),
        state.config.session_duration_days,
    )?;

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok((token, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;

    const SECRET: &[u8] = b"an-hmac-secret-that-is-long-enough";

    fn registration(nick: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Alice".into(),
            last_name: "Liddell".into(),
            nick: nick.into(),
            email: email.into(),
            password: "wonderland".into(),
            bio: None,
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
    }

    #[test]
    fn token_carries_claims() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let token = issue_token(SECRET, user, "role_user", now, 7).unwrap();

        let claims = verify_token(SECRET, &token, now).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, "role_user");
        assert_eq!(claims.exp - claims.iat, 7 * 86_400);
    }

    #[test]
    fn token_expires_exactly_at_exp() {
        let now = Utc::now();
        let token = issue_token(SECRET, Uuid::new_v4(), "role_user", now, 7).unwrap();

        let just_before = now + Duration::days(7) - Duration::seconds(1);
        assert!(verify_token(SECRET, &token, just_before).is_ok());
        assert_eq!(
            verify_token(SECRET, &token, now + Duration::days(7)),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn foreign_or_garbled_tokens_are_invalid() {
        let now = Utc::now();
        let token = issue_token(b"some-other-secret", Uuid::new_v4(), "role_user", now, 7).unwrap();
        assert_eq!(verify_token(SECRET, &token, now), Err(AuthError::InvalidToken));
        assert_eq!(verify_token(SECRET, "not.a.jwt", now), Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let state = test_state();
        register(&state, registration("alice", "alice@x.com")).await.unwrap();

        let err = register(&state, registration("alice2", "ALICE@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let state = test_state();
        let user = register(&state, registration("bob", "bob@x.com")).await.unwrap();

        let (token, logged_in) = login(
            &state,
            LoginRequest {
                email: "Bob@X.com".into(),
                password: "wonderland".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged_in.id, user.id);
        let claims = verify_token(&state.config.jwt_secret, &token, Utc::now()).unwrap();
        assert_eq!(claims.sub, user.id);

        let err = login(
            &state,
            LoginRequest {
                email: "bob@x.com".into(),
                password: "nope".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn login_unknown_email_is_not_found() {
        let state = test_state();
        let err = login(
            &state,
            LoginRequest {
                email: "ghost@x.com".into(),
                password: "pw".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
