use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session token.
///
/// Tokens are never stored; the signature and `exp` are all that make one valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: Uuid,
    /// The user's role at issue time.
    pub role: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}
