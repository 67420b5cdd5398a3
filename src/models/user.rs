use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Role given to every account at registration.
pub const DEFAULT_ROLE: &str = "role_user";
/// Avatar reference used until the user uploads one.
pub const DEFAULT_IMAGE: &str = "default_user.png";

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's first name.
    pub name: String,
    /// The user's last name.
    pub last_name: String,
    /// The user's unique handle, stored lowercased.
    pub nick: String,
    /// The user's email address, stored lowercased.
    pub email: String,
    /// Free-form profile text.
    pub bio: Option<String>,
    /// The user's hashed password.
    pub password: String,
    /// The user's role.
    pub role: String,
    /// Reference to the user's avatar.
    pub image: String,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a user. The password is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub last_name: String,
    pub nick: String,
    pub email: String,
    pub bio: Option<String>,
    pub password_hash: String,
}

/// A partial profile update. `None` leaves the column untouched.
#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub nick: Option<String>,
    pub email: Option<String>,
    /// `Some("")` clears the bio.
    pub bio: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    /// Whether applying these changes would leave the row as it is.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.last_name.is_none()
            && self.nick.is_none()
            && self.email.is_none()
            && self.bio.is_none()
            && self.password_hash.is_none()
    }
}

/// What anyone may see about a user: no password, role or email.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub nick: String,
    pub bio: Option<String>,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// What the owner of an account sees about it.
#[derive(Clone, Debug, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub profile: PublicUser,
    pub email: String,
    pub role: String,
}

/// The user block returned next to a fresh token.
#[derive(Clone, Debug, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub nick: String,
    pub image: String,
}

/// Just enough to label an author or a followed user.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AuthorName {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            last_name: self.last_name.clone(),
            nick: self.nick.clone(),
            bio: self.bio.clone(),
            image: self.image.clone(),
            created_at: self.created_at,
        }
    }

    pub fn account(&self) -> AccountView {
        AccountView {
            profile: self.public(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }

    pub fn session(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            name: self.name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            nick: self.nick.clone(),
            image: self.image.clone(),
        }
    }

    pub fn author_name(&self) -> AuthorName {
        AuthorName {
            id: self.id,
            name: self.name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            last_name: "Liddell".into(),
            nick: "alice".into(),
            email: "alice@x.com".into(),
            bio: None,
            password: "$argon2id$v=19$secret".into(),
            role: DEFAULT_ROLE.into(),
            image: DEFAULT_IMAGE.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn account_view_never_carries_the_password() {
        let json = sonic_rs::to_string(&sample().account()).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"email\":\"alice@x.com\""));
        assert!(json.contains("\"nick\":\"alice\""));
    }

    #[test]
    fn public_projection_hides_email_and_role() {
        let json = sonic_rs::to_string(&sample().public()).unwrap();
        assert!(!json.contains("email"));
        assert!(!json.contains("role"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn empty_changes() {
        assert!(UserChanges::default().is_empty());
        let changes = UserChanges {
            bio: Some("hi".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
