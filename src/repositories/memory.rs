//! In-process storage selected with `DATABASE_URL=memory://`.
//!
//! Enforces the same uniqueness and reference rules as the PostgreSQL
//! schema, so services behave identically on either backend. Data lives
//! only as long as the process.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        follow::{Follow, FollowEntry},
        page::PageRequest,
        publication::{Publication, PublicationView},
        user::{AuthorName, NewUser, PublicUser, User, UserChanges, DEFAULT_IMAGE, DEFAULT_ROLE},
    },
    repositories::{
        follow::{Direction, FollowRepository, ALREADY_FOLLOWING, TARGET_MISSING},
        publication::PublicationRepository,
        user::UserRepository,
    },
};

const DUPLICATE_USER: &str = "A user with that email or nick already exists";

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    follows: Vec<Follow>,
    publications: Vec<Publication>,
}

/// All three repositories over one set of in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

/// Rows newest first; later inserts win ties on the timestamp.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, key: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

fn slice<T>(rows: Vec<T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(0);
    rows.into_iter().skip(offset).take(limit).collect()
}

fn taken(users: &[User], email: &str, nick: &str, except: Option<Uuid>) -> bool {
    users.iter().any(|user| {
        Some(user.id) != except
            && (user.email.eq_ignore_ascii_case(email) || user.nick.eq_ignore_ascii_case(nick))
    })
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut tables = self.lock()?;
        if taken(&tables.users, &new_user.email, &new_user.nick, None) {
            return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            last_name: new_user.last_name,
            nick: new_user.nick.to_lowercase(),
            email: new_user.email.to_lowercase(),
            bio: new_user.bio,
            password: new_user.password_hash,
            role: DEFAULT_ROLE.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_email_or_nick(
        &self,
        email: Option<&str>,
        nick: Option<&str>,
    ) -> Result<Vec<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .filter(|u| {
                email.is_some_and(|e| u.email.eq_ignore_ascii_case(e))
                    || nick.is_some_and(|n| u.nick.eq_ignore_ascii_case(n))
            })
            .cloned()
            .collect())
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64)> {
        let tables = self.lock()?;
        let total = tables.users.len() as i64;
        Ok((slice(tables.users.clone(), page), total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut tables = self.lock()?;
        let Some(index) = tables.users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };

        let current = &tables.users[index];
        let email = changes.email.as_deref().unwrap_or(&current.email).to_lowercase();
        let nick = changes.nick.as_deref().unwrap_or(&current.nick).to_lowercase();
        if taken(&tables.users, &email, &nick, Some(id)) {
            return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
        }

        let user = &mut tables.users[index];
        user.email = email;
        user.nick = nick;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = changes.bio {
            user.bio = (!bio.is_empty()).then_some(bio);
        }
        if let Some(password) = changes.password_hash {
            user.password = password;
        }
        Ok(Some(user.clone()))
    }

    async fn set_image(&self, id: Uuid, image: &str) -> Result<Option<User>> {
        let mut tables = self.lock()?;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.image = image.to_string();
            user.clone()
        }))
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn insert(&self, follower: Uuid, followed: Uuid) -> Result<Follow> {
        let mut tables = self.lock()?;
        if follower == followed {
            return Err(AppError::Validation("You can't follow yourself".to_string()));
        }
        if !tables.users.iter().any(|u| u.id == followed) {
            return Err(AppError::NotFound(TARGET_MISSING.to_string()));
        }
        if tables
            .follows
            .iter()
            .any(|f| f.following_user == follower && f.followed_user == followed)
        {
            return Err(AppError::Conflict(ALREADY_FOLLOWING.to_string()));
        }

        let follow = Follow {
            id: Uuid::new_v4(),
            following_user: follower,
            followed_user: followed,
            created_at: Utc::now(),
        };
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete(&self, follower: Uuid, followed: Uuid) -> Result<Option<Follow>> {
        let mut tables = self.lock()?;
        let position = tables
            .follows
            .iter()
            .position(|f| f.following_user == follower && f.followed_user == followed);
        Ok(position.map(|index| tables.follows.remove(index)))
    }

    async fn find(&self, follower: Uuid, followed: Uuid) -> Result<Option<Follow>> {
        Ok(self
            .lock()?
            .follows
            .iter()
            .find(|f| f.following_user == follower && f.followed_user == followed)
            .cloned())
    }

    async fn list(
        &self,
        user: Uuid,
        direction: Direction,
        page: PageRequest,
    ) -> Result<(Vec<FollowEntry>, i64)> {
        let tables = self.lock()?;
        let edges = tables.follows.iter().filter(|f| match direction {
            Direction::Following => f.following_user == user,
            Direction::Followers => f.followed_user == user,
        });
        let edges = newest_first(edges.cloned(), |f| f.created_at);
        let total = edges.len() as i64;

        let entries = slice(edges, page)
            .into_iter()
            .filter_map(|follow| {
                let other = match direction {
                    Direction::Following => follow.followed_user,
                    Direction::Followers => follow.following_user,
                };
                tables
                    .users
                    .iter()
                    .find(|u| u.id == other)
                    .map(|u| FollowEntry {
                        user: u.public(),
                        follow,
                    })
            })
            .collect();

        Ok((entries, total))
    }

    async fn following_ids(&self, user: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .lock()?
            .follows
            .iter()
            .filter(|f| f.following_user == user)
            .map(|f| f.followed_user)
            .collect())
    }

    async fn follower_ids(&self, user: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .lock()?
            .follows
            .iter()
            .filter(|f| f.followed_user == user)
            .map(|f| f.following_user)
            .collect())
    }

    async fn count(&self, user: Uuid, direction: Direction) -> Result<i64> {
        let tables = self.lock()?;
        Ok(tables
            .follows
            .iter()
            .filter(|f| match direction {
                Direction::Following => f.following_user == user,
                Direction::Followers => f.followed_user == user,
            })
            .count() as i64)
    }
}

#[async_trait]
impl PublicationRepository for MemoryStore {
    async fn insert(&self, author: Uuid, text: &str) -> Result<Publication> {
        let mut tables = self.lock()?;
        if !tables.users.iter().any(|u| u.id == author) {
            return Err(AppError::NotFound("Author does not exist".to_string()));
        }

        let publication = Publication {
            id: Uuid::new_v4(),
            user_id: author,
            text: text.to_string(),
            file: None,
            created_at: Utc::now(),
        };
        tables.publications.push(publication.clone());
        Ok(publication)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Publication>> {
        Ok(self
            .lock()?
            .publications
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_with_author(&self, id: Uuid) -> Result<Option<PublicationView<AuthorName>>> {
        let tables = self.lock()?;
        let Some(publication) = tables.publications.iter().find(|p| p.id == id) else {
            return Ok(None);
        };
        Ok(tables
            .users
            .iter()
            .find(|u| u.id == publication.user_id)
            .map(|author| PublicationView {
                publication: publication.clone(),
                user: author.author_name(),
            }))
    }

    async fn delete_owned(&self, author: Uuid, id: Uuid) -> Result<Option<Publication>> {
        let mut tables = self.lock()?;
        let position = tables
            .publications
            .iter()
            .position(|p| p.id == id && p.user_id == author);
        Ok(position.map(|index| tables.publications.remove(index)))
    }

    async fn list_by_authors(
        &self,
        authors: &[Uuid],
        page: PageRequest,
    ) -> Result<(Vec<PublicationView<PublicUser>>, i64)> {
        let tables = self.lock()?;
        let matching = tables
            .publications
            .iter()
            .filter(|p| authors.contains(&p.user_id))
            .cloned();
        let matching = newest_first(matching, |p| p.created_at);
        let total = matching.len() as i64;

        let items = slice(matching, page)
            .into_iter()
            .filter_map(|publication| {
                tables
                    .users
                    .iter()
                    .find(|u| u.id == publication.user_id)
                    .map(|u| PublicationView {
                        user: u.public(),
                        publication,
                    })
            })
            .collect();

        Ok((items, total))
    }

    async fn set_file(&self, id: Uuid, file: &str) -> Result<Option<Publication>> {
        let mut tables = self.lock()?;
        Ok(tables.publications.iter_mut().find(|p| p.id == id).map(|p| {
            p.file = Some(file.to_string());
            p.clone()
        }))
    }

    async fn count_by_author(&self, author: Uuid) -> Result<i64> {
        Ok(self
            .lock()?
            .publications
            .iter()
            .filter(|p| p.user_id == author)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(nick: &str) -> NewUser {
        NewUser {
            name: nick.to_string(),
            last_name: "Tester".to_string(),
            nick: nick.to_string(),
            email: format!("{}@x.com", nick),
            bio: None,
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn emails_and_nicks_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        store.create(new_user("alice")).await.unwrap();

        let mut shouting = new_user("ALICE");
        shouting.email = "other@x.com".to_string();
        let err = UserRepository::create(&store, shouting).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let mut same_email = new_user("alice2");
        same_email.email = "Alice@X.com".to_string();
        let err = UserRepository::create(&store, same_email).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn publications_page_newest_first() {
        let store = MemoryStore::new();
        let author = UserRepository::create(&store, new_user("bob")).await.unwrap();
        for text in ["one", "two", "three"] {
            PublicationRepository::insert(&store, author.id, text).await.unwrap();
        }

        let (page, total) = store
            .list_by_authors(&[author.id], PageRequest { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(total, 3);
        let texts: Vec<_> = page.iter().map(|p| p.publication.text.as_str()).collect();
        assert_eq!(texts, ["three", "two"]);

        let (page, _) = store
            .list_by_authors(&[author.id], PageRequest { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].publication.text, "one");
    }

    #[tokio::test]
    async fn update_rejects_taken_nick() {
        let store = MemoryStore::new();
        UserRepository::create(&store, new_user("carol")).await.unwrap();
        let dave = UserRepository::create(&store, new_user("dave")).await.unwrap();

        let err = store
            .update(
                dave.id,
                UserChanges {
                    nick: Some("Carol".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let kept = store
            .update(
                dave.id,
                UserChanges {
                    nick: Some("dave".to_string()),
                    bio: Some("hello".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.bio.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn empty_bio_clears_it() {
        let store = MemoryStore::new();
        let erin = UserRepository::create(&store, new_user("erin")).await.unwrap();
        let bio = |text: &str| UserChanges {
            bio: Some(text.to_string()),
            ..Default::default()
        };

        let set = store.update(erin.id, bio("hi")).await.unwrap().unwrap();
        assert_eq!(set.bio.as_deref(), Some("hi"));

        let cleared = store.update(erin.id, bio("")).await.unwrap().unwrap();
        assert_eq!(cleared.bio, None);
    }
}
