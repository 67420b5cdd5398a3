use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    db::conflict_on_unique,
    error::{AppError, Result},
    models::{
        page::PageRequest,
        user::{NewUser, PublicUser, User, UserChanges},
    },
};

const DUPLICATE_USER: &str = "A user with that email or nick already exists";

/// Storage for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. A taken email or nick is a `Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Users whose email equals `email` or whose nick equals `nick`,
    /// case-insensitively. `None` values match nothing.
    async fn find_by_email_or_nick(
        &self,
        email: Option<&str>,
        nick: Option<&str>,
    ) -> Result<Vec<User>>;

    /// One page of users, oldest account first, and the total count.
    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64)>;

    /// Applies `changes`, returning the updated row or `None` if absent.
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>>;

    async fn set_image(&self, id: Uuid, image: &str) -> Result<Option<User>>;
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
pub(crate) fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        last_name: row.try_get("last_name").map_err(|_| AppError::MissingData("last_name".to_string()))?,
        nick: row.try_get("nick").map_err(|_| AppError::MissingData("nick".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        bio: row.try_get("bio").map_err(|_| AppError::MissingData("bio".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        role: row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?,
        image: row.try_get("image").map_err(|_| AppError::MissingData("image".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Maps the public columns of a joined user, each named `{prefix}{column}`.
pub(crate) fn row_to_public_user(row: &Row, prefix: &str) -> Result<PublicUser> {
    let column = |name: &str| format!("{}{}", prefix, name);
    let missing = |name: &str| AppError::MissingData(format!("{}{}", prefix, name));

    Ok(PublicUser {
        id: row.try_get(column("id").as_str()).map_err(|_| missing("id"))?,
        name: row.try_get(column("name").as_str()).map_err(|_| missing("name"))?,
        last_name: row.try_get(column("last_name").as_str()).map_err(|_| missing("last_name"))?,
        nick: row.try_get(column("nick").as_str()).map_err(|_| missing("nick"))?,
        bio: row.try_get(column("bio").as_str()).map_err(|_| missing("bio"))?,
        image: row.try_get(column("image").as_str()).map_err(|_| missing("image"))?,
        created_at: row.try_get(column("created_at").as_str()).map_err(|_| missing("created_at"))?,
    })
}

/// PostgreSQL-backed `UserRepository`.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO users (id, name, last_name, nick, email, bio, password)
                VALUES ($1, $2, $3, lower($4), lower($5), $6, $7)
                RETURNING *
                "#,
            )
            .await?;

        let row = client
            .query_one(
                &statement,
                &[
                    &Uuid::new_v4(),
                    &new_user.name,
                    &new_user.last_name,
                    &new_user.nick,
                    &new_user.email,
                    &new_user.bio,
                    &new_user.password_hash,
                ],
            )
            .await
            .map_err(|e| conflict_on_unique(e, DUPLICATE_USER))?;

        row_to_user(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("SELECT * FROM users WHERE id = $1")
            .await?;
        let row = client.query_opt(&statement, &[&id]).await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("SELECT * FROM users WHERE lower(email) = lower($1)")
            .await?;
        let row = client.query_opt(&statement, &[&email]).await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_email_or_nick(
        &self,
        email: Option<&str>,
        nick: Option<&str>,
    ) -> Result<Vec<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT *
                FROM users
                WHERE lower(email) = lower($1) OR lower(nick) = lower($2)
                "#,
            )
            .await?;
        let rows = client.query(&statement, &[&email, &nick]).await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64)> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT *
                FROM users
                ORDER BY created_at ASC, id ASC
                LIMIT $1 OFFSET $2
                "#,
            )
            .await?;
        let rows = client
            .query(&statement, &[&page.limit, &page.offset()])
            .await?;

        let count = client
            .prepare_cached("SELECT COUNT(*) FROM users")
            .await?;
        let total: i64 = client.query_one(&count, &[]).await?.try_get(0)?;

        let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
        Ok((users, total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                UPDATE users
                SET
                    name = COALESCE($2, name),
                    last_name = COALESCE($3, last_name),
                    nick = COALESCE(lower($4), nick),
                    email = COALESCE(lower($5), email),
                    bio = CASE WHEN $6::text IS NULL THEN bio ELSE NULLIF($6, '') END,
                    password = COALESCE($7, password)
                WHERE id = $1
                RETURNING *
                "#,
            )
            .await?;

        let row = client
            .query_opt(
                &statement,
                &[
                    &id,
                    &changes.name,
                    &changes.last_name,
                    &changes.nick,
                    &changes.email,
                    &changes.bio,
                    &changes.password_hash,
                ],
            )
            .await
            .map_err(|e| conflict_on_unique(e, DUPLICATE_USER))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn set_image(&self, id: Uuid, image: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("UPDATE users SET image = $2 WHERE id = $1 RETURNING *")
            .await?;
        let row = client.query_opt(&statement, &[&id, &image]).await?;
        row.map(|r| row_to_user(&r)).transpose()
    }
}
