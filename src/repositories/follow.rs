use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    db::{conflict_on_unique, not_found_on_foreign_key},
    error::{AppError, Result},
    models::{
        follow::{Follow, FollowEntry},
        page::PageRequest,
    },
    repositories::user::row_to_public_user,
};

pub(crate) const ALREADY_FOLLOWING: &str = "You already follow this user";
pub(crate) const TARGET_MISSING: &str = "The user you are trying to follow does not exist";

/// Which side of the edge a listing is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges where the user is `following_user`; the entry shows `followed_user`.
    Following,
    /// Edges where the user is `followed_user`; the entry shows `following_user`.
    Followers,
}

/// Storage for follow edges.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Inserts `follower -> followed`.
    ///
    /// An existing edge is a `Conflict`, also when it was created by a
    /// concurrent request between any pre-check and this insert.
    async fn insert(&self, follower: Uuid, followed: Uuid) -> Result<Follow>;

    /// Deletes `follower -> followed`, returning it if it existed.
    async fn delete(&self, follower: Uuid, followed: Uuid) -> Result<Option<Follow>>;

    async fn find(&self, follower: Uuid, followed: Uuid) -> Result<Option<Follow>>;

    /// One page of `user`'s edges in `direction`, newest first, and the total.
    async fn list(
        &self,
        user: Uuid,
        direction: Direction,
        page: PageRequest,
    ) -> Result<(Vec<FollowEntry>, i64)>;

    /// Ids `user` follows.
    async fn following_ids(&self, user: Uuid) -> Result<Vec<Uuid>>;

    /// Ids following `user`.
    async fn follower_ids(&self, user: Uuid) -> Result<Vec<Uuid>>;

    async fn count(&self, user: Uuid, direction: Direction) -> Result<i64>;
}

fn row_to_follow(row: &Row) -> Result<Follow> {
    Ok(Follow {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        following_user: row.try_get("following_user").map_err(|_| AppError::MissingData("following_user".to_string()))?,
        followed_user: row.try_get("followed_user").map_err(|_| AppError::MissingData("followed_user".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// PostgreSQL-backed `FollowRepository`.
#[derive(Clone)]
pub struct PgFollowRepository {
    pool: Pool,
}

impl PgFollowRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowRepository for PgFollowRepository {
    async fn insert(&self, follower: Uuid, followed: Uuid) -> Result<Follow> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO follows (id, following_user, followed_user)
                VALUES ($1, $2, $3)
                RETURNING id, following_user, followed_user, created_at
                "#,
            )
            .await?;

        let row = client
            .query_one(&statement, &[&Uuid::new_v4(), &follower, &followed])
            .await
            .map_err(|e| conflict_on_unique(e, ALREADY_FOLLOWING))
            .map_err(|e| not_found_on_foreign_key(e, TARGET_MISSING))?;

        row_to_follow(&row)
    }

    async fn delete(&self, follower: Uuid, followed: Uuid) -> Result<Option<Follow>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                DELETE FROM follows
                WHERE following_user = $1 AND followed_user = $2
                RETURNING id, following_user, followed_user, created_at
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&follower, &followed]).await?;
        row.map(|r| row_to_follow(&r)).transpose()
    }

    async fn find(&self, follower: Uuid, followed: Uuid) -> Result<Option<Follow>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, following_user, followed_user, created_at
                FROM follows
                WHERE following_user = $1 AND followed_user = $2
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&follower, &followed]).await?;
        row.map(|r| row_to_follow(&r)).transpose()
    }

    async fn list(
        &self,
        user: Uuid,
        direction: Direction,
        page: PageRequest,
    ) -> Result<(Vec<FollowEntry>, i64)> {
        let (query, count_query) = match direction {
            Direction::Following => (
                r#"
                SELECT f.id, f.following_user, f.followed_user, f.created_at,
                       u.id AS u_id, u.name AS u_name, u.last_name AS u_last_name,
                       u.nick AS u_nick, u.bio AS u_bio, u.image AS u_image,
                       u.created_at AS u_created_at
                FROM follows f
                JOIN users u ON u.id = f.followed_user
                WHERE f.following_user = $1
                ORDER BY f.created_at DESC, f.id DESC
                LIMIT $2 OFFSET $3
                "#,
                "SELECT COUNT(*) FROM follows WHERE following_user = $1",
            ),
            Direction::Followers => (
                r#"
                SELECT f.id, f.following_user, f.followed_user, f.created_at,
                       u.id AS u_id, u.name AS u_name, u.last_name AS u_last_name,
                       u.nick AS u_nick, u.bio AS u_bio, u.image AS u_image,
                       u.created_at AS u_created_at
                FROM follows f
                JOIN users u ON u.id = f.following_user
                WHERE f.followed_user = $1
                ORDER BY f.created_at DESC, f.id DESC
                LIMIT $2 OFFSET $3
                "#,
                "SELECT COUNT(*) FROM follows WHERE followed_user = $1",
            ),
        };

        let client = self.pool.get().await?;
        let statement = client.prepare_cached(query).await?;
        let rows = client
            .query(&statement, &[&user, &page.limit, &page.offset()])
            .await?;

        let count = client.prepare_cached(count_query).await?;
        let total: i64 = client.query_one(&count, &[&user]).await?.try_get(0)?;

        let entries = rows
            .iter()
            .map(|row| -> Result<FollowEntry> {
                Ok(FollowEntry {
                    follow: row_to_follow(row)?,
                    user: row_to_public_user(row, "u_")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((entries, total))
    }

    async fn following_ids(&self, user: Uuid) -> Result<Vec<Uuid>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                "SELECT followed_user FROM follows WHERE following_user = $1 ORDER BY created_at",
            )
            .await?;
        let rows = client.query(&statement, &[&user]).await?;
        rows.iter()
            .map(|row| row.try_get(0).map_err(AppError::from))
            .collect()
    }

    async fn follower_ids(&self, user: Uuid) -> Result<Vec<Uuid>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                "SELECT following_user FROM follows WHERE followed_user = $1 ORDER BY created_at",
            )
            .await?;
        let rows = client.query(&statement, &[&user]).await?;
        rows.iter()
            .map(|row| row.try_get(0).map_err(AppError::from))
            .collect()
    }

    async fn count(&self, user: Uuid, direction: Direction) -> Result<i64> {
        let query = match direction {
            Direction::Following => "SELECT COUNT(*) FROM follows WHERE following_user = $1",
            Direction::Followers => "SELECT COUNT(*) FROM follows WHERE followed_user = $1",
        };
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(query).await?;
        Ok(client.query_one(&statement, &[&user]).await?.try_get(0)?)
    }
}
