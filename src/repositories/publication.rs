use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::{
        page::PageRequest,
        publication::{Publication, PublicationView},
        user::{AuthorName, PublicUser},
    },
    repositories::user::row_to_public_user,
};

/// Storage for publications.
#[async_trait]
pub trait PublicationRepository: Send + Sync {
    async fn insert(&self, author: Uuid, text: &str) -> Result<Publication>;

    async fn find(&self, id: Uuid) -> Result<Option<Publication>>;

    /// The publication with its author's name.
    async fn find_with_author(&self, id: Uuid) -> Result<Option<PublicationView<AuthorName>>>;

    /// Deletes `id` only if `author` wrote it.
    async fn delete_owned(&self, author: Uuid, id: Uuid) -> Result<Option<Publication>>;

    /// One page of publications written by any of `authors`, newest first,
    /// and the total across pages.
    async fn list_by_authors(
        &self,
        authors: &[Uuid],
        page: PageRequest,
    ) -> Result<(Vec<PublicationView<PublicUser>>, i64)>;

    async fn set_file(&self, id: Uuid, file: &str) -> Result<Option<Publication>>;

    async fn count_by_author(&self, author: Uuid) -> Result<i64>;
}

fn row_to_publication(row: &Row) -> Result<Publication> {
    Ok(Publication {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        text: row.try_get("text").map_err(|_| AppError::MissingData("text".to_string()))?,
        file: row.try_get("file").map_err(|_| AppError::MissingData("file".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// PostgreSQL-backed `PublicationRepository`.
#[derive(Clone)]
pub struct PgPublicationRepository {
    pool: Pool,
}

impl PgPublicationRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PublicationRepository for PgPublicationRepository {
    async fn insert(&self, author: Uuid, text: &str) -> Result<Publication> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO publications (id, user_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, text, file, created_at
                "#,
            )
            .await?;
        let row = client
            .query_one(&statement, &[&Uuid::new_v4(), &author, &text])
            .await?;
        row_to_publication(&row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Publication>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                "SELECT id, user_id, text, file, created_at FROM publications WHERE id = $1",
            )
            .await?;
        let row = client.query_opt(&statement, &[&id]).await?;
        row.map(|r| row_to_publication(&r)).transpose()
    }

    async fn find_with_author(&self, id: Uuid) -> Result<Option<PublicationView<AuthorName>>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT p.id, p.user_id, p.text, p.file, p.created_at,
                       u.name AS u_name, u.last_name AS u_last_name
                FROM publications p
                JOIN users u ON u.id = p.user_id
                WHERE p.id = $1
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&id]).await?;

        row.map(|row| -> Result<PublicationView<AuthorName>> {
            let publication = row_to_publication(&row)?;
            let user = AuthorName {
                id: publication.user_id,
                name: row.try_get("u_name").map_err(|_| AppError::MissingData("u_name".to_string()))?,
                last_name: row.try_get("u_last_name").map_err(|_| AppError::MissingData("u_last_name".to_string()))?,
            };
            Ok(PublicationView { publication, user })
        })
        .transpose()
    }

    async fn delete_owned(&self, author: Uuid, id: Uuid) -> Result<Option<Publication>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                DELETE FROM publications
                WHERE id = $1 AND user_id = $2
                RETURNING id, user_id, text, file, created_at
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&id, &author]).await?;
        row.map(|r| row_to_publication(&r)).transpose()
    }

    async fn list_by_authors(
        &self,
        authors: &[Uuid],
        page: PageRequest,
    ) -> Result<(Vec<PublicationView<PublicUser>>, i64)> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT p.id, p.user_id, p.text, p.file, p.created_at,
                       u.id AS u_id, u.name AS u_name, u.last_name AS u_last_name,
                       u.nick AS u_nick, u.bio AS u_bio, u.image AS u_image,
                       u.created_at AS u_created_at
                FROM publications p
                JOIN users u ON u.id = p.user_id
                WHERE p.user_id = ANY($1)
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .await?;
        let rows = client
            .query(&statement, &[&authors, &page.limit, &page.offset()])
            .await?;

        let count = client
            .prepare_cached("SELECT COUNT(*) FROM publications WHERE user_id = ANY($1)")
            .await?;
        let total: i64 = client.query_one(&count, &[&authors]).await?.try_get(0)?;

        let publications = rows
            .iter()
            .map(|row| -> Result<PublicationView<PublicUser>> {
                Ok(PublicationView {
                    publication: row_to_publication(row)?,
                    user: row_to_public_user(row, "u_")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((publications, total))
    }

    async fn set_file(&self, id: Uuid, file: &str) -> Result<Option<Publication>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                UPDATE publications SET file = $2
                WHERE id = $1
                RETURNING id, user_id, text, file, created_at
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&id, &file]).await?;
        row.map(|r| row_to_publication(&r)).transpose()
    }

    async fn count_by_author(&self, author: Uuid) -> Result<i64> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("SELECT COUNT(*) FROM publications WHERE user_id = $1")
            .await?;
        Ok(client.query_one(&statement, &[&author]).await?.try_get(0)?)
    }
}
