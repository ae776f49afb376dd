use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::directory::{DirectoryError, NewUser, UserDirectory, UserPatch, UserRecord};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, roles, is_active, created_at";

/// `UserDirectory` backed by Postgres. Email uniqueness is enforced by the
/// unique index on `users.email`; violations surface as SQLSTATE 23505 and
/// are classified into `DirectoryError::Duplicate` here.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify(e: sqlx::Error) -> DirectoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return DirectoryError::Duplicate(db.message().to_owned());
        }
    }
    DirectoryError::Store(e.into())
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (email, password_hash, full_name, roles)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.roles)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DirectoryError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_by_email_with_secrets(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_page(&self, limit: i64, offset: i64) -> Result<Vec<UserRecord>, DirectoryError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at, id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_by_email_or_role(
        &self,
        term: &str,
    ) -> Result<Vec<UserRecord>, DirectoryError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1 OR $1 = ANY(roles)
            ORDER BY created_at, id
            "#
        ))
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn merge_partial(
        &self,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let existing = self.find_by_id(id).await?;
        Ok(existing.map(|record| patch.apply(record)))
    }

    async fn save(&self, user: UserRecord) -> Result<UserRecord, DirectoryError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, full_name = $4, roles = $5, is_active = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.roles)
        .bind(user.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }
}
