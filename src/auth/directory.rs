use async_trait::async_trait;
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Stored account row. The hash never leaves the auth module; everything
/// returned to callers goes through [`crate::auth::dto::PublicUser`].
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

/// Fields for a row that does not exist yet. The store assigns `id`,
/// `created_at` and the active flag (new accounts start active).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub roles: Vec<String>,
}

/// Partial update at the storage boundary. `None` means "leave unchanged";
/// there is no way to clear a field through a patch. The password arrives
/// here already hashed.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub roles: Option<Vec<String>>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    /// Merge this patch onto an existing row, leaving absent fields alone.
    pub fn apply(&self, mut record: UserRecord) -> UserRecord {
        if let Some(email) = &self.email {
            record.email = email.clone();
        }
        if let Some(full_name) = &self.full_name {
            record.full_name = full_name.clone();
        }
        if let Some(roles) = &self.roles {
            record.roles = roles.clone();
        }
        if let Some(hash) = &self.password_hash {
            record.password_hash = hash.clone();
        }
        record
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Unique constraint violated; carries the store's detail message.
    #[error("{0}")]
    Duplicate(String),

    #[error("user store failure")]
    Store(#[from] anyhow::Error),
}

/// Persistence contract for account rows.
///
/// Uniqueness of `email` is the store's job: `create` and `save` run a single
/// statement and report a constraint violation as [`DirectoryError::Duplicate`]
/// rather than pre-checking, so concurrent writers race safely.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DirectoryError>;

    /// Lookup for authentication: returns the full row including the stored
    /// password hash and active flag.
    async fn find_by_email_with_secrets(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, DirectoryError>;

    /// A page of rows in creation order (`created_at`, then `id`).
    async fn find_page(&self, limit: i64, offset: i64) -> Result<Vec<UserRecord>, DirectoryError>;

    /// Legacy combined lookup: rows whose email equals `term` or whose role
    /// list contains it. The caller lowercases the term first.
    async fn find_by_email_or_role(&self, term: &str)
        -> Result<Vec<UserRecord>, DirectoryError>;

    /// Merge `patch` onto the stored row without saving. `None` when the id
    /// is unknown.
    async fn merge_partial(
        &self,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<Option<UserRecord>, DirectoryError>;

    async fn save(&self, user: UserRecord) -> Result<UserRecord, DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: "old@x.com".into(),
            password_hash: "$old-hash".into(),
            full_name: "Old Name".into(),
            roles: vec!["user".into()],
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let before = record();
        let after = UserPatch::default().apply(before.clone());
        assert_eq!(after.email, before.email);
        assert_eq!(after.full_name, before.full_name);
        assert_eq!(after.roles, before.roles);
        assert_eq!(after.password_hash, before.password_hash);
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let after = UserPatch {
            full_name: Some("New Name".into()),
            ..Default::default()
        }
        .apply(record());
        assert_eq!(after.full_name, "New Name");
        assert_eq!(after.email, "old@x.com");
        assert_eq!(after.password_hash, "$old-hash");
    }
}
