//! In-memory `UserDirectory` used by the service tests. Keeps rows in
//! insertion order so page output matches the Postgres creation-order query.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::directory::{DirectoryError, NewUser, UserDirectory, UserPatch, UserRecord};

#[derive(Default)]
pub struct MemoryDirectory {
    rows: Mutex<Vec<UserRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn duplicate_detail(email: &str) -> DirectoryError {
        DirectoryError::Duplicate(format!("Key (email)=({email}) already exists."))
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.email == user.email) {
            return Err(Self::duplicate_detail(&user.email));
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            roles: user.roles,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DirectoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_email_with_secrets(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.email == email).cloned())
    }

    async fn find_page(&self, limit: i64, offset: i64) -> Result<Vec<UserRecord>, DirectoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find_by_email_or_role(
        &self,
        term: &str,
    ) -> Result<Vec<UserRecord>, DirectoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.email == term || r.roles.iter().any(|role| role == term))
            .cloned()
            .collect())
    }

    async fn merge_partial(
        &self,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.id == id).cloned().map(|r| patch.apply(r)))
    }

    async fn save(&self, user: UserRecord) -> Result<UserRecord, DirectoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.id != user.id && r.email == user.email) {
            return Err(Self::duplicate_detail(&user.email));
        }
        match rows.iter_mut().find(|r| r.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(DirectoryError::Store(anyhow::anyhow!(
                "no row with id {} to save",
                user.id
            ))),
        }
    }
}
