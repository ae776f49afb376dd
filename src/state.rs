use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::{jwt::TokenIssuer, postgres::PgDirectory, service::CredentialService};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub service: Arc<CredentialService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> Self {
        let directory = Arc::new(PgDirectory::new(db.clone()));
        let tokens = TokenIssuer::new(&config.jwt);
        let service = Arc::new(CredentialService::new(directory, tokens));
        Self {
            db,
            config,
            service,
        }
    }
}
