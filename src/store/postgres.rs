//! PostgreSQL-backed presence checks.
//!
//! A fresh connection is opened for every inspection and dropped when the
//! inspection returns, which closes it on every path.

use async_trait::async_trait;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::debug;

use super::{RelationalStore, StoreError, TableState};
use crate::config::PostgresSettings;

const TABLE_EXISTS: &str =
    "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)";

pub struct PostgresStore {
    config: PgConfig,
}

impl PostgresStore {
    pub fn new(settings: &PostgresSettings) -> Self {
        let mut config = PgConfig::new();
        config
            .host(&settings.host)
            .port(settings.port)
            .user(&settings.user)
            .dbname(&settings.database)
            .application_name("foodsync");
        if !settings.password.is_empty() {
            config.password(&settings.password);
        }
        Self { config }
    }

    async fn connect(&self) -> Result<Client, StoreError> {
        let (client, connection) = self.config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "PostgreSQL connection closed with error");
            }
        });
        Ok(client)
    }
}

#[async_trait]
impl RelationalStore for PostgresStore {
    async fn inspect_table(&self, table: &str) -> Result<TableState, StoreError> {
        let ident = quote_identifier(table)?;
        let client = self.connect().await?;

        let exists: bool = client.query_one(TABLE_EXISTS, &[&table]).await?.get(0);
        if !exists {
            return Ok(TableState::Missing);
        }

        let has_rows: bool = client
            .query_one(
                &format!("SELECT EXISTS (SELECT 1 FROM {ident} LIMIT 1)"),
                &[],
            )
            .await?
            .get(0);

        Ok(if has_rows {
            TableState::Populated
        } else {
            TableState::Empty
        })
    }
}

/// Quotes a plain `[a-z0-9_]` table name for interpolation into SQL.
fn quote_identifier(table: &str) -> Result<String, StoreError> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(StoreError::InvalidIdentifier(table.to_string()));
    }
    Ok(format!("\"{table}\""))
}
