/// Errors produced by the store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Table names are interpolated into SQL, so only plain identifiers pass.
    #[error("invalid table identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid index definition: {0}")]
    InvalidIndex(String),
}
