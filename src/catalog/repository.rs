use crate::model::{CurrencyRecord, NewCurrency};
use thiserror::Error;

/// Errors surfaced by a catalog backend.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] turso::Error),

    #[error("no currency with id {0}")]
    NotFound(i64),

    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Short text for the status bar and toasts.
    pub fn user_message(&self) -> String {
        match self {
            RepositoryError::Database(e) => format!("Database error: {}", e),
            RepositoryError::NotFound(id) => format!("Record {} no longer exists", id),
            RepositoryError::Unavailable(msg) => format!("Catalog unavailable: {}", msg),
        }
    }
}

/// Storage behind the catalog.
///
/// Records come back ordered by rank (unranked last), then by id.
pub trait CatalogRepository {
    async fn fetch_all(&self) -> Result<Vec<CurrencyRecord>, RepositoryError>;

    async fn update_rank(&self, id: i64, rank: i64) -> Result<(), RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    async fn insert(&self, entry: &NewCurrency) -> Result<i64, RepositoryError>;
}
