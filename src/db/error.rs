use thiserror::Error;

/// Failure of a data-access operation.
///
/// Reads and writes both report failures through this type, so callers can
/// tell "no rows" (an empty `Ok`) apart from "the store could not answer".
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection could be acquired from the pool.
    #[error("database unavailable: {0}")]
    Unavailable(#[from] r2d2::Error),

    /// The statement was rejected or failed while executing.
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A schema migration could not be applied.
    #[error("migration {version} ({name}) failed: {source}")]
    Migration {
        version: &'static str,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Seed data referenced something that does not exist.
    #[error("invalid seed data: {0}")]
    Seed(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
