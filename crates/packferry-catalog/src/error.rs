//! Error types for packferry-catalog

use thiserror::Error;

/// Errors from the catalog store
///
/// All of these are fatal for the invocation; probe failures never surface
/// here, they become `Unreachable` verdicts.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The store could not be reached at startup
    #[error("catalog connection failed: {0}")]
    Connection(String),

    /// A query or write against the store failed
    #[error("catalog query failed: {0}")]
    Database(#[from] mongodb::error::Error),
}
