// storage/src/lib.rs

//! Persistent Storage Layer
//!
//! This crate provides persistent storage using RocksDB:
//! - Pool records keyed by id, written in atomic batches
//! - Node metadata (pool id counter, block height, bank snapshot, params)
//! - Pool incentive records
//! - An LRU cache of decoded pools

pub mod cache;
pub mod db;

pub use cache::PoolCache;
pub use db::{ColumnFamily, Database, DatabaseConfig, DatabaseStats};

use gamm::GammError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),
}

impl From<StorageError> for GammError {
    fn from(err: StorageError) -> Self {
        GammError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamm::ErrorKind;

    #[test]
    fn test_storage_errors_are_internal() {
        let err: GammError = StorageError::Corruption("bad key".into()).into();
        assert_eq!(err, GammError::Storage("Corruption detected: bad key".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
