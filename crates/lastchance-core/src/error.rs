//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] lastchance_storage::StorageError),

    #[error("Vitality error: {0}")]
    Vitality(#[from] lastchance_vitality::VitalityError),

    #[error("Cache error: {0}")]
    Cache(#[from] lastchance_cache::CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No pasting. Write it yourself.")]
    PasteRejected,
}
