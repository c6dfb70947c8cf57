//! Last Chance Storage Layer
//!
//! SQLite-based persistence for all engine state. Progress and preferences
//! live in a plain key-value `settings` table; the asset cache records its
//! generations in `cached_assets`.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
