//! Last Chance Asset Cache
//!
//! Offline availability for the app shell, service-worker style: a fixed
//! manifest of assets is pre-fetched into a named cache generation on
//! install, stale generations are deleted wholesale on activate, and fetches
//! are served cache-first with a network fallback.

mod error;
mod manager;
mod manifest;

pub use error::CacheError;
pub use manager::CacheManager;
pub use manifest::AssetManifest;

pub type Result<T> = std::result::Result<T, CacheError>;
