//! Last Chance Core
//!
//! Central coordination layer for the daily-sentence engine. The engine owns
//! all state, timers and persistence; a frontend is a stateless renderer
//! driven by `View` routing and `EditorEvent`s.

mod config;
mod editor;
mod error;
mod runtime;
mod theme;

pub use config::Config;
pub use editor::{format_remaining, Editor, EditorEvent, View, WritingContext};
pub use error::CoreError;
pub use runtime::{TimerKind, TimerRuntime};
pub use theme::Theme;

// Re-export core components
pub use lastchance_cache::{AssetManifest, CacheError, CacheManager};
pub use lastchance_storage::{Database, StorageError};
pub use lastchance_vitality::{
    FailureReason, Phase, Progress, Vitality, VitalityCheck, VitalityError, VitalityManager,
    VitalityPolicy,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
