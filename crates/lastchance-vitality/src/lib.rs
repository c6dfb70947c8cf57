//! Last Chance Vitality
//!
//! The session/vitality state machine:
//! - One sentence per day, committed only while a 60-second session runs
//! - A 24-hour cooldown between accepted sessions
//! - Death after 48 hours of absence, erasing all progress
//!
//! All time-dependent operations take `now` as a parameter so the rules can
//! be exercised without waiting for real days to pass.

mod error;
mod manager;
mod phase;
mod policy;
mod progress;

pub use error::VitalityError;
pub use manager::{FailureReason, VitalityCheck, VitalityManager};
pub use phase::Phase;
pub use policy::{Vitality, VitalityPolicy};
pub use progress::{is_complete_sentence, Progress};

pub type Result<T> = std::result::Result<T, VitalityError>;
