//! Vitality manager
//!
//! Owns the phase, the progress record and their persistence. Progress
//! auto-saves on every accepted sentence; failure wipes the three progress
//! keys in one transaction and leaves the theme preference alone.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use lastchance_storage::Database;

use crate::error::VitalityError;
use crate::phase::Phase;
use crate::policy::{Vitality, VitalityPolicy};
use crate::progress::{is_complete_sentence, Progress};
use crate::Result;

pub const KEY_HISTORY: &str = "history";
pub const KEY_STREAK: &str = "streak";
pub const KEY_LAST_WRITE: &str = "last_write";

const PROGRESS_KEYS: &[&str] = &[KEY_HISTORY, KEY_STREAK, KEY_LAST_WRITE];

/// Why a session (or the whole streak) died
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The 60-second countdown reached zero
    TimerExpired,
    /// More than the death threshold passed without a new sentence
    Absence,
}

impl FailureReason {
    /// User-facing epitaph
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::TimerExpired => "Time's up.",
            FailureReason::Absence => "The text died of loneliness.",
        }
    }
}

/// Outcome of a periodic vitality check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalityCheck {
    /// Nothing to report
    Healthy,
    /// The death threshold was crossed; progress has been erased
    Died(FailureReason),
    /// The cooldown elapsed while the success view was showing
    CooldownOver,
}

pub struct VitalityManager {
    phase: Arc<RwLock<Phase>>,
    progress: Arc<RwLock<Progress>>,
    last_failure: Arc<RwLock<Option<FailureReason>>>,
    policy: VitalityPolicy,
    db: Database,
}

impl VitalityManager {
    pub fn new(db: Database, policy: VitalityPolicy) -> Self {
        Self {
            phase: Arc::new(RwLock::new(Phase::NewUser)),
            progress: Arc::new(RwLock::new(Progress::new())),
            last_failure: Arc::new(RwLock::new(None)),
            policy,
            db,
        }
    }

    /// Hydrate progress from the settings keys and derive the starting phase.
    ///
    /// Absent or malformed values default to empty/zero. A store that
    /// violates the all-or-nothing invariant is treated as empty.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Progress> {
        let history = self.db.get_setting(KEY_HISTORY)?.unwrap_or_default();
        let streak = self
            .db
            .get_setting(KEY_STREAK)?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let last_write_at = self.db.get_setting(KEY_LAST_WRITE)?.and_then(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        let mut progress = Progress {
            history,
            streak,
            last_write_at,
        };

        if !progress.is_consistent() {
            tracing::warn!(
                streak = progress.streak,
                has_history = !progress.history.is_empty(),
                "Stored progress is inconsistent, starting over"
            );
            progress.clear();
            self.db.clear_settings(PROGRESS_KEYS)?;
        }

        let phase = match self.policy.evaluate(progress.last_write_at, now) {
            Vitality::CoolingDown { .. } => Phase::Success,
            _ => Phase::NewUser,
        };

        *self.progress.write() = progress.clone();
        *self.phase.write() = phase;

        tracing::info!(
            streak = progress.streak,
            phase = %phase,
            "Loaded progress"
        );

        Ok(progress)
    }

    /// Begin a writing session. Rejected while the cooldown is running.
    pub fn begin_session(&self, now: DateTime<Utc>) -> Result<()> {
        if let Vitality::CoolingDown { .. } =
            self.policy.evaluate(self.progress.read().last_write_at, now)
        {
            return Err(VitalityError::CooldownActive);
        }

        self.transition(Phase::Writing)?;
        tracing::info!("Writing session started");
        Ok(())
    }

    /// Commit a completed sentence, persisting all three progress keys.
    pub fn commit_sentence(&self, text: &str, now: DateTime<Utc>) -> Result<Progress> {
        if *self.phase.read() != Phase::Writing {
            return Err(VitalityError::NotWriting);
        }

        let sentence = text.trim();
        if !is_complete_sentence(sentence) {
            return Err(VitalityError::IncompleteSentence);
        }

        let progress = {
            let mut progress = self.progress.write();
            progress.append(sentence, now);
            progress.clone()
        };

        // One transaction, same as the wipe on failure
        let streak = progress.streak.to_string();
        let last_write = now.to_rfc3339();
        self.db.set_settings(&[
            (KEY_HISTORY, progress.history.as_str()),
            (KEY_STREAK, streak.as_str()),
            (KEY_LAST_WRITE, last_write.as_str()),
        ])?;

        self.transition(Phase::Success)?;

        tracing::info!(streak = progress.streak, "Sentence committed");

        Ok(progress)
    }

    /// Re-evaluate liveness. Run at startup and on a periodic tick.
    pub fn check_vitality(&self, now: DateTime<Utc>) -> Result<VitalityCheck> {
        let last_write = self.progress.read().last_write_at;

        match self.policy.evaluate(last_write, now) {
            Vitality::Expired => {
                self.fail_session(FailureReason::Absence)?;
                Ok(VitalityCheck::Died(FailureReason::Absence))
            }
            Vitality::Ready if *self.phase.read() == Phase::Success => {
                // The day passed while the success view was open; the caller
                // re-routes so the "continue" button appears
                Ok(VitalityCheck::CooldownOver)
            }
            _ => Ok(VitalityCheck::Healthy),
        }
    }

    /// Erase all progress and enter the failed phase. Theme is untouched.
    pub fn fail_session(&self, reason: FailureReason) -> Result<()> {
        self.db.clear_settings(PROGRESS_KEYS)?;
        self.progress.write().clear();
        *self.last_failure.write() = Some(reason);
        *self.phase.write() = Phase::Failed;

        tracing::warn!(reason = reason.message(), "Session failed, progress erased");

        Ok(())
    }

    /// Failed -> NewUser, once the user has read the epitaph
    pub fn acknowledge_failure(&self) -> Result<()> {
        self.transition(Phase::NewUser)?;
        *self.last_failure.write() = None;
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    pub fn progress(&self) -> Progress {
        self.progress.read().clone()
    }

    pub fn last_failure(&self) -> Option<FailureReason> {
        *self.last_failure.read()
    }

    pub fn policy(&self) -> &VitalityPolicy {
        &self.policy
    }

    pub fn vitality(&self, now: DateTime<Utc>) -> Vitality {
        self.policy.evaluate(self.progress.read().last_write_at, now)
    }

    fn transition(&self, target: Phase) -> Result<()> {
        let mut phase = self.phase.write();
        if !phase.can_transition_to(target) {
            return Err(VitalityError::InvalidTransition {
                from: *phase,
                to: target,
            });
        }
        *phase = target;
        Ok(())
    }
}

impl Clone for VitalityManager {
    fn clone(&self) -> Self {
        Self {
            phase: Arc::clone(&self.phase),
            progress: Arc::clone(&self.progress),
            last_failure: Arc::clone(&self.last_failure),
            policy: self.policy,
            db: self.db.clone(),
        }
    }
}
