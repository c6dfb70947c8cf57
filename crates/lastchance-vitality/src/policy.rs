//! Vitality policy
//!
//! The three thresholds that drive the whole toy: the cooldown between
//! sessions, the death threshold, and the per-session writing limit.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy)]
pub struct VitalityPolicy {
    /// Mandatory wait between accepted sessions
    pub cooldown: Duration,
    /// Absence longer than this kills the text
    pub death_threshold: Duration,
    /// How long a writing session may run
    pub session_limit: std::time::Duration,
}

impl VitalityPolicy {
    /// Shortened death threshold for testing the death rule by hand
    pub fn dev() -> Self {
        Self {
            death_threshold: Duration::seconds(60),
            ..Self::default()
        }
    }

    /// Judge liveness from the elapsed time since the last accepted write.
    pub fn evaluate(&self, last_write: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Vitality {
        let Some(last_write) = last_write else {
            return Vitality::Fresh;
        };

        let elapsed = now - last_write;
        if elapsed > self.death_threshold {
            Vitality::Expired
        } else if elapsed < self.cooldown {
            Vitality::CoolingDown {
                remaining: self.cooldown - elapsed,
            }
        } else {
            Vitality::Ready
        }
    }
}

impl Default for VitalityPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(24),
            death_threshold: Duration::hours(48),
            session_limit: std::time::Duration::from_secs(60),
        }
    }
}

/// Liveness verdict for the current streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vitality {
    /// No progress yet, nothing can die
    Fresh,
    /// Inside the cooldown window after an accepted sentence
    CoolingDown { remaining: Duration },
    /// Cooldown elapsed, a new session may begin
    Ready,
    /// Too long since the last write; the text is dead
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_progress_is_fresh() {
        let policy = VitalityPolicy::default();
        assert_eq!(policy.evaluate(None, Utc::now()), Vitality::Fresh);
    }

    #[test]
    fn test_thresholds() {
        let policy = VitalityPolicy::default();
        let wrote = Utc::now();

        // An hour later: still cooling down
        match policy.evaluate(Some(wrote), wrote + Duration::hours(1)) {
            Vitality::CoolingDown { remaining } => assert_eq!(remaining, Duration::hours(23)),
            other => panic!("expected CoolingDown, got {:?}", other),
        }

        // Between 24h and 48h: ready for the next sentence
        assert_eq!(
            policy.evaluate(Some(wrote), wrote + Duration::hours(30)),
            Vitality::Ready
        );

        // Exactly 48h is still alive; a moment past it is not
        assert_eq!(
            policy.evaluate(Some(wrote), wrote + Duration::hours(48)),
            Vitality::Ready
        );
        assert_eq!(
            policy.evaluate(Some(wrote), wrote + Duration::hours(48) + Duration::seconds(1)),
            Vitality::Expired
        );
    }

    #[test]
    fn test_dev_policy_dies_after_a_minute() {
        let policy = VitalityPolicy::dev();
        let wrote = Utc::now();

        assert_eq!(
            policy.evaluate(Some(wrote), wrote + Duration::seconds(61)),
            Vitality::Expired
        );
        // Cooldown keeps its real-world length in dev mode
        assert!(matches!(
            policy.evaluate(Some(wrote), wrote + Duration::seconds(30)),
            Vitality::CoolingDown { .. }
        ));
    }
}
