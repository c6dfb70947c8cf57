//! Main editor state container
//!
//! The single controller owning all state: progress, phase, theme, timers
//! and the asset cache. Frontends render whatever `route_view` returns and
//! react to `EditorEvent`s; they hold no state of their own.

use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use url::Url;

use lastchance_cache::{AssetManifest, CacheManager};
use lastchance_storage::Database;
use lastchance_vitality::{
    is_complete_sentence, FailureReason, Progress, Vitality, VitalityCheck, VitalityManager,
};

use crate::config::Config;
use crate::error::CoreError;
use crate::runtime::TimerRuntime;
use crate::theme::Theme;
use crate::Result;

const KEY_THEME: &str = "theme";

/// How often the periodic vitality check runs
const VITALITY_CHECK_PERIOD: StdDuration = StdDuration::from_secs(60);

/// Shown when a session fails without a recorded reason
const DEFAULT_FAIL_MESSAGE: &str = "You need a new chance.";

/// Which screen the frontend should render
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Nothing written yet; offer to start
    NewUser,
    /// Cooldown elapsed; show the text so far and offer to continue
    Returning { history: String, day: u32 },
    /// A writing session is running
    Writing,
    /// Sentence accepted; show the full text and the cooldown timer
    Success { history: String, streak: u32 },
    /// Progress erased; show the epitaph until acknowledged
    Failed { message: String },
}

/// Everything the frontend needs when a session starts
#[derive(Debug, Clone, PartialEq)]
pub struct WritingContext {
    /// Trailing words of the history, for context above the editor
    pub snippet: Option<String>,
    /// Seconds on the countdown
    pub seconds: u64,
}

/// Pushed to the frontend by the timer tasks
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    CountdownTick { remaining: u64, danger: bool },
    CooldownTick { remaining: Duration },
    CooldownElapsed,
    SessionFailed { reason: FailureReason },
}

pub struct Editor {
    config: Config,
    db: Database,
    vitality: VitalityManager,
    cache: CacheManager,
    timers: TimerRuntime,
    events: mpsc::UnboundedSender<EditorEvent>,
}

impl Editor {
    /// Open the database and wire up the managers. The returned receiver
    /// carries every timer-driven event.
    pub fn new(config: Config) -> Result<(Self, mpsc::UnboundedReceiver<EditorEvent>)> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.database_path)?;
        Self::with_database(config, db)
    }

    fn with_database(
        config: Config,
        db: Database,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EditorEvent>)> {
        let base = Url::parse(&config.shell_base_url)
            .map_err(|_| CoreError::Config(format!("Invalid shell URL: {}", config.shell_base_url)))?;
        let manifest = AssetManifest::app_shell(config.cache_generation.clone(), &base)?;
        let cache = CacheManager::new(db.clone(), config.cache_dir.clone(), manifest);
        let vitality = VitalityManager::new(db.clone(), config.policy());

        let (events, rx) = mpsc::unbounded_channel();

        let editor = Self {
            config,
            db,
            vitality,
            cache,
            timers: TimerRuntime::new(),
            events,
        };

        Ok((editor, rx))
    }

    /// Load persisted progress, run the startup vitality check and start the
    /// periodic one. A text already dead on startup is reported before the
    /// first render.
    pub fn initialize(&self) -> Result<()> {
        let now = Utc::now();
        self.vitality.load(now)?;

        if let VitalityCheck::Died(reason) = self.vitality.check_vitality(now)? {
            let _ = self.events.send(EditorEvent::SessionFailed { reason });
        }

        self.timers.start_vitality_watch(
            VITALITY_CHECK_PERIOD,
            self.vitality.clone(),
            self.events.clone(),
        );

        tracing::info!(theme = %self.theme()?, "Editor initialized");

        Ok(())
    }

    /// Decide which screen to show
    pub fn route_view(&self, now: DateTime<Utc>) -> View {
        if self.vitality.phase() == lastchance_vitality::Phase::Failed {
            let message = self
                .vitality
                .last_failure()
                .map(|r| r.message().to_string())
                .unwrap_or_else(|| DEFAULT_FAIL_MESSAGE.to_string());
            return View::Failed { message };
        }

        if self.vitality.phase() == lastchance_vitality::Phase::Writing {
            return View::Writing;
        }

        let progress = self.vitality.progress();
        if let Vitality::CoolingDown { .. } = self.vitality.vitality(now) {
            return View::Success {
                history: progress.history,
                streak: progress.streak,
            };
        }

        if !progress.is_empty() {
            return View::Returning {
                day: progress.day_number(),
                history: progress.history,
            };
        }

        View::NewUser
    }

    /// Begin a writing session and start the countdown
    pub fn start_writing(&self, now: DateTime<Utc>) -> Result<WritingContext> {
        self.timers.cancel_view_timers();
        self.vitality.begin_session(now)?;

        let policy = *self.vitality.policy();
        self.timers.start_countdown(
            StdDuration::from_secs(1),
            policy.session_limit.as_secs(),
            self.vitality.clone(),
            self.events.clone(),
        );

        Ok(WritingContext {
            snippet: self.vitality.progress().preview_snippet(),
            seconds: policy.session_limit.as_secs(),
        })
    }

    /// Feed the current editor contents. A trimmed text ending in `.`, `!`
    /// or `?` commits the sentence, stops the countdown and starts the
    /// cooldown ticker; anything else is a no-op.
    pub fn submit_input(&self, text: &str, now: DateTime<Utc>) -> Result<Option<Progress>> {
        if !is_complete_sentence(text) {
            return Ok(None);
        }

        let progress = self.vitality.commit_sentence(text, now)?;

        self.timers.cancel_view_timers();
        self.timers.start_cooldown_ticker(
            StdDuration::from_secs(1),
            self.vitality.clone(),
            self.events.clone(),
        );

        Ok(Some(progress))
    }

    /// Pasting is never writing
    pub fn submit_paste(&self) -> Result<()> {
        Err(CoreError::PasteRejected)
    }

    /// Leave the failed view and start over
    pub fn acknowledge_failure(&self) -> Result<()> {
        self.timers.cancel_view_timers();
        self.vitality.acknowledge_failure()?;
        Ok(())
    }

    /// Re-evaluate vitality now (the periodic watch does this on its own)
    pub fn check_vitality(&self, now: DateTime<Utc>) -> Result<VitalityCheck> {
        let check = self.vitality.check_vitality(now)?;
        match check {
            VitalityCheck::Died(reason) => {
                self.timers.cancel_view_timers();
                let _ = self.events.send(EditorEvent::SessionFailed { reason });
            }
            VitalityCheck::CooldownOver => {
                let _ = self.events.send(EditorEvent::CooldownElapsed);
            }
            VitalityCheck::Healthy => {}
        }
        Ok(check)
    }

    // === Theme ===

    /// Stored preference, else the configured default
    pub fn theme(&self) -> Result<Theme> {
        Ok(self
            .db
            .get_setting(KEY_THEME)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.config.default_theme))
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.db.set_setting(KEY_THEME, theme.as_str())?;
        Ok(())
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        let theme = self.theme()?.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    // === Offline cache ===

    /// Install the current cache generation and retire the old ones
    pub async fn prepare_offline(&self) -> Result<usize> {
        let installed = self.cache.install().await?;
        self.cache.activate().await?;
        Ok(installed)
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vitality_manager(&self) -> &VitalityManager {
        &self.vitality
    }
}

/// Cooldown remainder as `HH:MM:SS` for the success view
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TimerKind;
    use std::path::PathBuf;

    fn test_editor() -> (Editor, mpsc::UnboundedReceiver<EditorEvent>) {
        let config = Config::new(PathBuf::from("/tmp/lastchance-test"));
        let db = Database::open_in_memory().unwrap();
        let (editor, rx) = Editor::with_database(config, db).unwrap();
        editor.vitality.load(Utc::now()).unwrap();
        (editor, rx)
    }

    #[tokio::test]
    async fn test_new_user_flow() {
        let (editor, _rx) = test_editor();
        assert_eq!(editor.route_view(Utc::now()), View::NewUser);

        let ctx = editor.start_writing(Utc::now()).unwrap();
        assert!(ctx.snippet.is_none());
        assert_eq!(ctx.seconds, 60);
        assert_eq!(editor.route_view(Utc::now()), View::Writing);

        // Partial text commits nothing
        assert!(editor.submit_input("I tried", Utc::now()).unwrap().is_none());
        assert_eq!(editor.route_view(Utc::now()), View::Writing);

        let progress = editor.submit_input("I tried.", Utc::now()).unwrap().unwrap();
        assert_eq!(progress.history, "I tried.");
        assert_eq!(progress.streak, 1);

        match editor.route_view(Utc::now()) {
            View::Success { history, streak } => {
                assert_eq!(history, "I tried.");
                assert_eq!(streak, 1);
            }
            other => panic!("expected Success view, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_returning_view_after_cooldown() {
        let (editor, _rx) = test_editor();
        editor.start_writing(Utc::now()).unwrap();
        editor.submit_input("Day one.", Utc::now()).unwrap();

        // Still cooling down an hour later
        assert!(matches!(
            editor.route_view(Utc::now() + Duration::hours(1)),
            View::Success { .. }
        ));

        // The next day offers to continue
        match editor.route_view(Utc::now() + Duration::hours(25)) {
            View::Returning { history, day } => {
                assert_eq!(history, "Day one.");
                assert_eq!(day, 2);
            }
            other => panic!("expected Returning view, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_absence_death_routes_to_failed() {
        let (editor, mut rx) = test_editor();
        editor.start_writing(Utc::now()).unwrap();
        editor.submit_input("Here today.", Utc::now()).unwrap();

        let check = editor.check_vitality(Utc::now() + Duration::hours(49)).unwrap();
        assert!(matches!(check, VitalityCheck::Died(FailureReason::Absence)));

        match editor.route_view(Utc::now()) {
            View::Failed { message } => assert_eq!(message, "The text died of loneliness."),
            other => panic!("expected Failed view, got {:?}", other),
        }

        // The death was pushed as an event too
        loop {
            match rx.recv().await.unwrap() {
                EditorEvent::SessionFailed { reason } => {
                    assert_eq!(reason, FailureReason::Absence);
                    break;
                }
                _ => continue,
            }
        }

        editor.acknowledge_failure().unwrap();
        assert_eq!(editor.route_view(Utc::now()), View::NewUser);
    }

    #[tokio::test]
    async fn test_snippet_shown_when_resuming() {
        let (editor, _rx) = test_editor();

        // A sentence committed yesterday, so the cooldown has elapsed
        let yesterday = Utc::now() - Duration::hours(25);
        editor.start_writing(yesterday).unwrap();
        editor
            .submit_input("A very short start.", yesterday)
            .unwrap();

        let ctx = editor.start_writing(Utc::now()).unwrap();
        assert_eq!(ctx.snippet.unwrap(), "... A very short start.");
    }

    #[tokio::test]
    async fn test_vitality_watch_not_cancelled_by_writing_flow() {
        let (editor, _rx) = test_editor();
        editor.initialize().unwrap();
        assert!(editor.timers.is_running(TimerKind::VitalityWatch));

        let now = Utc::now();
        editor.start_writing(now).unwrap();
        editor.submit_input("Watched all along.", now).unwrap();

        // Starting and finishing a session swaps the view timers, but the
        // periodic check must stay up for the whole run
        assert!(editor.timers.is_running(TimerKind::VitalityWatch));
        assert!(!editor.timers.is_running(TimerKind::Countdown));
        editor.timers.cancel_all();
    }

    #[tokio::test]
    async fn test_paste_is_rejected() {
        let (editor, _rx) = test_editor();
        let err = editor.submit_paste().unwrap_err();
        assert_eq!(err.to_string(), "No pasting. Write it yourself.");
    }

    #[tokio::test]
    async fn test_theme_survives_failure() {
        let (editor, _rx) = test_editor();
        assert_eq!(editor.theme().unwrap(), Theme::Light);

        editor.set_theme(Theme::Dark).unwrap();
        editor.start_writing(Utc::now()).unwrap();
        editor.submit_input("Doomed.", Utc::now()).unwrap();
        editor.check_vitality(Utc::now() + Duration::hours(49)).unwrap();

        assert!(editor.vitality.progress().is_empty());
        assert_eq!(editor.theme().unwrap(), Theme::Dark);
        assert_eq!(editor.toggle_theme().unwrap(), Theme::Light);
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::seconds(0)), "00:00:00");
        assert_eq!(format_remaining(Duration::seconds(59)), "00:00:59");
        assert_eq!(
            format_remaining(Duration::hours(23) + Duration::minutes(5) + Duration::seconds(7)),
            "23:05:07"
        );
        // Never negative
        assert_eq!(format_remaining(Duration::seconds(-3)), "00:00:00");
    }
}
