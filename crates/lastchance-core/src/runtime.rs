//! Timer runtime
//!
//! The writing countdown, the cooldown display ticker and the periodic
//! vitality check run as tokio tasks, each cancellable through a watch
//! channel. Entering a new view cancels the view timers, and a timer of the
//! same kind replaces its predecessor. The vitality check outlives view
//! transitions: it keeps ticking for as long as the engine runs.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use lastchance_vitality::{FailureReason, Vitality, VitalityCheck, VitalityManager};

use crate::editor::EditorEvent;

/// Countdown ticks at or below this many seconds are flagged as danger
const DANGER_SECS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerControl {
    Run,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Countdown,
    Cooldown,
    VitalityWatch,
}

#[derive(Clone, Default)]
pub struct TimerRuntime {
    timers: Arc<RwLock<HashMap<TimerKind, watch::Sender<TimerControl>>>>,
}

impl TimerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel one timer kind, if running
    pub fn cancel(&self, kind: TimerKind) {
        if let Some(tx) = self.timers.write().remove(&kind) {
            let _ = tx.send(TimerControl::Cancel);
        }
    }

    /// Cancel the countdown and cooldown ticker. Called on every view
    /// transition; the vitality watch is deliberately left running so the
    /// death rule stays enforced while the app is open.
    pub fn cancel_view_timers(&self) {
        self.cancel(TimerKind::Countdown);
        self.cancel(TimerKind::Cooldown);
    }

    /// Cancel every running timer, the vitality watch included. Only for
    /// shutdown.
    pub fn cancel_all(&self) {
        let mut timers = self.timers.write();
        for (_, tx) in timers.drain() {
            let _ = tx.send(TimerControl::Cancel);
        }
    }

    /// Whether a timer of this kind is currently running
    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.timers
            .read()
            .get(&kind)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Start the writing countdown: one event per tick, session failure at
    /// zero regardless of any partial text in the editor.
    pub fn start_countdown(
        &self,
        tick: Duration,
        total_ticks: u64,
        manager: VitalityManager,
        events: mpsc::UnboundedSender<EditorEvent>,
    ) {
        let rx = self.register(TimerKind::Countdown);
        tokio::spawn(run_countdown(tick, total_ticks, manager, events, rx));
    }

    /// Start the cooldown display ticker, emitting the time remaining until
    /// the next session once per tick.
    pub fn start_cooldown_ticker(
        &self,
        tick: Duration,
        manager: VitalityManager,
        events: mpsc::UnboundedSender<EditorEvent>,
    ) {
        let rx = self.register(TimerKind::Cooldown);
        tokio::spawn(run_cooldown_ticker(tick, manager, events, rx));
    }

    /// Start the periodic vitality check (once a minute in production)
    pub fn start_vitality_watch(
        &self,
        period: Duration,
        manager: VitalityManager,
        events: mpsc::UnboundedSender<EditorEvent>,
    ) {
        let rx = self.register(TimerKind::VitalityWatch);
        tokio::spawn(run_vitality_watch(period, manager, events, rx));
    }

    fn register(&self, kind: TimerKind) -> watch::Receiver<TimerControl> {
        let (tx, rx) = watch::channel(TimerControl::Run);
        if let Some(previous) = self.timers.write().insert(kind, tx) {
            let _ = previous.send(TimerControl::Cancel);
        }
        rx
    }
}

async fn run_countdown(
    tick: Duration,
    total_ticks: u64,
    manager: VitalityManager,
    events: mpsc::UnboundedSender<EditorEvent>,
    mut control: watch::Receiver<TimerControl>,
) {
    let mut remaining = total_ticks;
    let mut interval = tokio::time::interval(tick);
    // The first tick of a tokio interval fires immediately
    interval.tick().await;

    loop {
        tokio::select! {
            changed = control.changed() => {
                // A dropped sender counts as cancellation
                if changed.is_err() || *control.borrow() == TimerControl::Cancel {
                    return;
                }
            }
            _ = interval.tick() => {
                remaining = remaining.saturating_sub(1);
                let _ = events.send(EditorEvent::CountdownTick {
                    remaining,
                    danger: remaining <= DANGER_SECS,
                });

                if remaining == 0 {
                    let reason = FailureReason::TimerExpired;
                    if let Err(e) = manager.fail_session(reason) {
                        tracing::error!("Failed to record session failure: {}", e);
                    }
                    let _ = events.send(EditorEvent::SessionFailed { reason });
                    return;
                }
            }
        }
    }
}

async fn run_cooldown_ticker(
    tick: Duration,
    manager: VitalityManager,
    events: mpsc::UnboundedSender<EditorEvent>,
    mut control: watch::Receiver<TimerControl>,
) {
    let mut interval = tokio::time::interval(tick);

    loop {
        tokio::select! {
            changed = control.changed() => {
                if changed.is_err() || *control.borrow() == TimerControl::Cancel {
                    return;
                }
            }
            _ = interval.tick() => {
                match manager.vitality(Utc::now()) {
                    Vitality::CoolingDown { remaining } => {
                        let _ = events.send(EditorEvent::CooldownTick { remaining });
                    }
                    _ => {
                        let _ = events.send(EditorEvent::CooldownElapsed);
                        return;
                    }
                }
            }
        }
    }
}

async fn run_vitality_watch(
    period: Duration,
    manager: VitalityManager,
    events: mpsc::UnboundedSender<EditorEvent>,
    mut control: watch::Receiver<TimerControl>,
) {
    let mut interval = tokio::time::interval(period);
    // Skip the immediate first tick; startup runs its own check
    interval.tick().await;

    loop {
        tokio::select! {
            changed = control.changed() => {
                if changed.is_err() || *control.borrow() == TimerControl::Cancel {
                    return;
                }
            }
            _ = interval.tick() => {
                // The watch never stops itself: after a death the next
                // checks are Healthy, and after CooldownOver the user may
                // write again and need watching all the same
                match manager.check_vitality(Utc::now()) {
                    Ok(VitalityCheck::Died(reason)) => {
                        let _ = events.send(EditorEvent::SessionFailed { reason });
                    }
                    Ok(VitalityCheck::CooldownOver) => {
                        let _ = events.send(EditorEvent::CooldownElapsed);
                    }
                    Ok(VitalityCheck::Healthy) => {}
                    Err(e) => {
                        tracing::error!("Vitality check failed: {}", e);
                    }
                }
            }
        }
    }
}
