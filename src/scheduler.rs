//! Timed inputs: apply now, revert later.
//!
//! Every command is applied and flushed synchronously, then a tokio task is
//! spawned that sleeps for the requested duration and puts the touched field
//! back to neutral. Callers get their answer as soon as the apply step is
//! done and never wait on the revert.
//!
//! Reverts are independent of each other. Two overlapping inputs on the same
//! field are not merged: whichever revert fires first clears the field, even
//! if the other input is still meant to be held.

use crate::error::BridgeError;
use crate::input_map::{self, InputTarget};
use crate::pool::SessionPool;
use crate::session::DeviceSession;
use crate::virtual_controller::{Side, TRIGGER_MAX};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_PRESS_MS: u64 = 150;
pub const DEFAULT_STICK_MS: u64 = 200;
pub const DEFAULT_TRIGGER_MS: u64 = 150;

/// One transient change to a controller and how to undo it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputChange {
    Button(u16),
    Stick { side: Side, x: f32, y: f32 },
    /// Triggers are always pulled all the way
    Trigger(Side),
}

impl InputChange {
    fn apply(&self, session: &mut DeviceSession) {
        match *self {
            InputChange::Button(button) => session.set_button(button, true),
            InputChange::Stick { side, x, y } => session.set_stick(side, x, y),
            InputChange::Trigger(side) => session.set_trigger(side, TRIGGER_MAX),
        }
    }

    fn revert(&self, session: &mut DeviceSession) {
        match *self {
            InputChange::Button(button) => session.set_button(button, false),
            InputChange::Stick { side, .. } => session.set_stick(side, 0.0, 0.0),
            InputChange::Trigger(side) => session.set_trigger(side, 0),
        }
    }
}

/// Counters for operators. Revert failures have no caller to report to.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pending: AtomicUsize,
    failed_reverts: AtomicU64,
}

/// An in-flight input waiting for its revert
struct ScheduledInput {
    controller: usize,
    change: InputChange,
    deadline: Instant,
}

impl ScheduledInput {
    async fn run(self, pool: Arc<SessionPool>, stats: Arc<SchedulerStats>) {
        tokio::time::sleep_until(self.deadline).await;

        let result = match pool.get(self.controller) {
            Some(mut session) => {
                self.change.revert(&mut session);
                session.flush()
            }
            None => Err(anyhow::anyhow!("controller disappeared")),
        };

        if let Err(e) = result {
            stats.failed_reverts.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "Failed to revert {:?} on controller {}: {}",
                self.change, self.controller, e
            );
        }
        stats.pending.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Clone)]
pub struct InputScheduler {
    pool: Arc<SessionPool>,
    stats: Arc<SchedulerStats>,
}

impl InputScheduler {
    pub fn new(pool: Arc<SessionPool>) -> Self {
        Self {
            pool,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Inputs applied whose revert has not run yet
    pub fn pending_inputs(&self) -> usize {
        self.stats.pending.load(Ordering::Relaxed)
    }

    pub fn failed_reverts(&self) -> u64 {
        self.stats.failed_reverts.load(Ordering::Relaxed)
    }

    pub fn press_button(
        &self,
        controller: usize,
        button: u16,
        duration: Duration,
    ) -> Result<(), BridgeError> {
        self.schedule(controller, InputChange::Button(button), duration)
    }

    /// Deflect a stick; `x` and `y` are in -1.0..=1.0
    pub fn move_stick(
        &self,
        controller: usize,
        side: Side,
        x: f32,
        y: f32,
        duration: Duration,
    ) -> Result<(), BridgeError> {
        self.schedule(controller, InputChange::Stick { side, x, y }, duration)
    }

    pub fn pull_trigger(
        &self,
        controller: usize,
        side: Side,
        duration: Duration,
    ) -> Result<(), BridgeError> {
        self.schedule(controller, InputChange::Trigger(side), duration)
    }

    /// Press a button or pull a trigger by its symbolic name.
    ///
    /// The controller is checked before the name, and nothing is scheduled
    /// unless both are valid. Without a duration, buttons are held for
    /// `DEFAULT_PRESS_MS` and triggers for `DEFAULT_TRIGGER_MS`.
    pub fn press_named(
        &self,
        controller: usize,
        name: &str,
        duration: Option<Duration>,
    ) -> Result<InputTarget, BridgeError> {
        self.resolve_controller(controller as i64)?;
        let target = input_map::resolve(name)?;
        match target {
            InputTarget::Button(button) => {
                let duration = duration.unwrap_or(Duration::from_millis(DEFAULT_PRESS_MS));
                self.press_button(controller, button, duration)?
            }
            InputTarget::Trigger(side) => {
                let duration = duration.unwrap_or(Duration::from_millis(DEFAULT_TRIGGER_MS));
                self.pull_trigger(controller, side, duration)?
            }
        }
        Ok(target)
    }

    /// Map a caller-supplied index onto the pool. Negative indices are
    /// reported as missing like any other out-of-range value.
    pub fn resolve_controller(&self, controller: i64) -> Result<usize, BridgeError> {
        usize::try_from(controller)
            .ok()
            .filter(|&index| index < self.pool.count())
            .ok_or_else(|| self.not_found(controller))
    }

    fn not_found(&self, controller: i64) -> BridgeError {
        BridgeError::ControllerNotFound {
            index: controller,
            available: self.pool.count(),
        }
    }

    fn schedule(
        &self,
        controller: usize,
        change: InputChange,
        duration: Duration,
    ) -> Result<(), BridgeError> {
        let applied = {
            let mut session = self
                .pool
                .get(controller)
                .ok_or_else(|| self.not_found(controller as i64))?;
            change.apply(&mut session);
            session.flush()
        };

        // The revert is scheduled even when the flush failed, so the staged
        // state still goes back to neutral.
        let task = ScheduledInput {
            controller,
            change,
            deadline: Instant::now() + duration,
        };
        self.stats.pending.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(task.run(Arc::clone(&self.pool), Arc::clone(&self.stats)));

        applied.map_err(|e| {
            log::warn!("Failed to apply {:?} on controller {}: {}", change, controller, e);
            BridgeError::Backend {
                index: controller,
                reason: e.to_string(),
            }
        })
    }
}
