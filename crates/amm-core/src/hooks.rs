// amm-core/src/hooks.rs

//! Epoch bookkeeping and hook dispatch.
//!
//! An [`EpochSchedule`] turns block times into epoch boundary events. A
//! [`HookRegistry`] holds an ordered list of `(trigger, handler)` pairs and
//! invokes the handlers whose trigger matches an event. Handlers receive an
//! explicit context value instead of reaching for shared state.

use crate::{CoreError, CoreResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Which boundary a handler listens to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookTrigger {
    /// Fires before the first block of a new epoch
    EpochStart(String),
    /// Fires after the last block of an epoch
    EpochEnd(String),
}

/// A boundary crossed by a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochEvent {
    pub trigger: HookTrigger,
    pub epoch_number: u64,
}

/// Handler for epoch boundaries; both callbacks default to no-ops
pub trait EpochHooks<C: ?Sized> {
    /// Name used in logs
    fn name(&self) -> &str;

    fn before_epoch_start(&mut self, _ctx: &C, _identifier: &str, _epoch_number: u64) -> CoreResult<()> {
        Ok(())
    }

    fn after_epoch_end(&mut self, _ctx: &C, _identifier: &str, _epoch_number: u64) -> CoreResult<()> {
        Ok(())
    }
}

/// Time-based epoch tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochInfo {
    /// Epoch identifier, e.g. "day" or "week"
    pub identifier: String,
    /// First instant counting may begin
    pub start_time: DateTime<Utc>,
    /// Epoch length in seconds
    pub duration_secs: i64,
    /// Current epoch number (0 before counting starts)
    pub current_epoch: u64,
    /// Start of the current epoch
    pub current_epoch_start_time: DateTime<Utc>,
    /// Whether the first epoch has begun
    pub counting_started: bool,
}

impl EpochInfo {
    /// Create a new epoch tracker
    pub fn new(identifier: impl Into<String>, start_time: DateTime<Utc>, duration_secs: i64) -> CoreResult<Self> {
        if duration_secs <= 0 {
            return Err(CoreError::HookError("epoch duration must be positive".into()));
        }
        Ok(Self {
            identifier: identifier.into(),
            start_time,
            duration_secs,
            current_epoch: 0,
            current_epoch_start_time: start_time,
            counting_started: false,
        })
    }

    fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    /// Advance to `block_time`, returning the boundaries crossed
    fn advance(&mut self, block_time: DateTime<Utc>) -> Vec<EpochEvent> {
        let mut events = Vec::new();

        if !self.counting_started {
            if block_time < self.start_time {
                return events;
            }
            self.counting_started = true;
            self.current_epoch = 1;
            self.current_epoch_start_time = self.start_time;
            events.push(EpochEvent {
                trigger: HookTrigger::EpochStart(self.identifier.clone()),
                epoch_number: self.current_epoch,
            });
            return events;
        }

        // At most one boundary per block
        if block_time >= self.current_epoch_start_time + self.duration() {
            events.push(EpochEvent {
                trigger: HookTrigger::EpochEnd(self.identifier.clone()),
                epoch_number: self.current_epoch,
            });
            self.current_epoch += 1;
            self.current_epoch_start_time = self.current_epoch_start_time + self.duration();
            events.push(EpochEvent {
                trigger: HookTrigger::EpochStart(self.identifier.clone()),
                epoch_number: self.current_epoch,
            });
        }

        events
    }
}

/// All tracked epochs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpochSchedule {
    epochs: Vec<EpochInfo>,
}

impl EpochSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new epoch; identifiers must be unique
    pub fn add_epoch(&mut self, info: EpochInfo) -> CoreResult<()> {
        if self.epochs.iter().any(|e| e.identifier == info.identifier) {
            return Err(CoreError::HookError(format!(
                "duplicate epoch identifier '{}'",
                info.identifier
            )));
        }
        self.epochs.push(info);
        Ok(())
    }

    pub fn epochs(&self) -> &[EpochInfo] {
        &self.epochs
    }

    /// Advance every epoch to `block_time`
    pub fn advance(&mut self, block_time: DateTime<Utc>) -> Vec<EpochEvent> {
        self.epochs
            .iter_mut()
            .flat_map(|epoch| epoch.advance(block_time))
            .collect()
    }
}

/// Ordered `(trigger, handler)` table
pub struct HookRegistry<C: ?Sized> {
    hooks: Vec<(HookTrigger, Box<dyn EpochHooks<C> + Send>)>,
}

impl<C: ?Sized> Default for HookRegistry<C> {
    fn default() -> Self {
        Self { hooks: Vec::new() }
    }
}

impl<C: ?Sized> HookRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler; handlers run in registration order
    pub fn register(&mut self, trigger: HookTrigger, hook: Box<dyn EpochHooks<C> + Send>) {
        tracing::debug!("Registered hook '{}' on {:?}", hook.name(), trigger);
        self.hooks.push((trigger, hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Invoke the matching handlers for each event and return how many ran.
    /// A failing handler is logged and does not stop the others.
    pub fn dispatch(&mut self, ctx: &C, events: &[EpochEvent]) -> usize {
        let mut invoked = 0;
        for event in events {
            for (trigger, hook) in self.hooks.iter_mut() {
                if *trigger != event.trigger {
                    continue;
                }
                let result = match &event.trigger {
                    HookTrigger::EpochStart(id) => hook.before_epoch_start(ctx, id, event.epoch_number),
                    HookTrigger::EpochEnd(id) => hook.after_epoch_end(ctx, id, event.epoch_number),
                };
                invoked += 1;
                if let Err(e) = result {
                    tracing::warn!("Hook '{}' failed on {:?}: {}", hook.name(), event.trigger, e);
                }
            }
        }
        invoked
    }
}
