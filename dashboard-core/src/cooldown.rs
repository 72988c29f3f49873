//! Per-location save cooldown.
//!
//! State lives for the lifetime of the guard only; nothing is persisted.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

pub const SAVE_COOLDOWN: Duration = Duration::from_secs(3 * 60);

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Arc::new(Mutex::new(Instant::now())) }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug)]
pub struct SaveCooldown<C: Clock = SystemClock> {
    clock: C,
    window: Duration,
    last_saves: Mutex<HashMap<String, Instant>>,
}

impl SaveCooldown<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for SaveCooldown<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SaveCooldown<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, window: SAVE_COOLDOWN, last_saves: Mutex::new(HashMap::new()) }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True when nothing was saved for `location` yet, or the window has fully elapsed.
    pub fn is_allowed(&self, location: &str) -> bool {
        self.remaining(location).is_zero()
    }

    /// Stamps the current time for `location`. A stamp never moves backwards.
    pub fn record_save(&self, location: &str) {
        let now = self.clock.now();
        let mut saves = self.last_saves.lock();
        let stamp = saves.entry(location.to_string()).or_insert(now);
        if now > *stamp {
            *stamp = now;
        }
        tracing::debug!(location, "save cooldown started");
    }

    pub fn remaining(&self, location: &str) -> Duration {
        let saves = self.last_saves.lock();
        let Some(last) = saves.get(location) else {
            return Duration::ZERO;
        };

        let elapsed = self.clock.now().saturating_duration_since(*last);
        self.window.saturating_sub(elapsed)
    }
}
