//! Debounce policy for cache flushes.
//!
//! Coalesces bursts of updates into one effect: every `record` restarts the
//! quiet window, and the effect is due once the window has passed without a
//! new record. The policy owns no timer; callers poll it with their own
//! clock, which makes it testable with [`ManualClock`].

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
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

/// Single-slot debouncer.
#[derive(Debug)]
pub struct Debouncer<C: Clock = SystemClock> {
    /// Time of the most recent record, if one is pending.
    last_record: Option<Instant>,
    window: Duration,
    clock: C,
}

impl Debouncer<SystemClock> {
    pub fn new(window_ms: u64) -> Self {
        Self::with_clock(Duration::from_millis(window_ms), SystemClock)
    }
}

impl<C: Clock> Debouncer<C> {
    pub fn with_clock(window: Duration, clock: C) -> Self {
        Self {
            last_record: None,
            window,
            clock,
        }
    }

    /// Record a triggering event, restarting the quiet window.
    pub fn record(&mut self) {
        self.last_record = Some(self.clock.now());
    }

    pub fn has_pending(&self) -> bool {
        self.last_record.is_some()
    }

    /// Whether a pending effect has been quiet for the whole window.
    pub fn is_due(&self) -> bool {
        self.last_record
            .is_some_and(|at| self.clock.now().saturating_duration_since(at) >= self.window)
    }

    /// Remaining quiet time before the pending effect is due.
    ///
    /// `None` when nothing is pending, zero when already due.
    pub fn time_until_due(&self) -> Option<Duration> {
        self.last_record.map(|at| {
            let elapsed = self.clock.now().saturating_duration_since(at);
            self.window.saturating_sub(elapsed)
        })
    }

    /// Consume the pending effect if it is due.
    pub fn take_due(&mut self) -> bool {
        if self.is_due() {
            self.last_record = None;
            true
        } else {
            false
        }
    }

    /// Drop the pending effect, e.g. after a forced flush.
    pub fn cancel(&mut self) {
        self.last_record = None;
    }
}
