//! Frame clock seam
//!
//! The host owns the display-refresh timer. The scheduler only needs to tell
//! it when to run: `start` when the first animation becomes active, `stop`
//! once nothing is left to drive. While running, the host calls
//! `AnimationScheduler::tick(dt)` once per refresh.

use std::cell::Cell;
use std::rc::Rc;

/// A per-frame callback source owned by the host
pub trait FrameClock {
    /// Begin delivering ticks
    fn start(&mut self);

    /// Stop delivering ticks
    fn stop(&mut self);

    /// Whether ticks are currently being delivered
    fn is_running(&self) -> bool;
}

/// A clock that only tracks its running flag
///
/// Suitable for hosts that tick unconditionally and just want to query
/// `AnimationScheduler::has_active_animations`.
#[derive(Debug, Default)]
pub struct NoopClock {
    running: bool,
}

impl NoopClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameClock for NoopClock {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[derive(Debug, Default)]
struct ManualClockState {
    running: Cell<bool>,
    starts: Cell<u32>,
    stops: Cell<u32>,
}

/// A clock handle that records start/stop transitions
///
/// Clones share state, so a test can hand one clone to the scheduler and
/// inspect the other.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    state: Rc<ManualClockState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the clock was started
    pub fn start_count(&self) -> u32 {
        self.state.starts.get()
    }

    /// Number of times the clock was stopped
    pub fn stop_count(&self) -> u32 {
        self.state.stops.get()
    }
}

impl FrameClock for ManualClock {
    fn start(&mut self) {
        self.state.running.set(true);
        self.state.starts.set(self.state.starts.get() + 1);
    }

    fn stop(&mut self) {
        self.state.running.set(false);
        self.state.stops.set(self.state.stops.get() + 1);
    }

    fn is_running(&self) -> bool {
        self.state.running.get()
    }
}
