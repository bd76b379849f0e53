//! Animation scheduler
//!
//! Owns the set of running animators and drives them from the host's frame
//! clock. It also keeps the stack of scoped [`AnimationParameters`] and fires
//! each animation block's completion once every animator in it is done.
//!
//! The scheduler is single-threaded. Animators hold a [`SchedulerHandle`]
//! (a weak reference) so the host alone decides its lifetime.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use slotmap::SlotMap;
use sprung_core::{FrameClock, NoopClock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::animator::{AnimatorId, AnimatorState};
use crate::parameters::{AnimationParameters, GroupCompletion, GroupId};

/// Default frame rate, used as the baking sample rate
pub const DEFAULT_TARGET_FPS: u32 = 60;

/// Scheduler-wide settings
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchedulerConfig {
    /// Display refresh rate the host ticks at
    pub target_fps: u32,
    /// Upper bound applied to each tick's `dt` before integrating
    pub max_frame_delta: Option<f64>,
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            max_frame_delta: None,
        }
    }

    /// Builder: set the target frame rate
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    /// Builder: clamp long frames (after a stall) to `max` seconds
    pub fn with_max_frame_delta(mut self, max: f64) -> Self {
        self.max_frame_delta = Some(max);
        self
    }

    /// Seconds per frame at the target rate
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.target_fps.max(1) as f64
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of an animator, as the scheduler drives it
pub(crate) trait Drive {
    fn id(&self) -> AnimatorId;
    fn state(&self) -> AnimatorState;
    fn priority(&self) -> i32;
    /// Restart the settling countdown and mark running
    fn begin(&self);
    /// Advance by `dt` seconds
    fn update(&self, dt: f64);
    /// Return to inactive after settling
    fn reset(&self);
}

/// Why an animator left its group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MemberExit {
    /// Settled or was stopped
    Finished,
    /// Moved to a later block before settling
    Retargeted,
}

type GroupCallback = Box<dyn FnOnce(GroupCompletion)>;

struct GroupEntry {
    completion: Option<GroupCallback>,
    members: usize,
    sealed: bool,
    retargeted: bool,
}

struct PendingStart {
    driver: Rc<dyn Drive>,
    remaining: f64,
}

struct SchedulerInner {
    config: SchedulerConfig,
    clock: Box<dyn FrameClock>,
    running: IndexMap<AnimatorId, Rc<dyn Drive>, FxBuildHasher>,
    pending: IndexMap<AnimatorId, PendingStart, FxBuildHasher>,
    parameters: Vec<AnimationParameters>,
    groups: SlotMap<GroupId, GroupEntry>,
    frame: u64,
}

impl SchedulerInner {
    /// Run the clock exactly while something is running or waiting to start
    fn sync_clock(&mut self) {
        let active = !self.running.is_empty() || !self.pending.is_empty();
        if active && !self.clock.is_running() {
            self.clock.start();
            tracing::debug!(frame = self.frame, "frame clock started");
        } else if !active && self.clock.is_running() {
            self.clock.stop();
            tracing::debug!(frame = self.frame, "frame clock stopped");
        }
    }

    /// Remove a sealed, empty group and hand back its completion
    fn take_finished_group(
        &mut self,
        group: GroupId,
    ) -> Option<(Option<GroupCallback>, GroupCompletion)> {
        let entry = self.groups.get(group)?;
        if !entry.sealed || entry.members > 0 {
            return None;
        }

        let entry = self.groups.remove(group)?;
        let outcome = GroupCompletion {
            finished: !entry.retargeted,
            retargeted: entry.retargeted,
        };
        Some((entry.completion, outcome))
    }
}

fn fire_group(group: GroupId, done: Option<(Option<GroupCallback>, GroupCompletion)>) {
    let Some((completion, outcome)) = done else {
        return;
    };

    match completion {
        Some(completion) => {
            tracing::debug!(?group, ?outcome, "group completed");
            completion(outcome);
        }
        None => tracing::trace!(?group, "group completed with no listener"),
    }
}

/// The animation scheduler that ticks all running animators
///
/// # Example
///
/// ```
/// use sprung_animation::{AnimationParameters, AnimationScheduler, Animator, Spring};
///
/// let scheduler = AnimationScheduler::new();
/// let opacity = Animator::new(scheduler.handle(), Spring::snappy()).with_value(0.0);
///
/// scheduler.animate(AnimationParameters::new(Spring::snappy()), || {
///     opacity.animate_to(1.0);
/// });
///
/// while scheduler.has_active_animations() {
///     scheduler.tick(1.0 / 60.0);
/// }
/// assert_eq!(opacity.value(), Some(1.0));
/// ```
pub struct AnimationScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl AnimationScheduler {
    /// Create a scheduler with default settings and a clock that only tracks state
    pub fn new() -> Self {
        Self::with_clock(NoopClock::new())
    }

    /// Create a scheduler that starts and stops the given frame clock
    pub fn with_clock(clock: impl FrameClock + 'static) -> Self {
        Self::with_config(SchedulerConfig::default(), clock)
    }

    pub fn with_config(config: SchedulerConfig, clock: impl FrameClock + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                config,
                clock: Box::new(clock),
                running: IndexMap::default(),
                pending: IndexMap::default(),
                parameters: Vec::new(),
                groups: SlotMap::with_key(),
                frame: 0,
            })),
        }
    }

    /// Get a handle for creating animators bound to this scheduler
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.inner.borrow().config.clone()
    }

    /// Advance every running animator by `dt` seconds
    ///
    /// Call once per display refresh while the frame clock is running.
    /// Animators that settled on the previous tick are reset and evicted;
    /// delayed starts whose delay has elapsed are registered.
    pub fn tick(&self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            tracing::warn!(dt, "ignoring tick with invalid frame delta");
            return;
        }

        let (dt, due, mut drivers) = {
            let mut inner = self.inner.borrow_mut();
            let dt = match inner.config.max_frame_delta {
                Some(max) => dt.min(max),
                None => dt,
            };
            inner.frame += 1;

            let mut due = Vec::new();
            inner.pending.retain(|_, pending| {
                pending.remaining -= dt;
                if pending.remaining <= 0.0 {
                    due.push(pending.driver.clone());
                    false
                } else {
                    true
                }
            });

            let drivers: Vec<Rc<dyn Drive>> = inner.running.values().cloned().collect();
            tracing::trace!(
                frame = inner.frame,
                active = drivers.len(),
                due = due.len(),
                "tick"
            );
            (dt, due, drivers)
        };

        // Higher priority first; the sort is stable so equal priorities keep
        // registration order.
        drivers.sort_by_key(|driver| Reverse(driver.priority()));

        for driver in drivers {
            if driver.state() == AnimatorState::Ended {
                let id = driver.id();
                driver.reset();
                self.inner.borrow_mut().running.shift_remove(&id);
                tracing::trace!(?id, "animator evicted");
            } else {
                driver.update(dt);
            }
        }

        let handle = self.handle();
        for driver in due {
            handle.register_running(driver);
        }

        self.inner.borrow_mut().sync_clock();
    }

    /// Run `body` with `parameters` as the innermost animation configuration
    pub fn animate(&self, parameters: AnimationParameters, body: impl FnOnce()) {
        self.handle().run_animation_block(parameters, body, None);
    }

    /// Like [`animate`](Self::animate), calling `completion` once every
    /// animator started or retargeted by `body` is done
    pub fn animate_with_completion(
        &self,
        parameters: AnimationParameters,
        body: impl FnOnce(),
        completion: impl FnOnce(GroupCompletion) + 'static,
    ) {
        self.handle()
            .run_animation_block(parameters, body, Some(Box::new(completion)));
    }

    /// The innermost active configuration, if inside an animation block
    pub fn current_parameters(&self) -> Option<AnimationParameters> {
        self.inner.borrow().parameters.last().cloned()
    }

    /// Check if anything is running or waiting on a delayed start
    pub fn has_active_animations(&self) -> bool {
        let inner = self.inner.borrow();
        !inner.running.is_empty() || !inner.pending.is_empty()
    }

    /// Number of registered animators, including ones that settled this tick
    pub fn active_count(&self) -> usize {
        self.inner.borrow().running.len()
    }

    /// Number of delayed starts still counting down
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Whether the animator is currently registered
    pub fn is_registered(&self, id: AnimatorId) -> bool {
        self.inner.borrow().running.contains_key(&id)
    }

    /// Number of animation groups still waiting to complete
    pub fn pending_groups(&self) -> usize {
        self.inner.borrow().groups.len()
    }

    pub fn clock_running(&self) -> bool {
        self.inner.borrow().clock.is_running()
    }

    /// Number of ticks processed so far
    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frame
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak handle to an [`AnimationScheduler`]
///
/// Every operation is a no-op once the scheduler has been dropped.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    fn upgrade(&self) -> Option<Rc<RefCell<SchedulerInner>>> {
        self.inner.upgrade()
    }

    /// Check whether the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn config(&self) -> Option<SchedulerConfig> {
        self.upgrade().map(|inner| inner.borrow().config.clone())
    }

    /// The innermost active configuration, if inside an animation block
    pub fn current_parameters(&self) -> Option<AnimationParameters> {
        self.upgrade()
            .and_then(|inner| inner.borrow().parameters.last().cloned())
    }

    /// See [`AnimationScheduler::animate`]
    pub fn animate(&self, parameters: AnimationParameters, body: impl FnOnce()) {
        self.run_animation_block(parameters, body, None);
    }

    /// See [`AnimationScheduler::animate_with_completion`]
    pub fn animate_with_completion(
        &self,
        parameters: AnimationParameters,
        body: impl FnOnce(),
        completion: impl FnOnce(GroupCompletion) + 'static,
    ) {
        self.run_animation_block(parameters, body, Some(Box::new(completion)));
    }

    /// Push `parameters`, run `body`, pop.
    ///
    /// The completion is registered under a fresh group before `body` runs so
    /// every animator touched by `body` can join it. The group is sealed when
    /// `body` returns; a group nobody joined completes right away.
    fn run_animation_block(
        &self,
        mut parameters: AnimationParameters,
        body: impl FnOnce(),
        completion: Option<GroupCallback>,
    ) {
        let Some(shared) = self.upgrade() else {
            tracing::warn!("animation block run after the scheduler was dropped");
            body();
            if let Some(completion) = completion {
                completion(GroupCompletion {
                    finished: true,
                    retargeted: false,
                });
            }
            return;
        };

        let group = {
            let mut inner = shared.borrow_mut();
            let group = inner.groups.insert(GroupEntry {
                completion,
                members: 0,
                sealed: false,
                retargeted: false,
            });
            parameters.group = Some(group);
            inner.parameters.push(parameters);
            group
        };
        tracing::debug!(?group, "animation block opened");

        body();

        let done = {
            let mut inner = shared.borrow_mut();
            let popped = inner.parameters.pop();
            debug_assert!(
                popped.is_some_and(|parameters| parameters.group == Some(group)),
                "animation block closed a configuration it did not open"
            );
            if let Some(entry) = inner.groups.get_mut(group) {
                entry.sealed = true;
            }
            inner.take_finished_group(group)
        };
        fire_group(group, done);
    }

    /// Add an animator to the running set and give it a zero-length first frame
    pub(crate) fn register_running(&self, driver: Rc<dyn Drive>) {
        let Some(shared) = self.upgrade() else {
            tracing::warn!("animator started after the scheduler was dropped");
            return;
        };

        let id = driver.id();
        {
            let mut inner = shared.borrow_mut();
            inner.pending.shift_remove(&id);
            inner.running.insert(id, driver.clone());
            inner.sync_clock();
            tracing::trace!(?id, active = inner.running.len(), "animator registered");
        }

        driver.begin();
        driver.update(0.0);
    }

    /// Register `driver` once `delay` seconds of ticks have elapsed
    ///
    /// Replaces any start already pending for the same animator.
    pub(crate) fn schedule_start(&self, driver: Rc<dyn Drive>, delay: f64) {
        let Some(shared) = self.upgrade() else {
            tracing::warn!("animator started after the scheduler was dropped");
            return;
        };

        let id = driver.id();
        let mut inner = shared.borrow_mut();
        let replaced = inner
            .pending
            .insert(
                id,
                PendingStart {
                    driver,
                    remaining: delay,
                },
            )
            .is_some();
        inner.sync_clock();
        tracing::trace!(?id, delay, replaced, "delayed start scheduled");
    }

    /// Drop a pending delayed start. Returns whether one existed.
    pub(crate) fn cancel_pending(&self, id: AnimatorId) -> bool {
        let Some(shared) = self.upgrade() else {
            return false;
        };

        let mut inner = shared.borrow_mut();
        let cancelled = inner.pending.shift_remove(&id).is_some();
        if cancelled {
            inner.sync_clock();
            tracing::trace!(?id, "delayed start cancelled");
        }
        cancelled
    }

    pub(crate) fn is_registered(&self, id: AnimatorId) -> bool {
        self.upgrade()
            .is_some_and(|inner| inner.borrow().running.contains_key(&id))
    }

    pub(crate) fn join_group(&self, group: GroupId) {
        if let Some(shared) = self.upgrade() {
            if let Some(entry) = shared.borrow_mut().groups.get_mut(group) {
                entry.members += 1;
            }
        }
    }

    /// Record that one member left `group`, firing its completion if it was the last
    ///
    /// A group with no registration is ignored.
    pub(crate) fn execute_group_completion(&self, group: GroupId, exit: MemberExit) {
        let Some(shared) = self.upgrade() else {
            return;
        };

        let done = {
            let mut inner = shared.borrow_mut();
            let Some(entry) = inner.groups.get_mut(group) else {
                tracing::trace!(?group, "group event with no registration");
                return;
            };
            entry.members = entry.members.saturating_sub(1);
            entry.retargeted |= exit == MemberExit::Retargeted;
            inner.take_finished_group(group)
        };
        fire_group(group, done);
    }
}
