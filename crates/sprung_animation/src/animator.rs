//! Spring animator
//!
//! An [`Animator`] drives one value of any [`Animatable`] type toward a target
//! using a [`Spring`]. Cloning an animator clones the handle; every clone
//! observes and controls the same animation.
//!
//! Animators are driven by an [`AnimationScheduler`](crate::AnimationScheduler)
//! through the [`SchedulerHandle`] they were created with. Callbacks are never
//! invoked while the animator's internal state is borrowed, so a callback may
//! freely read or retarget the animator that called it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use sprung_core::{AnimationError, Result};

use crate::animatable::{integrate, Animatable};
use crate::parameters::{AnimationParameters, GroupId};
use crate::scheduler::{Drive, MemberExit, SchedulerHandle};
use crate::spring::Spring;

static NEXT_ANIMATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an animator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(u64);

impl AnimatorId {
    fn next() -> Self {
        Self(NEXT_ANIMATOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// Lifecycle of an animator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimatorState {
    /// Not registered with the scheduler
    #[default]
    Inactive,
    /// Registered and advancing every tick
    Running,
    /// Settled this tick; reset and evicted on the next pass
    Ended,
}

/// Event delivered to an animator's completion callback
#[derive(Clone, Debug, PartialEq)]
pub enum AnimationEvent<V> {
    /// The animator settled at, or was stopped at, `at`
    Finished { at: V },
    /// The target changed while running
    Retargeted { from: V, to: V },
}

type ValueCallback<V> = Rc<dyn Fn(&V)>;
type EventCallback<V> = Rc<dyn Fn(&AnimationEvent<V>)>;

struct AnimatorInner<V> {
    id: AnimatorId,
    scheduler: SchedulerHandle,
    spring: Spring,
    value: Option<V>,
    target: Option<V>,
    velocity: V,
    state: AnimatorState,
    running_time: f64,
    group: Option<GroupId>,
    integralize_values: bool,
    priority: i32,
    on_value_changed: Option<ValueCallback<V>>,
    on_completion: Option<EventCallback<V>>,
}

/// Everything one integration step hands to callbacks once the borrow is released
struct Frame<V> {
    emitted: V,
    settled_at: Option<V>,
    group: Option<GroupId>,
    scheduler: SchedulerHandle,
    on_value_changed: Option<ValueCallback<V>>,
    on_completion: Option<EventCallback<V>>,
}

/// A spring-driven value
///
/// # Example
///
/// ```
/// use sprung_animation::{AnimationScheduler, Animator, Spring};
///
/// let scheduler = AnimationScheduler::new();
/// let x = Animator::new(scheduler.handle(), Spring::interactive())
///     .with_value(0.0)
///     .with_target(100.0);
///
/// x.start();
/// for _ in 0..120 {
///     scheduler.tick(1.0 / 60.0);
/// }
/// assert_eq!(x.value(), Some(100.0));
/// ```
pub struct Animator<V> {
    inner: Rc<RefCell<AnimatorInner<V>>>,
}

impl<V> Clone for Animator<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Animatable> Animator<V> {
    /// Create an inactive animator with no value or target
    pub fn new(scheduler: SchedulerHandle, spring: Spring) -> Self {
        Self {
            inner: Rc::new(RefCell::new(AnimatorInner {
                id: AnimatorId::next(),
                scheduler,
                spring,
                value: None,
                target: None,
                velocity: V::zero(),
                state: AnimatorState::Inactive,
                running_time: 0.0,
                group: None,
                integralize_values: false,
                priority: 0,
                on_value_changed: None,
                on_completion: None,
            })),
        }
    }

    /// Builder: set the initial value
    pub fn with_value(self, value: V) -> Self {
        self.set_value(value);
        self
    }

    /// Builder: set the initial target
    pub fn with_target(self, target: V) -> Self {
        self.inner.borrow_mut().target = Some(target);
        self
    }

    /// Builder: round emitted values to whole numbers
    pub fn with_integralized_values(self) -> Self {
        self.set_integralize_values(true);
        self
    }

    pub fn id(&self) -> AnimatorId {
        self.inner.borrow().id
    }

    pub fn state(&self) -> AnimatorState {
        self.inner.borrow().state
    }

    /// The scheduler this animator is driven by
    pub fn scheduler(&self) -> SchedulerHandle {
        self.inner.borrow().scheduler.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnimatorState::Running
    }

    pub fn spring(&self) -> Spring {
        self.inner.borrow().spring
    }

    /// Replace the spring; takes effect from the next tick
    pub fn set_spring(&self, spring: Spring) {
        self.inner.borrow_mut().spring = spring;
    }

    pub fn value(&self) -> Option<V> {
        self.inner.borrow().value.clone()
    }

    /// Overwrite the current value without notifying or touching velocity
    pub fn set_value(&self, value: V) {
        self.inner.borrow_mut().value = Some(value);
    }

    pub fn target(&self) -> Option<V> {
        self.inner.borrow().target.clone()
    }

    /// Change the target
    ///
    /// While running, a changed target restarts the settling countdown and
    /// reports [`AnimationEvent::Retargeted`]. Value and velocity carry over,
    /// so the motion stays continuous.
    pub fn set_target(&self, target: V) {
        let retargeted = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.target.replace(target.clone());
            match previous {
                Some(from) if inner.state == AnimatorState::Running && from != target => {
                    inner.running_time = 0.0;
                    Some((
                        AnimationEvent::Retargeted { from, to: target },
                        inner.on_completion.clone(),
                    ))
                }
                _ => None,
            }
        };

        if let Some((event, callback)) = retargeted {
            tracing::debug!(id = ?self.id(), "animator retargeted");
            if let Some(callback) = callback {
                callback(&event);
            }
        }
    }

    pub fn velocity(&self) -> V {
        self.inner.borrow().velocity.clone()
    }

    pub fn set_velocity(&self, velocity: V) {
        self.inner.borrow_mut().velocity = velocity;
    }

    /// Seconds since the animator started or was last retargeted
    pub fn running_time(&self) -> f64 {
        self.inner.borrow().running_time
    }

    /// The animation block this animator currently belongs to
    pub fn group(&self) -> Option<GroupId> {
        self.inner.borrow().group
    }

    pub fn integralize_values(&self) -> bool {
        self.inner.borrow().integralize_values
    }

    /// Round values passed to the value-changed callback. The stored value
    /// keeps full precision.
    pub fn set_integralize_values(&self, integralize: bool) {
        self.inner.borrow_mut().integralize_values = integralize;
    }

    pub fn priority(&self) -> i32 {
        self.inner.borrow().priority
    }

    /// Higher priorities advance first within a tick
    pub fn set_priority(&self, priority: i32) {
        self.inner.borrow_mut().priority = priority;
    }

    /// Called with every new value, once per tick while running
    pub fn on_value_changed(&self, callback: impl Fn(&V) + 'static) {
        self.inner.borrow_mut().on_value_changed = Some(Rc::new(callback));
    }

    /// Called when the animator settles, is stopped, or is retargeted
    pub fn on_completion(&self, callback: impl Fn(&AnimationEvent<V>) + 'static) {
        self.inner.borrow_mut().on_completion = Some(Rc::new(callback));
    }

    /// Start animating now
    ///
    /// # Panics
    ///
    /// Panics if the value or target is unset. See [`try_start`](Self::try_start).
    pub fn start(&self) {
        self.start_after(0.0);
    }

    /// Start animating once `delay` seconds of ticks have elapsed
    ///
    /// # Panics
    ///
    /// Panics if the value or target is unset, or if `delay` is negative.
    pub fn start_after(&self, delay: f64) {
        if let Err(err) = self.try_start_after(delay) {
            panic!("{err}");
        }
    }

    pub fn try_start(&self) -> Result<()> {
        self.try_start_after(0.0)
    }

    /// Start animating once `delay` seconds of ticks have elapsed
    ///
    /// A zero delay registers immediately and runs a zero-length first frame.
    /// Restarting while a delayed start is pending replaces it.
    pub fn try_start_after(&self, delay: f64) -> Result<()> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(AnimationError::NegativeDelay(delay));
        }

        let scheduler = {
            let inner = self.inner.borrow();
            if inner.value.is_none() {
                return Err(AnimationError::MissingValue);
            }
            if inner.target.is_none() {
                return Err(AnimationError::MissingTarget);
            }
            inner.scheduler.clone()
        };

        let driver: Rc<dyn Drive> = Rc::new(self.clone());
        if delay > 0.0 {
            scheduler.schedule_start(driver, delay);
        } else {
            scheduler.register_running(driver);
        }
        Ok(())
    }

    /// Stop the animation
    ///
    /// With `immediately`, the value freezes where it is, velocity drops to
    /// zero and any pending start is cancelled. A completion event fires if
    /// the animator was running or pending.
    ///
    /// Otherwise the current value becomes the target and the spring brings
    /// the motion to rest smoothly.
    pub fn stop(&self, immediately: bool) {
        if !immediately {
            if let Some(value) = self.value() {
                self.set_target(value);
                if !self.is_running() {
                    self.start();
                }
            }
            return;
        }

        let (id, scheduler) = {
            let inner = self.inner.borrow();
            (inner.id, inner.scheduler.clone())
        };
        let was_pending = scheduler.cancel_pending(id);
        let registered = scheduler.is_registered(id);

        let stopped = {
            let mut inner = self.inner.borrow_mut();
            let Some(value) = inner.value.clone() else {
                return;
            };
            let was_running = inner.state == AnimatorState::Running;
            inner.target = Some(value.clone());
            inner.velocity = V::zero();
            inner.state = if registered {
                AnimatorState::Ended
            } else {
                AnimatorState::Inactive
            };

            (was_running || was_pending)
                .then(|| (value, inner.on_completion.clone(), inner.group.take()))
        };

        if let Some((value, callback, group)) = stopped {
            tracing::debug!(?id, "animator stopped");
            if let Some(callback) = callback {
                callback(&AnimationEvent::Finished { at: value });
            }
            if let Some(group) = group {
                scheduler.execute_group_completion(group, MemberExit::Finished);
            }
        }
    }

    /// Assign a new target, animating if inside an animation block
    ///
    /// Outside any block, or when there is no current value yet, the target
    /// is applied immediately. Inside a block the animator adopts the block's
    /// spring, injected velocity, group and delay. An animator that is already
    /// running just retargets and keeps its momentum.
    pub fn animate_to(&self, target: V) {
        let (parameters, has_value) = {
            let inner = self.inner.borrow();
            (inner.scheduler.current_parameters(), inner.value.is_some())
        };

        match parameters {
            Some(parameters) if has_value => self.animate_with(parameters, target),
            _ => self.snap_to(target),
        }
    }

    fn snap_to(&self, target: V) {
        let (emitted, callback) = {
            let mut inner = self.inner.borrow_mut();
            inner.value = Some(target.clone());
            inner.target = Some(target.clone());
            inner.velocity = V::zero();
            let emitted = if inner.integralize_values {
                target.integralized()
            } else {
                target
            };
            (emitted, inner.on_value_changed.clone())
        };

        if let Some(callback) = callback {
            callback(&emitted);
        }
        self.stop(true);
    }

    fn animate_with(&self, parameters: AnimationParameters, target: V) {
        let group = parameters.group();
        let (scheduler, previous_group, running) = {
            let mut inner = self.inner.borrow_mut();
            inner.spring = parameters.spring();
            if let Some(velocity) = parameters.velocity_for::<V>() {
                inner.velocity = velocity;
            }
            let previous_group = std::mem::replace(&mut inner.group, group);
            (
                inner.scheduler.clone(),
                previous_group,
                inner.state == AnimatorState::Running,
            )
        };

        if previous_group != group {
            if let Some(group) = group {
                scheduler.join_group(group);
            }
            if let Some(previous) = previous_group {
                scheduler.execute_group_completion(previous, MemberExit::Retargeted);
            }
        }

        self.set_target(target);
        if !running {
            self.start_after(parameters.delay());
        }
    }

    /// One integration step; see [`Drive::update`]
    fn advance(&self, dt: f64) {
        let frame = {
            let mut inner = self.inner.borrow_mut();
            let (Some(value), Some(target)) = (inner.value.clone(), inner.target.clone()) else {
                inner.state = AnimatorState::Inactive;
                return;
            };

            inner.state = AnimatorState::Running;
            inner.running_time += dt;

            let spring = inner.spring;
            let settled =
                !spring.is_animated() || inner.running_time >= spring.settling_duration();

            let next = if settled {
                inner.velocity = V::zero();
                target.clone()
            } else {
                let (next, velocity) = integrate(&spring, &value, &inner.velocity, &target, dt);
                inner.velocity = velocity;
                next
            };
            inner.value = Some(next.clone());

            let emitted = if inner.integralize_values {
                next.integralized()
            } else {
                next
            };

            let group = if settled {
                inner.state = AnimatorState::Ended;
                inner.group.take()
            } else {
                None
            };

            Frame {
                emitted,
                settled_at: settled.then_some(target),
                group,
                scheduler: inner.scheduler.clone(),
                on_value_changed: inner.on_value_changed.clone(),
                on_completion: inner.on_completion.clone(),
            }
        };

        if let Some(callback) = &frame.on_value_changed {
            callback(&frame.emitted);
        }

        if let Some(at) = frame.settled_at {
            tracing::trace!(id = ?self.id(), "animator settled");
            if let Some(callback) = &frame.on_completion {
                callback(&AnimationEvent::Finished { at });
            }
            if let Some(group) = frame.group {
                frame
                    .scheduler
                    .execute_group_completion(group, MemberExit::Finished);
            }
        }
    }
}

impl<V: Animatable> Drive for Animator<V> {
    fn id(&self) -> AnimatorId {
        self.inner.borrow().id
    }

    fn state(&self) -> AnimatorState {
        self.inner.borrow().state
    }

    fn priority(&self) -> i32 {
        self.inner.borrow().priority
    }

    fn begin(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.running_time = 0.0;
        inner.state = AnimatorState::Running;
    }

    fn update(&self, dt: f64) {
        self.advance(dt);
    }

    fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.state = AnimatorState::Inactive;
        inner.velocity = V::zero();
        inner.running_time = 0.0;
    }
}

impl<V: Animatable> fmt::Debug for Animator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Animator")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("value", &inner.value)
            .field("target", &inner.target)
            .field("velocity", &inner.velocity)
            .field("spring", &inner.spring)
            .finish()
    }
}
