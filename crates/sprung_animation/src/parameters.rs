//! Scoped animation configuration
//!
//! [`AnimationParameters`] describe how property assignments made inside an
//! animation block should animate. The scheduler keeps a stack of them; the
//! innermost block wins.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use slotmap::new_key_type;

use crate::animatable::Animatable;
use crate::spring::Spring;

new_key_type! {
    /// Identifies one animation block and the animators started inside it
    pub struct GroupId;
}

/// Outcome handed to a group's completion callback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupCompletion {
    /// Every member settled or was stopped
    pub finished: bool,
    /// At least one member was taken over by a later block before settling
    pub retargeted: bool,
}

/// Configuration for one animation block
///
/// # Example
///
/// ```
/// use sprung_animation::{AnimationParameters, Point, Spring};
///
/// let params = AnimationParameters::new(Spring::interactive())
///     .with_delay(0.1)
///     .with_velocity(Point::new(0.0, 800.0));
///
/// assert_eq!(params.delay(), 0.1);
/// assert_eq!(params.velocity_for::<Point>(), Some(Point::new(0.0, 800.0)));
/// assert_eq!(params.velocity_for::<f64>(), None);
/// ```
#[derive(Clone)]
pub struct AnimationParameters {
    spring: Spring,
    delay: f64,
    velocity: Option<Rc<dyn Any>>,
    pub(crate) group: Option<GroupId>,
}

impl AnimationParameters {
    pub fn new(spring: Spring) -> Self {
        Self {
            spring,
            delay: 0.0,
            velocity: None,
            group: None,
        }
    }

    /// Builder: set the spring
    pub fn with_spring(mut self, spring: Spring) -> Self {
        self.spring = spring;
        self
    }

    /// Builder: delay in seconds before newly started animators begin
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Builder: inject an initial velocity, e.g. a gesture's release velocity
    ///
    /// Only animators whose value type is `V` pick it up.
    pub fn with_velocity<V: Animatable>(mut self, velocity: V) -> Self {
        self.velocity = Some(Rc::new(velocity));
        self
    }

    pub fn spring(&self) -> Spring {
        self.spring
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// The group assigned by the scheduler when the block runs
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// The injected velocity, if one was given for value type `V`
    pub fn velocity_for<V: Animatable>(&self) -> Option<V> {
        self.velocity
            .as_ref()
            .and_then(|velocity| velocity.downcast_ref::<V>())
            .cloned()
    }
}

impl Default for AnimationParameters {
    fn default() -> Self {
        Self::new(Spring::default())
    }
}

impl fmt::Debug for AnimationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationParameters")
            .field("spring", &self.spring)
            .field("delay", &self.delay)
            .field("has_velocity", &self.velocity.is_some())
            .field("group", &self.group)
            .finish()
    }
}
