//! Property binding
//!
//! Connects an [`Animator`] to a field of some host-owned object. The binding
//! holds the object weakly; once the host drops it, samples are discarded.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::animatable::Animatable;
use crate::animator::Animator;
use crate::scheduler::SchedulerHandle;
use crate::spring::Spring;

/// An animator whose every sample is written onto a property of `O`
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use sprung_animation::{AnimationParameters, AnimationScheduler, PropertyBinding, Spring};
///
/// struct Layer {
///     opacity: f64,
/// }
///
/// let scheduler = AnimationScheduler::new();
/// let layer = Rc::new(RefCell::new(Layer { opacity: 0.0 }));
/// let opacity = PropertyBinding::new(
///     scheduler.handle(),
///     Spring::smooth(),
///     &layer,
///     |layer| layer.opacity,
///     |layer, value| layer.opacity = *value,
/// );
///
/// scheduler.animate(AnimationParameters::new(Spring::smooth()), || opacity.set(1.0));
/// while scheduler.has_active_animations() {
///     scheduler.tick(1.0 / 60.0);
/// }
/// assert_eq!(layer.borrow().opacity, 1.0);
/// ```
pub struct PropertyBinding<O, V> {
    target: Weak<RefCell<O>>,
    animator: Animator<V>,
}

impl<O: 'static, V: Animatable> PropertyBinding<O, V> {
    /// Bind a property of `target`
    ///
    /// `get` seeds the animator with the property's current value; `set`
    /// receives every subsequent sample.
    pub fn new(
        scheduler: SchedulerHandle,
        spring: Spring,
        target: &Rc<RefCell<O>>,
        get: impl FnOnce(&O) -> V,
        set: impl Fn(&mut O, &V) + 'static,
    ) -> Self {
        let initial = get(&target.borrow());
        let animator = Animator::new(scheduler, spring).with_value(initial.clone());
        animator.set_target(initial);

        let weak = Rc::downgrade(target);
        let sink = weak.clone();
        animator.on_value_changed(move |value| {
            if let Some(object) = sink.upgrade() {
                set(&mut object.borrow_mut(), value);
            }
        });

        Self {
            target: weak,
            animator,
        }
    }

    /// Assign the property, animating if inside an animation block
    pub fn set(&self, value: V) {
        self.animator.animate_to(value);
    }

    /// The value the property is heading toward
    pub fn get(&self) -> Option<V> {
        self.animator.target()
    }

    /// The value currently presented on the property
    pub fn presentation_value(&self) -> Option<V> {
        self.animator.value()
    }

    pub fn animator(&self) -> &Animator<V> {
        &self.animator
    }

    /// Whether the bound object is still alive
    pub fn is_bound(&self) -> bool {
        self.target.strong_count() > 0
    }
}
