//! Sprung Animation
//!
//! Spring-driven, interruptible property animation.
//!
//! # Features
//!
//! - **Spring Physics**: damping ratio / response springs integrated with
//!   explicit Euler, with a closed-form settling duration
//! - **Any Value Type**: scalars, points, rects, colors, transforms and
//!   vectors animate axis by axis through [`Animatable`]
//! - **Retargeting**: changing a running animation's target keeps its value
//!   and velocity, so motion redirects instead of restarting
//! - **Animation Blocks**: scoped [`AnimationParameters`] picked up by every
//!   assignment inside the block, with one completion per block
//! - **Baking**: precompute a trajectory for hosts that play curves back
//!   themselves
//!
//! The host supplies the frame clock and calls [`AnimationScheduler::tick`]
//! once per display refresh.

pub mod animatable;
pub mod animator;
pub mod bake;
pub mod binding;
pub mod parameters;
pub mod scheduler;
pub mod spring;

pub use animatable::{Animatable, AnimatableVector};
pub use animator::{AnimationEvent, Animator, AnimatorId, AnimatorState};
pub use bake::{bake, BakedTrajectory, MAX_BAKED_SAMPLES};
pub use binding::PropertyBinding;
pub use parameters::{AnimationParameters, GroupCompletion, GroupId};
pub use scheduler::{AnimationScheduler, SchedulerConfig, SchedulerHandle};
pub use spring::{rubberband, Spring, SpringParameters};

pub use sprung_core::{
    Affine2D, AnimationError, Color, FrameClock, ManualClock, NoopClock, Point, Rect, Result, Size,
};
