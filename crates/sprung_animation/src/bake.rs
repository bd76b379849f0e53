//! Trajectory baking
//!
//! Precomputes the samples a spring produces at a fixed rate, for hosts that
//! hand the whole curve to a compositor (CSS-style keyframes, layer
//! animations) instead of ticking per frame. Baking runs the exact update
//! rule the scheduler uses, so the samples match live playback at the same
//! `dt` value for value.

use sprung_core::{AnimationError, Result};

use crate::animatable::{integrate, Animatable};
use crate::animator::Animator;
use crate::scheduler::DEFAULT_TARGET_FPS;
use crate::spring::Spring;

/// Upper bound on the number of samples one trajectory may hold
pub const MAX_BAKED_SAMPLES: usize = 1 << 20;

/// Samples of a spring animation at a fixed interval
#[derive(Clone, Debug, PartialEq)]
pub struct BakedTrajectory<V> {
    /// One sample per step; the last equals the target
    pub samples: Vec<V>,
    /// Seconds between samples
    pub sample_interval: f64,
    /// `samples.len() * sample_interval`
    pub total_duration: f64,
}

impl<V> BakedTrajectory<V> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Normalized key time of each sample, in `(0, 1]`
    pub fn key_times(&self) -> Vec<f64> {
        let count = self.samples.len() as f64;
        (1..=self.samples.len())
            .map(|i| i as f64 / count)
            .collect()
    }

    pub fn last(&self) -> Option<&V> {
        self.samples.last()
    }
}

/// Bake the motion from `value` toward `target` at `sample_rate` samples per second
///
/// Fails if the rate is not positive, the spring never settles, or the
/// trajectory would need more than [`MAX_BAKED_SAMPLES`] samples.
pub fn bake<V: Animatable>(
    spring: &Spring,
    value: &V,
    velocity: &V,
    target: &V,
    sample_rate: f64,
) -> Result<BakedTrajectory<V>> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(AnimationError::InvalidSampleRate(sample_rate));
    }
    if !spring.settling_duration().is_finite() {
        return Err(AnimationError::NeverSettles(spring.settling_duration()));
    }

    let expected = if spring.is_animated() {
        (spring.settling_duration() * sample_rate).ceil()
    } else {
        1.0
    };
    if expected > MAX_BAKED_SAMPLES as f64 {
        return Err(AnimationError::TooManySamples {
            samples: expected,
            limit: MAX_BAKED_SAMPLES,
        });
    }

    let dt = 1.0 / sample_rate;
    let mut samples = Vec::with_capacity((expected as usize).saturating_add(1));
    let mut value = value.clone();
    let mut velocity = velocity.clone();
    let mut elapsed = 0.0;

    loop {
        elapsed += dt;
        if !spring.is_animated() || elapsed >= spring.settling_duration() {
            samples.push(target.clone());
            break;
        }

        let (next, next_velocity) = integrate(spring, &value, &velocity, target, dt);
        samples.push(next.clone());
        value = next;
        velocity = next_velocity;
    }

    tracing::trace!(samples = samples.len(), sample_rate, "trajectory baked");

    let total_duration = samples.len() as f64 * dt;
    Ok(BakedTrajectory {
        samples,
        sample_interval: dt,
        total_duration,
    })
}

impl<V: Animatable> Animator<V> {
    /// Bake this animator's motion from its current state without running it
    pub fn bake(&self, sample_rate: f64) -> Result<BakedTrajectory<V>> {
        let value = self.value().ok_or(AnimationError::MissingValue)?;
        let target = self.target().ok_or(AnimationError::MissingTarget)?;
        bake(&self.spring(), &value, &self.velocity(), &target, sample_rate)
    }

    /// Bake at the scheduler's target frame rate
    pub fn bake_default(&self) -> Result<BakedTrajectory<V>> {
        let fps = self
            .scheduler()
            .config()
            .map_or(DEFAULT_TARGET_FPS, |config| config.target_fps);
        self.bake(fps as f64)
    }
}
