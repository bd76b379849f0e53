//! Spring parameter model
//!
//! A [`Spring`] is an immutable description of a damped harmonic oscillator.
//! It is parameterized the way designers think about motion (damping ratio and
//! response time) and derives the physical stiffness and damping coefficient
//! from those. It also owns the single integration step used by both live
//! animators and trajectory baking.

use std::f64::consts::PI;
use std::ops::RangeInclusive;

use sprung_core::{AnimationError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fraction of the initial displacement considered "settled"
pub const SETTLING_PERCENTAGE: f64 = 0.0001;

/// Scale applied to the near-critical settling time for critically damped and
/// overdamped springs
pub const OVERDAMPED_SETTLING_SCALE: f64 = 1.25;

/// Range the damping coefficient is rubber-banded into
pub const DAMPING_COEFFICIENT_RANGE: RangeInclusive<f64> = 0.0..=60.0;

/// How far past [`DAMPING_COEFFICIENT_RANGE`] the damping coefficient may stretch
pub const DAMPING_COEFFICIENT_INTERVAL: f64 = 15.0;

/// Rubber-band coefficient (the same constant UIKit scroll views use)
pub const RUBBERBAND_COEFFICIENT: f64 = 0.55;

/// Soft-clamp `value` into `range`
///
/// Values inside the range pass through unchanged. Values outside approach
/// `range ± interval` asymptotically, so the result is always finite and
/// bounded even for infinite input.
pub fn rubberband(value: f64, range: RangeInclusive<f64>, interval: f64) -> f64 {
    if range.contains(&value) {
        return value;
    }

    let stretch = |distance: f64| {
        (1.0 - (1.0 / ((distance * RUBBERBAND_COEFFICIENT / interval) + 1.0))) * interval
    };

    if value > *range.end() {
        range.end() + stretch(value - range.end())
    } else {
        range.start() - stretch(range.start() - value)
    }
}

/// The designer-facing inputs a [`Spring`] is built from
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringParameters {
    pub damping_ratio: f64,
    pub response: f64,
    pub mass: f64,
}

impl TryFrom<SpringParameters> for Spring {
    type Error = AnimationError;

    fn try_from(params: SpringParameters) -> Result<Self> {
        Spring::try_with_mass(params.damping_ratio, params.response, params.mass)
    }
}

impl From<Spring> for SpringParameters {
    fn from(spring: Spring) -> Self {
        spring.parameters()
    }
}

/// Damped harmonic oscillator parameters
///
/// Equality compares only the inputs (`damping_ratio`, `response`, `mass`);
/// everything else is derived from them.
///
/// # Example
///
/// ```
/// use sprung_animation::Spring;
///
/// let spring = Spring::new(1.0, 0.8);
/// assert!((spring.stiffness() - 61.685).abs() < 1e-3);
/// assert!(spring.is_animated());
/// assert!(!Spring::non_animated().is_animated());
/// ```
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "SpringParameters", into = "SpringParameters")
)]
pub struct Spring {
    damping_ratio: f64,
    response: f64,
    mass: f64,
    stiffness: f64,
    damping: f64,
    settling_duration: f64,
}

impl Spring {
    /// Create a spring from a damping ratio and response (in seconds), with unit mass
    ///
    /// # Panics
    ///
    /// Panics if `damping_ratio` or `response` is negative or not finite.
    pub fn new(damping_ratio: f64, response: f64) -> Self {
        Self::with_mass(damping_ratio, response, 1.0)
    }

    /// Create a spring from a damping ratio, response and mass
    ///
    /// # Panics
    ///
    /// Panics on the same conditions as [`Spring::try_with_mass`].
    pub fn with_mass(damping_ratio: f64, response: f64, mass: f64) -> Self {
        Self::try_with_mass(damping_ratio, response, mass).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`Spring::with_mass`]
    ///
    /// A `response` of exactly zero is allowed and produces the non-animated
    /// sentinel: infinite stiffness, values applied immediately.
    pub fn try_with_mass(damping_ratio: f64, response: f64, mass: f64) -> Result<Self> {
        check("damping_ratio", damping_ratio, damping_ratio >= 0.0)?;
        check("response", response, response >= 0.0)?;
        check("mass", mass, mass > 0.0)?;

        let stiffness = (2.0 * PI / response).powi(2) * mass;
        let unbanded_damping = if response == 0.0 {
            f64::INFINITY
        } else {
            4.0 * PI * damping_ratio * mass / response
        };
        let damping = rubberband(
            unbanded_damping,
            DAMPING_COEFFICIENT_RANGE,
            DAMPING_COEFFICIENT_INTERVAL,
        );

        Ok(Self {
            damping_ratio,
            response,
            mass,
            stiffness,
            damping,
            settling_duration: settling_time(damping_ratio, stiffness, mass),
        })
    }

    /// Create a spring from a damping ratio and a stiffness
    ///
    /// # Panics
    ///
    /// Panics unless both `damping_ratio` and `stiffness` are positive and finite.
    pub fn from_stiffness(damping_ratio: f64, stiffness: f64, mass: f64) -> Self {
        Self::try_from_stiffness(damping_ratio, stiffness, mass)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`Spring::from_stiffness`]
    pub fn try_from_stiffness(damping_ratio: f64, stiffness: f64, mass: f64) -> Result<Self> {
        check("damping_ratio", damping_ratio, damping_ratio > 0.0)?;
        check("stiffness", stiffness, stiffness > 0.0)?;
        check("mass", mass, mass > 0.0)?;

        Self::try_with_mass(damping_ratio, response_for(stiffness, mass), mass)
    }

    /// Create a spring from physical damping and stiffness coefficients
    ///
    /// The damping ratio is `damping / (2·√(stiffness·mass))`. Unless
    /// `allow_over_damping` is set, ratios above 1.0 are clamped to exactly
    /// critical damping.
    ///
    /// # Panics
    ///
    /// Panics if `damping` is negative or `stiffness`/`mass` are not positive.
    pub fn from_damping(damping: f64, stiffness: f64, mass: f64, allow_over_damping: bool) -> Self {
        Self::try_from_damping(damping, stiffness, mass, allow_over_damping)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`Spring::from_damping`]
    pub fn try_from_damping(
        damping: f64,
        stiffness: f64,
        mass: f64,
        allow_over_damping: bool,
    ) -> Result<Self> {
        check("damping", damping, damping >= 0.0)?;
        check("stiffness", stiffness, stiffness > 0.0)?;
        check("mass", mass, mass > 0.0)?;

        let mut damping_ratio = damping / (2.0 * (stiffness * mass).sqrt());
        if !allow_over_damping && damping_ratio > 1.0 {
            damping_ratio = 1.0;
        }

        Self::try_with_mass(damping_ratio, response_for(stiffness, mass), mass)
    }

    /// Create a spring from a perceptual duration and bounce
    ///
    /// `bounce` of 0 is critically damped, positive values (up to 1) add
    /// overshoot, negative values (down to -1) make the spring overdamped.
    pub fn with_bounce(duration: f64, bounce: f64) -> Self {
        let bounce = bounce.clamp(-0.99, 1.0);
        let damping_ratio = if bounce >= 0.0 {
            1.0 - bounce
        } else {
            1.0 / (1.0 + bounce)
        };
        Self::new(damping_ratio, duration)
    }

    // ========================================================================
    // Presets
    // ========================================================================

    /// Fast, slightly bouncy spring for gesture-driven motion
    pub fn interactive() -> Self {
        Self::new(0.8, 0.28)
    }

    /// Slower critically damped spring for non-interactive transitions
    pub fn animated() -> Self {
        Self::new(1.0, 0.8)
    }

    /// Sentinel spring meaning "apply the value immediately"
    pub fn non_animated() -> Self {
        Self::new(1.0, 0.0)
    }

    /// Quick spring with a small amount of bounce
    pub fn snappy() -> Self {
        Self::with_bounce(0.5, 0.15)
    }

    /// Critically damped spring with no bounce
    pub fn smooth() -> Self {
        Self::with_bounce(0.5, 0.0)
    }

    /// Spring with a clearly visible bounce
    pub fn bouncy() -> Self {
        Self::with_bounce(0.5, 0.3)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn damping_ratio(&self) -> f64 {
        self.damping_ratio
    }

    /// Response in seconds, roughly the period of one undamped oscillation
    pub fn response(&self) -> f64 {
        self.response
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Rubber-banded damping coefficient
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Undamped natural frequency ωn = √(stiffness / mass)
    pub fn natural_frequency(&self) -> f64 {
        (self.stiffness / self.mass).sqrt()
    }

    /// Seconds after which the displacement is considered negligible
    pub fn settling_duration(&self) -> f64 {
        self.settling_duration
    }

    /// False for the zero-response sentinel
    pub fn is_animated(&self) -> bool {
        self.response > 0.0
    }

    pub fn parameters(&self) -> SpringParameters {
        SpringParameters {
            damping_ratio: self.damping_ratio,
            response: self.response,
            mass: self.mass,
        }
    }

    /// Advance one scalar axis by `dt` seconds with explicit Euler integration
    ///
    /// Returns `(new_value, new_velocity)`. Must not be called for the
    /// non-animated sentinel; callers snap to the target instead.
    #[inline]
    pub fn step(&self, value: f64, velocity: f64, target: f64, dt: f64) -> (f64, f64) {
        let displacement = value - target;
        let spring_force = -self.stiffness * displacement;
        let damping_force = self.damping * velocity;
        let force = spring_force - damping_force;
        let acceleration = force / self.mass;

        let new_velocity = velocity + acceleration * dt;
        let new_value = value + new_velocity * dt;
        (new_value, new_velocity)
    }
}

impl PartialEq for Spring {
    fn eq(&self, other: &Self) -> bool {
        self.damping_ratio == other.damping_ratio
            && self.response == other.response
            && self.mass == other.mass
    }
}

impl Default for Spring {
    fn default() -> Self {
        Self::animated()
    }
}

fn check(parameter: &'static str, value: f64, valid: bool) -> Result<()> {
    if value.is_finite() && valid {
        Ok(())
    } else {
        Err(AnimationError::InvalidSpring { parameter, value })
    }
}

/// Inverse of `stiffness = (2π / response)² · mass`
fn response_for(stiffness: f64, mass: f64) -> f64 {
    2.0 * PI / (stiffness / mass).sqrt()
}

fn settling_time(damping_ratio: f64, stiffness: f64, mass: f64) -> f64 {
    if stiffness == f64::INFINITY {
        return 1.0;
    }

    // Critical and overdamped springs reuse the almost-critical estimate, scaled up.
    if damping_ratio >= 1.0 {
        return settling_time(1.0 - f64::EPSILON, stiffness, mass) * OVERDAMPED_SETTLING_SCALE;
    }

    let natural_frequency = (stiffness / mass).sqrt();
    -SETTLING_PERCENTAGE.ln() / (damping_ratio * natural_frequency)
}
