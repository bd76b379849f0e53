//! Values a spring can drive
//!
//! Every animatable type decomposes into independent scalar axes. Integration
//! is always the scalar [`Spring::step`] applied to each axis with the same
//! spring and `dt`; there is no coupling between axes.

use smallvec::SmallVec;
use sprung_core::{Affine2D, Color, Point, Rect, Size};

use crate::spring::Spring;

/// Scalar axes of an animatable value
///
/// Inline capacity covers every built-in fixed-size type, including the six
/// elements of an affine transform.
pub type Axes = SmallVec<[f64; 8]>;

/// A value type that can be integrated by a [`Spring`]
///
/// Velocity is expressed in the same type as the value.
pub trait Animatable: Clone + PartialEq + std::fmt::Debug + 'static {
    /// The additive identity; also the resting velocity
    fn zero() -> Self;

    /// Decompose into independent scalar axes
    fn to_axes(&self) -> Axes;

    /// Rebuild from axes. Missing axes read as zero.
    fn from_axes(axes: &[f64]) -> Self;

    /// Snap every axis to the nearest whole number
    fn integralized(&self) -> Self {
        let axes: Axes = self.to_axes().iter().map(|axis| axis.round()).collect();
        Self::from_axes(&axes)
    }
}

/// Integrate `value` toward `target` by `dt` seconds, axis by axis
///
/// Returns `(new_value, new_velocity)`. The axis count is the larger of the
/// value's and the target's, so growable vectors of unequal length still
/// integrate; absent axes are treated as zero.
pub fn integrate<V: Animatable>(
    spring: &Spring,
    value: &V,
    velocity: &V,
    target: &V,
    dt: f64,
) -> (V, V) {
    let values = value.to_axes();
    let velocities = velocity.to_axes();
    let targets = target.to_axes();
    let count = values.len().max(targets.len());

    let mut next_values = Axes::with_capacity(count);
    let mut next_velocities = Axes::with_capacity(count);
    for i in 0..count {
        let (v, vel) = spring.step(
            axis(&values, i),
            axis(&velocities, i),
            axis(&targets, i),
            dt,
        );
        next_values.push(v);
        next_velocities.push(vel);
    }

    (V::from_axes(&next_values), V::from_axes(&next_velocities))
}

#[inline]
fn axis(axes: &[f64], i: usize) -> f64 {
    axes.get(i).copied().unwrap_or(0.0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Scalars
// ─────────────────────────────────────────────────────────────────────────────

impl Animatable for f64 {
    fn zero() -> Self {
        0.0
    }

    fn to_axes(&self) -> Axes {
        smallvec::smallvec![*self]
    }

    fn from_axes(axes: &[f64]) -> Self {
        axis(axes, 0)
    }

    fn integralized(&self) -> Self {
        self.round()
    }
}

impl Animatable for f32 {
    fn zero() -> Self {
        0.0
    }

    fn to_axes(&self) -> Axes {
        smallvec::smallvec![*self as f64]
    }

    fn from_axes(axes: &[f64]) -> Self {
        axis(axes, 0) as f32
    }

    fn integralized(&self) -> Self {
        self.round()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geometry
// ─────────────────────────────────────────────────────────────────────────────

impl Animatable for Point {
    fn zero() -> Self {
        Point::ZERO
    }

    fn to_axes(&self) -> Axes {
        smallvec::smallvec![self.x, self.y]
    }

    fn from_axes(axes: &[f64]) -> Self {
        Point::new(axis(axes, 0), axis(axes, 1))
    }
}

impl Animatable for Size {
    fn zero() -> Self {
        Size::ZERO
    }

    fn to_axes(&self) -> Axes {
        smallvec::smallvec![self.width, self.height]
    }

    fn from_axes(axes: &[f64]) -> Self {
        Size::new(axis(axes, 0), axis(axes, 1))
    }
}

impl Animatable for Rect {
    fn zero() -> Self {
        Rect::ZERO
    }

    fn to_axes(&self) -> Axes {
        smallvec::smallvec![self.x, self.y, self.width, self.height]
    }

    fn from_axes(axes: &[f64]) -> Self {
        Rect::new(axis(axes, 0), axis(axes, 1), axis(axes, 2), axis(axes, 3))
    }
}

impl Animatable for Color {
    fn zero() -> Self {
        Color::TRANSPARENT
    }

    fn to_axes(&self) -> Axes {
        Axes::from_slice(&self.to_array())
    }

    fn from_axes(axes: &[f64]) -> Self {
        Color::rgba(axis(axes, 0), axis(axes, 1), axis(axes, 2), axis(axes, 3))
    }
}

/// Each matrix element is its own spring axis.
///
/// The zero value is the all-zero matrix (a velocity), not the identity.
impl Animatable for Affine2D {
    fn zero() -> Self {
        Affine2D { elements: [0.0; 6] }
    }

    fn to_axes(&self) -> Axes {
        Axes::from_slice(&self.elements)
    }

    fn from_axes(axes: &[f64]) -> Self {
        Affine2D {
            elements: std::array::from_fn(|i| axis(axes, i)),
        }
    }
}

impl<const N: usize> Animatable for [f64; N] {
    fn zero() -> Self {
        [0.0; N]
    }

    fn to_axes(&self) -> Axes {
        Axes::from_slice(self)
    }

    fn from_axes(axes: &[f64]) -> Self {
        std::array::from_fn(|i| axis(axes, i))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Growable vectors
// ─────────────────────────────────────────────────────────────────────────────

/// A numeric vector of any length
///
/// Used for color components in arbitrary spaces and for 3D transform
/// matrices. The zero vector is empty; it is padded with zeros wherever it is
/// combined with a longer vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimatableVector(pub SmallVec<[f64; 4]>);

impl AnimatableVector {
    pub fn new(elements: impl IntoIterator<Item = f64>) -> Self {
        Self(elements.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for AnimatableVector {
    fn from(elements: Vec<f64>) -> Self {
        Self(SmallVec::from_vec(elements))
    }
}

impl<const N: usize> From<[f64; N]> for AnimatableVector {
    fn from(elements: [f64; N]) -> Self {
        Self(SmallVec::from_slice(&elements))
    }
}

impl Animatable for AnimatableVector {
    fn zero() -> Self {
        Self::default()
    }

    fn to_axes(&self) -> Axes {
        Axes::from_slice(&self.0)
    }

    fn from_axes(axes: &[f64]) -> Self {
        Self(SmallVec::from_slice(axes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn test_composite_matches_scalar_per_axis() {
        let spring = Spring::snappy();
        let (point, point_velocity) = integrate(
            &spring,
            &Point::new(0.0, 50.0),
            &Point::new(10.0, -5.0),
            &Point::new(100.0, 0.0),
            DT,
        );

        let (x, vx) = spring.step(0.0, 10.0, 100.0, DT);
        let (y, vy) = spring.step(50.0, -5.0, 0.0, DT);
        assert_eq!(point, Point::new(x, y));
        assert_eq!(point_velocity, Point::new(vx, vy));
    }

    #[test]
    fn test_rect_integrates_four_axes() {
        let spring = Spring::interactive();
        let from = Rect::new(0.0, 0.0, 10.0, 10.0);
        let to = Rect::new(100.0, 200.0, 10.0, 50.0);
        let (next, _) = integrate(&spring, &from, &Rect::zero(), &to, DT);

        assert!(next.x > 0.0);
        assert!(next.y > next.x);
        // Width already at target stays put
        assert_eq!(next.width, 10.0);
        assert!(next.height > 10.0);
    }

    #[test]
    fn test_affine_elements_are_independent() {
        let spring = Spring::smooth();
        let from = Affine2D::IDENTITY;
        let to = Affine2D::translation(40.0, 0.0);
        let (next, _) = integrate(&spring, &from, &Affine2D::zero(), &to, DT);

        assert_eq!(next.elements[0], 1.0);
        assert!(next.elements[4] > 0.0);
        assert_eq!(next.elements[5], 0.0);
    }

    #[test]
    fn test_vector_pads_missing_axes() {
        let spring = Spring::snappy();
        let value = AnimatableVector::from([1.0, 2.0, 3.0]);
        let target = AnimatableVector::from([1.0, 2.0, 3.0]);
        let (next, velocity) = integrate(&spring, &value, &AnimatableVector::zero(), &target, DT);

        assert_eq!(next, value);
        assert_eq!(velocity, AnimatableVector::from([0.0, 0.0, 0.0]));
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_vector_grows_to_target_length() {
        let spring = Spring::snappy();
        let value = AnimatableVector::from([0.0]);
        let target = AnimatableVector::from([1.0, 1.0]);
        let (next, _) = integrate(&spring, &value, &AnimatableVector::zero(), &target, DT);
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn test_integralized() {
        assert_eq!(Point::new(1.4, 2.6).integralized(), Point::new(1.0, 3.0));
        assert_eq!(12.5f64.integralized(), 13.0);
        assert_eq!([0.2, 0.8].integralized(), [0.0, 1.0]);
        assert_eq!(
            Rect::new(0.4, 0.6, 9.5, 10.49).integralized(),
            Rect::new(0.0, 1.0, 10.0, 10.0)
        );
    }

    #[test]
    fn test_axes_round_trip_for_color() {
        let color = Color::rgba(0.1, 0.2, 0.3, 0.4);
        assert_eq!(Color::from_axes(&color.to_axes()), color);
        assert_eq!(f32::from_axes(&[]), 0.0);
    }
}
