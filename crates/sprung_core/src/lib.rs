//! Sprung Core
//!
//! Foundational types shared by the Sprung animation engine and the layers
//! that bind its output to real properties:
//!
//! - **Geometry**: points, sizes, rects, colors and affine transforms
//! - **Errors**: the [`AnimationError`] raised by misconfigured animations
//! - **Frame clock**: the seam through which the engine starts and stops the
//!   host's per-frame timer

pub mod clock;
pub mod error;
pub mod geometry;

pub use clock::{FrameClock, ManualClock, NoopClock};
pub use error::{AnimationError, Result};
pub use geometry::{Affine2D, Color, Point, Rect, Size};
