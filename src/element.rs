//! Floating-point element types the engine is generic over.
use num_traits::Float;
use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

/// Scalar stored in a [`Matrix`](crate::Matrix). Implemented for `f32` and `f64`.
pub trait Element:
    Float
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Sum
    + Default
    + Debug
    + Display
    + Send
    + Sync
    + 'static
{
    /// Lossy conversion from an `f64` literal.
    fn of(v: f64) -> Self;

    /// Widening conversion used for diagnostics and statistics.
    fn as_f64(self) -> f64;
}

impl Element for f32 {
    #[inline]
    fn of(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    #[inline]
    fn of(v: f64) -> Self {
        v
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}
