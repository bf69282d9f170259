//! Strongly-typed numeric primitives for field geometry (zero-cost newtypes).
//!
//! - Document lengths (`Pt`) and render lengths (`Px`) never mix implicitly
//! - Conversions between the two only happen in `coords::CoordinateSpace`
//! - Validating constructors reject NaN/infinite input at the boundary

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Error type for invalid numeric values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericError {
    /// Value is NaN
    NaN,
    /// Value is infinite
    Infinite,
    /// Value is zero when non-zero required
    Zero,
    /// Value is negative when positive required
    Negative,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::NaN => write!(f, "value is NaN"),
            NumericError::Infinite => write!(f, "value is infinite"),
            NumericError::Zero => write!(f, "value is zero"),
            NumericError::Negative => write!(f, "value is negative"),
        }
    }
}

impl std::error::Error for NumericError {}

fn check_finite(val: f64) -> Result<f64, NumericError> {
    if val.is_nan() {
        Err(NumericError::NaN)
    } else if val.is_infinite() {
        Err(NumericError::Infinite)
    } else {
        Ok(val)
    }
}

fn check_positive(val: f64) -> Result<f64, NumericError> {
    let val = check_finite(val)?;
    if val == 0.0 {
        Err(NumericError::Zero)
    } else if val < 0.0 {
        Err(NumericError::Negative)
    } else {
        Ok(val)
    }
}

/// Generates the shared arithmetic surface for a length newtype.
macro_rules! length_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: $name = $name(0.0);

            /// Create with validation (rejects NaN/infinite)
            #[inline]
            pub fn try_new(val: f64) -> Result<$name, NumericError> {
                check_finite(val).map($name)
            }

            /// Create with validation, requiring a strictly positive value
            #[inline]
            pub fn try_positive(val: f64) -> Result<$name, NumericError> {
                check_positive(val).map($name)
            }

            #[inline]
            pub fn abs(self) -> $name {
                $name(self.0.abs())
            }

            #[inline]
            pub fn min(self, other: $name) -> $name {
                $name(self.0.min(other.0))
            }

            #[inline]
            pub fn max(self, other: $name) -> $name {
                $name(self.0.max(other.0))
            }

            /// Get the raw value (use sparingly, prefer typed operations)
            #[inline]
            pub fn raw(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: $name) -> $name { $name(self.0 + rhs.0) }
        }
        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: $name) -> $name { $name(self.0 - rhs.0) }
        }
        impl Mul<f64> for $name {
            type Output = $name;
            fn mul(self, rhs: f64) -> $name { $name(self.0 * rhs) }
        }
        impl Div<f64> for $name {
            type Output = $name;
            fn div(self, rhs: f64) -> $name { $name(self.0 / rhs) }
        }
        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> $name { $name(-self.0) }
        }
        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) { self.0 += rhs.0; }
        }
        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: $name) { self.0 -= rhs.0; }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl From<f64> for $name {
            fn from(val: f64) -> $name { $name(val) }
        }
    };
}

length_type! {
    /// Length in document units (PDF points, origin bottom-left)
    Pt
}

length_type! {
    /// Length in render pixels (origin top-left)
    Px
}

/// Unitless scalar (ratios, zoom factors)
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Scalar(pub f64);

impl Scalar {
    pub const ONE: Scalar = Scalar(1.0);

    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size<T> {
    pub w: T,
    pub h: T,
}

impl<T> Size<T> {
    pub fn new(w: T, h: T) -> Self {
        Size { w, h }
    }
}

/// A displacement vector (not an absolute position)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Offset<T> {
    pub dx: T,
    pub dy: T,
}

impl<T> Offset<T> {
    pub fn new(dx: T, dy: T) -> Self {
        Offset { dx, dy }
    }
}

impl Offset<Px> {
    /// Convert a raw pointer delta (pixels) into a typed offset
    pub fn from_pointer(delta: glam::DVec2) -> Self {
        Offset { dx: Px(delta.x), dy: Px(delta.y) }
    }
}

/// Axis-aligned rectangle as origin + size.
///
/// What `y` means depends on the space: in document space it is the distance
/// from the page bottom to the rect's bottom edge; in render space it is the
/// distance from the image top to the rect's top edge.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub w: T,
    pub h: T,
}

/// Rectangle in document space (points, bottom-left origin)
pub type DocRect = Rect<Pt>;
/// Rectangle in render space (pixels, top-left origin)
pub type RenderRect = Rect<Px>;

impl Rect<Pt> {
    /// Build a document rect from raw point values
    pub fn pt(x: f64, y: f64, w: f64, h: f64) -> Self {
        Rect { x: Pt(x), y: Pt(y), w: Pt(w), h: Pt(h) }
    }

    pub fn has_positive_size(&self) -> bool {
        self.w.0 > 0.0 && self.h.0 > 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }

    /// Compare with a relative tolerance (scaled by the larger magnitude, min 1.0)
    pub fn approx_eq(&self, other: &Self, rel_eps: f64) -> bool {
        close(self.x.0, other.x.0, rel_eps)
            && close(self.y.0, other.y.0, rel_eps)
            && close(self.w.0, other.w.0, rel_eps)
            && close(self.h.0, other.h.0, rel_eps)
    }
}

impl Rect<Px> {
    /// Build a render rect from raw pixel values
    pub fn px(x: f64, y: f64, w: f64, h: f64) -> Self {
        Rect { x: Px(x), y: Px(y), w: Px(w), h: Px(h) }
    }

    /// Translate by an offset, keeping the size
    pub fn translate(self, by: Offset<Px>) -> Self {
        Rect { x: self.x + by.dx, y: self.y + by.dy, ..self }
    }

    pub fn right(&self) -> Px {
        self.x + self.w
    }

    pub fn bottom(&self) -> Px {
        self.y + self.h
    }

    pub fn approx_eq(&self, other: &Self, rel_eps: f64) -> bool {
        close(self.x.0, other.x.0, rel_eps)
            && close(self.y.0, other.y.0, rel_eps)
            && close(self.w.0, other.w.0, rel_eps)
            && close(self.h.0, other.h.0, rel_eps)
    }
}

fn close(a: f64, b: f64, rel_eps: f64) -> bool {
    (a - b).abs() <= rel_eps * a.abs().max(b.abs()).max(1.0)
}
