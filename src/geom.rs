//! Shared geometry utilities.
//!
//! Everything in the crate is generic over [`Real`] so the same fitting code
//! runs in single and double precision.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use num_traits::Float;

/// Floating point scalar used by the fits (`f32` or `f64`).
pub trait Real: Float + Debug + Default + Send + Sync + 'static {
    /// Convert an `f64` literal into this precision.
    fn lit(value: f64) -> Self;

    /// Widen to `f64` for reporting.
    fn as_f64(self) -> f64;

    /// Convert a point count into this precision.
    fn count(n: usize) -> Self {
        Self::lit(n as f64)
    }

    fn pi() -> Self {
        Self::lit(std::f64::consts::PI)
    }
}

impl Real for f64 {
    fn lit(value: f64) -> Self {
        value
    }

    fn as_f64(self) -> f64 {
        self
    }
}

impl Real for f32 {
    fn lit(value: f64) -> Self {
        value as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

/// A 2D point or displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2<T> {
    pub x: T,
    pub y: T,
}

impl<T: Real> Vec2<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero())
    }

    pub fn nan() -> Self {
        Self::new(T::nan(), T::nan())
    }

    pub fn dot(self, other: Self) -> T {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(self) -> T {
        self.dot(self)
    }

    pub fn length(self) -> T {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Self) -> T {
        (other - self).length()
    }

    /// Unit vector in the same direction; NaN for the zero vector.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > T::zero() {
            self * (T::one() / len)
        } else {
            Self::nan()
        }
    }

    /// Rotate a quarter turn counter-clockwise.
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Rotate by `angle` radians counter-clockwise.
    pub fn rotate(self, angle: T) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Angle of the vector in radians, in (-pi, pi].
    pub fn atan2(self) -> T {
        self.y.atan2(self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Convert between precisions.
    pub fn cast<U: Real>(self) -> Vec2<U> {
        Vec2::new(U::lit(self.x.as_f64()), U::lit(self.y.as_f64()))
    }
}

/// Wrap an angle difference into (-pi, pi].
pub fn wrap_angle<T: Real>(angle: T) -> T {
    let pi = T::pi();
    let tau = pi + pi;
    let mut a = angle % tau;
    if a > pi {
        a = a - tau;
    } else if a <= -pi {
        a = a + tau;
    }
    a
}

/// Dot product of the unit vectors along `a` and `b`.
///
/// NaN when either vector has zero length.
pub fn unit_dot<T: Real>(a: Vec2<T>, b: Vec2<T>) -> T {
    a.normalize().dot(b.normalize())
}

impl<T: Real> Add for Vec2<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T: Real> AddAssign for Vec2<T> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<T: Real> Sub for Vec2<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<T: Real> SubAssign for Vec2<T> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<T: Real> Mul<T> for Vec2<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl<T: Real> Neg for Vec2<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<kurbo::Point> for Vec2<f64> {
    fn from(p: kurbo::Point) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<Vec2<f64>> for kurbo::Point {
    fn from(v: Vec2<f64>) -> Self {
        kurbo::Point::new(v.x, v.y)
    }
}

impl From<kurbo::Vec2> for Vec2<f64> {
    fn from(v: kurbo::Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vec2<f64>> for kurbo::Vec2 {
    fn from(v: Vec2<f64>) -> Self {
        kurbo::Vec2::new(v.x, v.y)
    }
}
