//! Algebraic circle fit.
//!
//! Minimizes `Σ (|p - center|² - R²)²`, which reduces to a 2x2 linear solve
//! in centered coordinates (Kasa's method). Exact for points on a circle and
//! cheap to update, at the price of a slight bias towards smaller radii on
//! noisy short arcs.

use tracing::trace;

use super::{Accumulator, Moments};
use crate::error::FitError;
use crate::geom::{wrap_angle, Real, Vec2};

/// Fitted circle parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle<T> {
    pub center: Vec2<T>,
    pub radius: T,
}

impl<T: Real> Circle<T> {
    pub fn nan() -> Self {
        Self {
            center: Vec2::nan(),
            radius: T::nan(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite()
    }

    /// Angle of `p` about the center, in radians. Increases counter-clockwise.
    pub fn arc_coordinate(&self, p: Vec2<T>) -> T {
        (p - self.center).atan2()
    }

    /// Signed angle swept going from `p` to `q`, in (-pi, pi].
    pub fn arc_delta_coordinate(&self, p: Vec2<T>, q: Vec2<T>) -> T {
        wrap_angle(self.arc_coordinate(q) - self.arc_coordinate(p))
    }

    /// Move `p` radially onto the circle.
    pub fn snap(&self, p: Vec2<T>) -> Vec2<T> {
        self.center + (p - self.center).normalize() * self.radius
    }

    pub fn squared_error(&self, p: Vec2<T>) -> T {
        let d = self.center.distance(p) - self.radius;
        d * d
    }
}

/// Incremental circle fit.
#[derive(Debug, Clone)]
pub struct ArcFit<T> {
    moments: Moments<T>,
    sxxx: T,
    sxxy: T,
    sxyy: T,
    syyy: T,
    circle: Circle<T>,
}

impl<T: Real> Default for ArcFit<T> {
    fn default() -> Self {
        Self {
            moments: Moments::default(),
            sxxx: T::zero(),
            sxxy: T::zero(),
            sxyy: T::zero(),
            syyy: T::zero(),
            circle: Circle::nan(),
        }
    }
}

impl<T: Real> ArcFit<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters as of the last `recompute`; NaN when degenerate.
    pub fn circle(&self) -> Circle<T> {
        self.circle
    }

    pub fn circle_checked(&self) -> Result<Circle<T>, FitError> {
        if self.circle.is_valid() {
            Ok(self.circle)
        } else {
            Err(FitError::DegenerateFit("arc needs three non-collinear points"))
        }
    }

    pub fn arc_coordinate(&self, p: Vec2<T>) -> T {
        self.circle.arc_coordinate(p)
    }

    /// Re-anchor the moments on their mean, carrying the third order sums
    /// over to the new origin first.
    fn rebase(&mut self) {
        let Some(d) = self.moments.drift() else {
            return;
        };
        let n = T::count(self.moments.count());
        let (two, three) = (T::lit(2.0), T::lit(3.0));
        let (sx, sy) = self.moments.first();
        let (sxx, sxy, syy) = self.moments.second();
        let (dx, dy) = (d.x, d.y);
        self.sxxx = self.sxxx - three * dx * sxx + three * dx * dx * sx - n * dx * dx * dx;
        self.sxxy = self.sxxy - dy * sxx - two * dx * sxy + two * dx * dy * sx + dx * dx * sy
            - n * dx * dx * dy;
        self.sxyy = self.sxyy - dx * syy - two * dy * sxy + two * dx * dy * sy + dy * dy * sx
            - n * dx * dy * dy;
        self.syyy = self.syyy - three * dy * syy + three * dy * dy * sy - n * dy * dy * dy;
        self.moments.shift(d);
    }

    pub fn arc_delta_coordinate(&self, p: Vec2<T>, q: Vec2<T>) -> T {
        self.circle.arc_delta_coordinate(p, q)
    }
}

impl<T: Real> Accumulator<T> for ArcFit<T> {
    fn add(&mut self, p: Vec2<T>) {
        let q = self.moments.add(p);
        if self.moments.count() == 1 {
            self.sxxx = T::zero();
            self.sxxy = T::zero();
            self.sxyy = T::zero();
            self.syyy = T::zero();
        }
        self.sxxx = self.sxxx + q.x * q.x * q.x;
        self.sxxy = self.sxxy + q.x * q.x * q.y;
        self.sxyy = self.sxyy + q.x * q.y * q.y;
        self.syyy = self.syyy + q.y * q.y * q.y;
        self.rebase();
    }

    fn remove(&mut self, p: Vec2<T>) {
        match self.moments.remove(p) {
            Some(q) => {
                self.sxxx = self.sxxx - q.x * q.x * q.x;
                self.sxxy = self.sxxy - q.x * q.x * q.y;
                self.sxyy = self.sxyy - q.x * q.y * q.y;
                self.syyy = self.syyy - q.y * q.y * q.y;
                self.rebase();
            }
            None => {
                self.sxxx = T::zero();
                self.sxxy = T::zero();
                self.sxyy = T::zero();
                self.syyy = T::zero();
            }
        }
    }

    fn recompute(&mut self) {
        let count = self.moments.count();
        let stats = match self.moments.centered() {
            Some(stats) if count >= 3 => stats,
            _ => {
                self.circle = Circle::nan();
                return;
            }
        };

        let det = stats.suu * stats.svv - stats.suv * stats.suv;
        if !(det > T::epsilon().sqrt() * stats.suu * stats.svv) {
            trace!(count, "arc fit over collinear points");
            self.circle = Circle::nan();
            return;
        }

        // Third order sums about the mean, from the origin-relative raw sums.
        let n = T::count(count);
        let two = T::lit(2.0);
        let three = T::lit(3.0);
        let Vec2 { x: mx, y: my } = stats.local_mean;
        let (sxx, sxy, syy) = self.moments.second();
        let suuu = self.sxxx - three * mx * sxx + two * n * mx * mx * mx;
        let svvv = self.syyy - three * my * syy + two * n * my * my * my;
        let suvv = self.sxyy - two * my * sxy - mx * syy + two * n * mx * my * my;
        let svuu = self.sxxy - two * mx * sxy - my * sxx + two * n * my * mx * mx;

        let rhs_u = (suuu + suvv) / two;
        let rhs_v = (svvv + svuu) / two;
        let uc = (rhs_u * stats.svv - rhs_v * stats.suv) / det;
        let vc = (rhs_v * stats.suu - rhs_u * stats.suv) / det;

        let radius_sq = uc * uc + vc * vc + (stats.suu + stats.svv) / n;
        self.circle = Circle {
            center: stats.mean + Vec2::new(uc, vc),
            radius: radius_sq.sqrt(),
        };
    }

    fn squared_error(&self, p: Vec2<T>) -> T {
        self.circle.squared_error(p)
    }

    fn snap(&self, p: Vec2<T>) -> Vec2<T> {
        self.circle.snap(p)
    }

    fn count(&self) -> usize {
        self.moments.count()
    }
}
