//! Total least squares line fit.
//!
//! The line is kept in unit normal form `a·x + b·y + c = 0` with
//! `a² + b² = 1`, so the algebraic residual is the signed perpendicular
//! distance. The direction comes from the principal axis of the 2x2
//! covariance of the included points.

use tracing::trace;

use super::{Accumulator, Moments};
use crate::error::FitError;
use crate::geom::{Real, Vec2};

/// Fitted line parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line<T> {
    pub a: T,
    pub b: T,
    pub c: T,
    /// Centroid of the fitted points; parallel coordinates are measured from here.
    pub anchor: Vec2<T>,
    /// Share of the variance lying across the line, in [0, 0.5].
    /// 0 for collinear points, 0.5 for an isotropic cloud.
    pub angle_bias: T,
}

impl<T: Real> Line<T> {
    pub fn nan() -> Self {
        Self {
            a: T::nan(),
            b: T::nan(),
            c: T::nan(),
            anchor: Vec2::nan(),
            angle_bias: T::nan(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }

    /// Unit normal `(a, b)`.
    pub fn normal(&self) -> Vec2<T> {
        Vec2::new(self.a, self.b)
    }

    /// Unit direction along the line, the normal turned a quarter clockwise.
    pub fn tangent(&self) -> Vec2<T> {
        Vec2::new(self.b, -self.a)
    }

    /// Signed perpendicular offset of `p`, positive on the side the normal points to.
    pub fn offset(&self, p: Vec2<T>) -> T {
        self.normal().dot(p - self.anchor)
    }

    /// Position of the projection of `p` along the line.
    pub fn parallel_coordinate(&self, p: Vec2<T>) -> T {
        self.tangent().dot(p - self.anchor)
    }

    /// Pull a stray point back onto the line.
    ///
    /// Only points with a positive offset are moved; points on the other
    /// side are returned unchanged.
    pub fn snap(&self, p: Vec2<T>) -> Vec2<T> {
        let off = self.offset(p);
        if off > T::zero() {
            p - self.normal() * off
        } else {
            p
        }
    }
}

/// Incremental line fit.
#[derive(Debug, Clone)]
pub struct LineFit<T> {
    moments: Moments<T>,
    line: Line<T>,
}

impl<T: Real> Default for LineFit<T> {
    fn default() -> Self {
        Self {
            moments: Moments::default(),
            line: Line::nan(),
        }
    }
}

impl<T: Real> LineFit<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters as of the last `recompute`; NaN when degenerate.
    pub fn line(&self) -> Line<T> {
        self.line
    }

    pub fn line_checked(&self) -> Result<Line<T>, FitError> {
        if self.line.is_valid() {
            Ok(self.line)
        } else {
            Err(FitError::DegenerateFit("line needs two distinct points"))
        }
    }

    pub fn parallel_coordinate(&self, p: Vec2<T>) -> T {
        self.line.parallel_coordinate(p)
    }
}

impl<T: Real> Accumulator<T> for LineFit<T> {
    fn add(&mut self, p: Vec2<T>) {
        self.moments.add(p);
        self.moments.rebase();
    }

    fn remove(&mut self, p: Vec2<T>) {
        self.moments.remove(p);
        self.moments.rebase();
    }

    fn recompute(&mut self) {
        let n = self.moments.count();
        let stats = match self.moments.centered() {
            Some(stats) if n >= 2 => stats,
            _ => {
                self.line = Line::nan();
                return;
            }
        };

        let total = stats.suu + stats.svv;
        if !(total > T::zero()) {
            trace!(n, "line fit over coincident points");
            self.line = Line::nan();
            return;
        }

        let two = T::lit(2.0);
        let theta = (two * stats.suv).atan2(stats.suu - stats.svv) / two;
        let (sin, cos) = theta.sin_cos();
        let (a, b) = (-sin, cos);

        let spread = ((stats.suu - stats.svv) / two).hypot(stats.suv);
        let minor = (total / two - spread).max(T::zero());

        let anchor = stats.mean;
        self.line = Line {
            a,
            b,
            c: -(a * anchor.x + b * anchor.y),
            anchor,
            angle_bias: minor / total,
        };
    }

    fn squared_error(&self, p: Vec2<T>) -> T {
        let off = self.line.offset(p);
        off * off
    }

    fn snap(&self, p: Vec2<T>) -> Vec2<T> {
        self.line.snap(p)
    }

    fn count(&self) -> usize {
        self.moments.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fixtures::{close, pts};

    fn fitted<T: Real>(points: &[Vec2<T>]) -> LineFit<T> {
        let mut fit = LineFit::new();
        for &p in points {
            fit.add(p);
        }
        fit.recompute();
        fit
    }

    fn perfect_line<T: Real>(tol: f64) {
        let points = pts::<T>(&[(1.0, 1.0), (2.0, 3.0), (3.0, 5.0), (4.0, 7.0)]);
        let fit = fitted(&points);
        let line = fit.line();
        assert!(close(line.a * line.a + line.b * line.b, T::one(), tol));
        for &p in &points {
            assert!(close(fit.squared_error(p), T::zero(), tol));
        }
        let beyond = Vec2::new(T::lit(10.0), T::lit(19.0));
        assert!(close(fit.squared_error(beyond), T::zero(), tol * 100.0));
        assert!(close(line.angle_bias, T::zero(), tol));

        let coords: Vec<T> = points.iter().map(|&p| fit.parallel_coordinate(p)).collect();
        let increasing = coords.windows(2).all(|w| w[1] > w[0]);
        let decreasing = coords.windows(2).all(|w| w[1] < w[0]);
        assert!(increasing || decreasing);
        let step = (coords[1] - coords[0]).abs();
        assert!(close(step, T::lit(5.0_f64.sqrt()), tol * 10.0));
    }

    #[test]
    fn perfect_line_f64() {
        perfect_line::<f64>(1e-10);
    }

    #[test]
    fn perfect_line_f32() {
        perfect_line::<f32>(1e-4);
    }

    #[test]
    fn horizontal_line_has_vertical_normal() {
        let fit = fitted(&pts::<f64>(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]));
        let line = fit.line();
        assert!(line.a.abs() < 1e-12);
        assert!((line.b.abs() - 1.0).abs() < 1e-12);
        assert!(line.c.abs() < 1e-12);
    }

    fn add_then_remove_restores_parameters<T: Real>(tol: f64) {
        let base = pts::<T>(&[(0.0, 0.1), (1.0, -0.2), (2.0, 0.3), (3.0, 0.0), (4.0, 0.2)]);
        let mut fit = fitted(&base);
        let before = fit.line();
        let stray = Vec2::new(T::lit(2.5), T::lit(9.0));
        fit.add(stray);
        fit.recompute();
        assert!(!close(fit.line().angle_bias, before.angle_bias, 1e-3));
        fit.remove(stray);
        fit.recompute();
        let after = fit.line();
        assert!(close(after.a, before.a, tol));
        assert!(close(after.b, before.b, tol));
        assert!(close(after.c, before.c, tol));
        assert!(close(after.angle_bias, before.angle_bias, tol));
    }

    #[test]
    fn add_then_remove_restores_parameters_f64() {
        add_then_remove_restores_parameters::<f64>(1e-9);
    }

    #[test]
    fn add_then_remove_restores_parameters_f32() {
        add_then_remove_restores_parameters::<f32>(1e-4);
    }

    #[test]
    fn degenerate_inputs_give_nan() {
        let mut fit = LineFit::<f64>::new();
        fit.recompute();
        assert!(!fit.line().is_valid());
        fit.add(Vec2::new(1.0, 1.0));
        fit.recompute();
        assert!(fit.line().a.is_nan());
        fit.add(Vec2::new(1.0, 1.0));
        fit.recompute();
        assert_eq!(
            fit.line_checked(),
            Err(FitError::DegenerateFit("line needs two distinct points"))
        );
    }

    // Only points on the positive-normal side are pulled onto the line.
    #[test]
    fn snap_is_one_sided() {
        let fit = fitted(&pts::<f64>(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]));
        let line = fit.line();
        let up = Vec2::new(1.5, 0.0) + line.normal() * 2.0;
        let down = Vec2::new(1.5, 0.0) - line.normal() * 2.0;

        let snapped = fit.snap(up);
        assert!(line.offset(snapped).abs() < 1e-12);
        assert!((snapped.x - 1.5).abs() < 1e-12);
        assert!((fit.snap(snapped) - snapped).length() < 1e-12);

        assert_eq!(fit.snap(down), down);
    }
}
