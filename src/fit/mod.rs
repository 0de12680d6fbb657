//! Incremental least-squares fits.
//!
//! 1. Spot: mean position of a dwell
//! 2. Line: total least squares line in unit normal form
//! 3. Arc: algebraic (Kasa) circle fit
//!
//! Each fit keeps running moment sums, so adding or removing a point and
//! recomputing the parameters are all O(1). Sums are taken relative to a
//! local origin that follows the points: it starts at the first point added
//! and jumps to the mean whenever the mean drifts further from it than the
//! points are spread. A window rolling along a long track therefore never
//! accumulates sums much larger than its own spread, which keeps single
//! precision usable.

pub mod arc;
pub mod line;
pub mod spot;

pub use arc::{ArcFit, Circle};
pub use line::{Line, LineFit};
pub use spot::SpotFit;

use crate::geom::{Real, Vec2};

/// Running state of one geometric fit.
///
/// `add` and `remove` only touch the sums; call `recompute` before reading
/// parameters. `remove` must only be given a point that was added and not
/// yet removed; violating this silently corrupts the fit.
pub trait Accumulator<T: Real> {
    fn add(&mut self, p: Vec2<T>);

    fn remove(&mut self, p: Vec2<T>);

    /// Refresh cached parameters from the sums. Degenerate inputs yield NaN.
    fn recompute(&mut self);

    /// Squared distance from `p` to the fitted primitive.
    fn squared_error(&self, p: Vec2<T>) -> T;

    /// Project `p` onto the fitted primitive.
    fn snap(&self, p: Vec2<T>) -> Vec2<T>;

    /// Number of points currently included.
    fn count(&self) -> usize;
}

/// Zeroth, first and second order sums shared by all fits.
#[derive(Debug, Clone, Default)]
pub(crate) struct Moments<T> {
    origin: Vec2<T>,
    n: usize,
    sx: T,
    sy: T,
    sxx: T,
    sxy: T,
    syy: T,
}

/// Centered statistics derived from [`Moments`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Centered<T> {
    /// Mean relative to the origin.
    pub local_mean: Vec2<T>,
    /// Absolute mean.
    pub mean: Vec2<T>,
    pub suu: T,
    pub suv: T,
    pub svv: T,
}

impl<T: Real> Moments<T> {
    pub fn count(&self) -> usize {
        self.n
    }

    pub fn local(&self, p: Vec2<T>) -> Vec2<T> {
        p - self.origin
    }

    /// Include `p`; returns its origin-relative position.
    pub fn add(&mut self, p: Vec2<T>) -> Vec2<T> {
        if self.n == 0 {
            *self = Self {
                origin: p,
                ..Self::default()
            };
        }
        let q = self.local(p);
        self.n += 1;
        self.sx = self.sx + q.x;
        self.sy = self.sy + q.y;
        self.sxx = self.sxx + q.x * q.x;
        self.sxy = self.sxy + q.x * q.y;
        self.syy = self.syy + q.y * q.y;
        q
    }

    /// Exclude `p`; returns its origin-relative position, or `None` when the
    /// fit became empty and its sums were reset.
    pub fn remove(&mut self, p: Vec2<T>) -> Option<Vec2<T>> {
        debug_assert!(self.n > 0, "remove from an empty fit");
        self.n = self.n.saturating_sub(1);
        if self.n == 0 {
            let origin = self.origin;
            *self = Self {
                origin,
                ..Self::default()
            };
            return None;
        }
        let q = self.local(p);
        self.sx = self.sx - q.x;
        self.sy = self.sy - q.y;
        self.sxx = self.sxx - q.x * q.x;
        self.sxy = self.sxy - q.x * q.y;
        self.syy = self.syy - q.y * q.y;
        Some(q)
    }

    pub fn mean(&self) -> Option<Vec2<T>> {
        if self.n == 0 {
            return None;
        }
        let n = T::count(self.n);
        Some(self.origin + Vec2::new(self.sx / n, self.sy / n))
    }

    /// Raw first order sums (origin-relative): `(sx, sy)`.
    pub fn first(&self) -> (T, T) {
        (self.sx, self.sy)
    }

    /// Raw second order sums (origin-relative): `(sxx, sxy, syy)`.
    pub fn second(&self) -> (T, T, T) {
        (self.sxx, self.sxy, self.syy)
    }

    /// Origin-relative mean, when it lies further from the origin than the
    /// RMS spread of the points about it.
    pub fn drift(&self) -> Option<Vec2<T>> {
        if self.n == 0 {
            return None;
        }
        let n = T::count(self.n);
        let mean = Vec2::new(self.sx / n, self.sy / n);
        let offset = mean.length_squared();
        let spread = ((self.sxx + self.syy) / n - offset).max(T::zero());
        if offset > spread {
            Some(mean)
        } else {
            None
        }
    }

    /// Move the origin by `d`, rewriting the sums for the new origin.
    pub fn shift(&mut self, d: Vec2<T>) {
        let n = T::count(self.n);
        let two = T::lit(2.0);
        let (sx, sy) = (self.sx, self.sy);
        self.sxx = self.sxx - two * d.x * sx + n * d.x * d.x;
        self.sxy = self.sxy - d.x * sy - d.y * sx + n * d.x * d.y;
        self.syy = self.syy - two * d.y * sy + n * d.y * d.y;
        self.sx = sx - n * d.x;
        self.sy = sy - n * d.y;
        self.origin = self.origin + d;
    }

    /// Re-anchor on the mean if it has drifted.
    pub fn rebase(&mut self) {
        if let Some(d) = self.drift() {
            self.shift(d);
        }
    }

    pub fn centered(&self) -> Option<Centered<T>> {
        if self.n == 0 {
            return None;
        }
        let n = T::count(self.n);
        let local_mean = Vec2::new(self.sx / n, self.sy / n);
        Some(Centered {
            local_mean,
            mean: self.origin + local_mean,
            suu: (self.sxx - self.sx * local_mean.x).max(T::zero()),
            suv: self.sxy - self.sx * local_mean.y,
            svv: (self.syy - self.sy * local_mean.y).max(T::zero()),
        })
    }
}
