use super::{Accumulator, Moments};
use crate::geom::{Real, Vec2};

/// Stationary point fit: the mean of the included positions.
#[derive(Debug, Clone, Default)]
pub struct SpotFit<T> {
    moments: Moments<T>,
    mean: Option<Vec2<T>>,
}

impl<T: Real> SpotFit<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean position as of the last `recompute`; NaN when empty.
    pub fn mean(&self) -> Vec2<T> {
        self.mean.unwrap_or_else(Vec2::nan)
    }
}

impl<T: Real> Accumulator<T> for SpotFit<T> {
    fn add(&mut self, p: Vec2<T>) {
        self.moments.add(p);
        self.moments.rebase();
    }

    fn remove(&mut self, p: Vec2<T>) {
        self.moments.remove(p);
        self.moments.rebase();
    }

    fn recompute(&mut self) {
        self.mean = self.moments.mean();
    }

    fn squared_error(&self, p: Vec2<T>) -> T {
        (p - self.mean()).length_squared()
    }

    fn snap(&self, _p: Vec2<T>) -> Vec2<T> {
        self.mean()
    }

    fn count(&self) -> usize {
        self.moments.count()
    }
}
