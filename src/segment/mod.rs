//! Segments: a classified index window over a track plus its fit.
//!
//! The window only ever covers present samples at its ends; gaps inside are
//! skipped transparently as it grows or shrinks one sample at a time.

mod arena;
mod query;

pub use arena::{SegmentArena, SegmentId};
pub use query::End;

use std::fmt;
use std::ops::RangeInclusive;

use tracing::trace;

use crate::error::FitError;
use crate::fit::{Accumulator, ArcFit, LineFit, SpotFit};
use crate::geom::{Real, Vec2};
use crate::track::PointSequence;

/// Movement classification of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Unclassified; no fit.
    Weird,
    /// Stationary; fitted by its mean position.
    Dwell,
    /// Noisy local movement; no fit.
    Clutter,
    /// Straight travel; fitted by a line.
    Straight,
    /// Turning travel; fitted by a circular arc.
    Arc,
}

impl Kind {
    pub const ALL: [Kind; 5] = [
        Kind::Weird,
        Kind::Dwell,
        Kind::Clutter,
        Kind::Straight,
        Kind::Arc,
    ];

    pub fn has_fit(self) -> bool {
        !matches!(self, Kind::Weird | Kind::Clutter)
    }

    /// Straight and arc segments may carry direction-change endpoints.
    pub fn is_line_like(self) -> bool {
        matches!(self, Kind::Straight | Kind::Arc)
    }

    /// Fewest points for which the fit is defined.
    pub fn min_points(self) -> usize {
        match self {
            Kind::Straight => 2,
            Kind::Arc => 3,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Weird => "weird",
            Kind::Dwell => "dwell",
            Kind::Clutter => "clutter",
            Kind::Straight => "straight",
            Kind::Arc => "arc",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A kind together with the fit it owns.
///
/// Kind and fit cannot disagree: the fit lives inside the variant.
#[derive(Debug, Clone)]
pub enum Shape<T> {
    Weird,
    Clutter,
    Dwell(SpotFit<T>),
    Straight(LineFit<T>),
    Arc(ArcFit<T>),
}

impl<T: Real> Shape<T> {
    /// Fresh shape of `kind` with an empty fit.
    pub fn empty(kind: Kind) -> Self {
        match kind {
            Kind::Weird => Shape::Weird,
            Kind::Clutter => Shape::Clutter,
            Kind::Dwell => Shape::Dwell(SpotFit::new()),
            Kind::Straight => Shape::Straight(LineFit::new()),
            Kind::Arc => Shape::Arc(ArcFit::new()),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Shape::Weird => Kind::Weird,
            Shape::Clutter => Kind::Clutter,
            Shape::Dwell(_) => Kind::Dwell,
            Shape::Straight(_) => Kind::Straight,
            Shape::Arc(_) => Kind::Arc,
        }
    }

    pub fn accumulator(&self) -> Option<&dyn Accumulator<T>> {
        match self {
            Shape::Weird | Shape::Clutter => None,
            Shape::Dwell(fit) => Some(fit),
            Shape::Straight(fit) => Some(fit),
            Shape::Arc(fit) => Some(fit),
        }
    }

    pub fn accumulator_mut(&mut self) -> Option<&mut dyn Accumulator<T>> {
        match self {
            Shape::Weird | Shape::Clutter => None,
            Shape::Dwell(fit) => Some(fit),
            Shape::Straight(fit) => Some(fit),
            Shape::Arc(fit) => Some(fit),
        }
    }

    fn require_mut(&mut self) -> Result<&mut dyn Accumulator<T>, FitError> {
        let kind = self.kind();
        self.accumulator_mut().ok_or(FitError::NoFitForKind(kind))
    }
}

/// A contiguous, classified window `[lo, hi]` of a track.
#[derive(Debug, Clone)]
pub struct Segment<T> {
    shape: Shape<T>,
    lo: usize,
    /// One past `hi`; equal to `lo` when the window is empty.
    end: usize,
    endpoints: Option<Vec<usize>>,
    children: Option<Vec<SegmentId>>,
}

impl<T: Real> Segment<T> {
    /// Segment of `kind` over the single sample at `index`.
    pub fn new<P>(kind: Kind, index: usize, points: &P) -> Result<Self, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        Self::over(kind, index..=index, points)
    }

    /// Segment of `kind` over every present sample in `range`.
    ///
    /// The window is trimmed inward to the first and last present samples.
    pub fn over<P>(kind: Kind, range: RangeInclusive<usize>, points: &P) -> Result<Self, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let (start, stop) = range.into_inner();
        check_index::<T, P>(stop, points)?;
        let lo = points
            .next_present(start)
            .filter(|&i| i <= stop)
            .ok_or(FitError::InvalidPoint { index: start })?;
        let hi = points.prev_present(stop).unwrap_or(lo);

        let mut shape = Shape::empty(kind);
        if let Some(fit) = shape.accumulator_mut() {
            for p in (lo..=hi).filter_map(|i| points.point(i)) {
                fit.add(p);
            }
            fit.recompute();
        }

        Ok(Self {
            shape,
            lo,
            end: hi + 1,
            endpoints: None,
            children: None,
        })
    }

    pub fn kind(&self) -> Kind {
        self.shape.kind()
    }

    pub fn shape(&self) -> &Shape<T> {
        &self.shape
    }

    pub fn lo(&self) -> usize {
        self.lo
    }

    /// Last included index. Only meaningful when the segment is not empty.
    pub fn hi(&self) -> usize {
        self.end.saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.lo
    }

    /// Number of indices spanned, gaps included.
    pub fn size(&self) -> usize {
        self.end.saturating_sub(self.lo)
    }

    /// Number of samples in the fit, or `None` for kinds without one.
    pub fn fitted_count(&self) -> Option<usize> {
        self.shape.accumulator().map(|fit| fit.count())
    }

    pub fn endpoints(&self) -> &[usize] {
        self.endpoints.as_deref().unwrap_or(&[])
    }

    pub fn children(&self) -> Option<&[SegmentId]> {
        self.children.as_deref()
    }

    /// Replace this segment's kind, fit, window and endpoints with copies
    /// of `other`'s.
    ///
    /// Children are not copied. A segment with children keeps its window
    /// fixed, so it cannot mimic.
    pub fn mimic(&mut self, other: &Segment<T>) -> Result<(), FitError> {
        self.check_window_op()?;
        self.shape.clone_from(&other.shape);
        self.lo = other.lo;
        self.end = other.end;
        self.endpoints.clone_from(&other.endpoints);
        Ok(())
    }

    /// Rebuild the segment as `kind` over its current window.
    ///
    /// Endpoints survive only when the new kind is line-like.
    pub fn reclassify<P>(&mut self, kind: Kind, points: &P) -> Result<(), FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        if self.is_empty() {
            self.shape = Shape::empty(kind);
        } else {
            self.shape = Self::over(kind, self.lo..=self.hi(), points)?.shape;
        }
        if !kind.is_line_like() {
            self.endpoints = None;
        }
        Ok(())
    }

    /// Mark interior direction changes.
    ///
    /// Each endpoint must be a present sample strictly inside the window, in
    /// increasing order. An empty list clears the endpoints.
    pub fn set_endpoints<P>(&mut self, endpoints: Vec<usize>, points: &P) -> Result<(), FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let kind = self.kind();
        if !kind.is_line_like() {
            return Err(FitError::NotLineLike(kind));
        }
        if endpoints.is_empty() {
            self.endpoints = None;
            return Ok(());
        }
        let inside = endpoints.iter().all(|&e| e > self.lo && e < self.hi());
        let increasing = endpoints.windows(2).all(|w| w[0] < w[1]);
        if self.is_empty() || !inside || !increasing {
            return Err(FitError::InvalidEndpoints);
        }
        if let Some(&index) = endpoints.iter().find(|&&e| points.point(e).is_none()) {
            return Err(FitError::InvalidPoint { index });
        }
        self.endpoints = Some(endpoints);
        Ok(())
    }

    /// Consecutive `(start, end)` index pairs split at the endpoints.
    pub fn intervals(&self) -> Vec<(usize, usize)> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut bounds = Vec::with_capacity(self.endpoints().len() + 2);
        bounds.push(self.lo);
        bounds.extend_from_slice(self.endpoints());
        bounds.push(self.hi());
        bounds.windows(2).map(|w| (w[0], w[1])).collect()
    }

    pub(crate) fn set_children(&mut self, children: Option<Vec<SegmentId>>) {
        self.children = children;
    }

    // ── Window maintenance ───────────────────────────────

    /// Extend the window to `index` on the right.
    ///
    /// `index` must be the first present sample past `hi`; an empty window
    /// accepts any present sample. Returns the next present index after
    /// `index`, or `None` past the end.
    pub fn add_right<P>(&mut self, index: usize, points: &P) -> Result<Option<usize>, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        self.check_window_op()?;
        let p = present(index, points)?;
        self.check_adjacent_right(index, points)?;
        let fit = self.shape.require_mut()?;
        fit.add(p);
        fit.recompute();
        if self.is_empty() {
            self.lo = index;
        }
        self.end = index + 1;
        trace!(lo = self.lo, hi = index, "add right");
        Ok(points.next_present(index + 1))
    }

    /// Extend the window to `index` on the left.
    ///
    /// `index` must be the last present sample before `lo`; an empty window
    /// accepts any present sample. Returns the previous present index before
    /// `index`, or `None` past the start.
    pub fn add_left<P>(&mut self, index: usize, points: &P) -> Result<Option<usize>, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        self.check_window_op()?;
        let p = present(index, points)?;
        let expected = if self.is_empty() {
            Some(index)
        } else {
            self.lo.checked_sub(1).and_then(|i| points.prev_present(i))
        };
        if expected != Some(index) {
            return Err(FitError::NotAdjacent { index, expected });
        }
        let fit = self.shape.require_mut()?;
        fit.add(p);
        fit.recompute();
        if self.is_empty() {
            self.end = index + 1;
        }
        self.lo = index;
        trace!(lo = index, hi = self.hi(), "add left");
        Ok(index.checked_sub(1).and_then(|i| points.prev_present(i)))
    }

    /// Drop the sample at `hi`, retreating over any gap before it.
    pub fn sub_right<P>(&mut self, points: &P) -> Result<(), FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        self.check_window_op()?;
        let fit = self.shape.require_mut()?;
        if self.end <= self.lo {
            return Ok(());
        }
        let hi = self.end - 1;
        fit.remove(present(hi, points)?);
        fit.recompute();

        let mut end = hi;
        while end > self.lo && points.point(end - 1).is_none() {
            end -= 1;
        }
        self.end = end;
        self.prune_endpoints();
        trace!(lo = self.lo, end, "sub right");
        Ok(())
    }

    /// Drop the sample at `lo`, advancing over any gap after it.
    pub fn sub_left<P>(&mut self, points: &P) -> Result<(), FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        self.check_window_op()?;
        let fit = self.shape.require_mut()?;
        if self.end <= self.lo {
            return Ok(());
        }
        fit.remove(present(self.lo, points)?);
        fit.recompute();

        let mut lo = self.lo + 1;
        while lo < self.end && points.point(lo).is_none() {
            lo += 1;
        }
        self.lo = lo;
        self.prune_endpoints();
        trace!(lo, end = self.end, "sub left");
        Ok(())
    }

    /// Slide the window one sample to the right: `sub_left` then `add_right`.
    pub fn shift_right<P>(&mut self, index: usize, points: &P) -> Result<Option<usize>, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        self.check_window_op()?;
        present(index, points)?;
        self.check_adjacent_right(index, points)?;
        self.sub_left(points)?;
        self.add_right(index, points)
    }

    fn check_adjacent_right<P>(&self, index: usize, points: &P) -> Result<(), FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        if self.is_empty() {
            return Ok(());
        }
        let expected = points.next_present(self.end);
        if expected != Some(index) {
            return Err(FitError::NotAdjacent { index, expected });
        }
        Ok(())
    }

    fn check_window_op(&self) -> Result<(), FitError> {
        if self.children.is_some() {
            return Err(FitError::InvalidChildren("window of a parent segment is fixed"));
        }
        Ok(())
    }

    fn prune_endpoints(&mut self) {
        let (lo, hi, empty) = (self.lo, self.hi(), self.is_empty());
        if let Some(endpoints) = &mut self.endpoints {
            endpoints.retain(|&e| !empty && e > lo && e < hi);
            if endpoints.is_empty() {
                self.endpoints = None;
            }
        }
    }
}

fn check_index<T, P>(index: usize, points: &P) -> Result<(), FitError>
where
    T: Real,
    P: PointSequence<T> + ?Sized,
{
    if index >= points.len() {
        return Err(FitError::IndexOutOfRange {
            index,
            len: points.len(),
        });
    }
    Ok(())
}

pub(crate) fn present<T, P>(index: usize, points: &P) -> Result<Vec2<T>, FitError>
where
    T: Real,
    P: PointSequence<T> + ?Sized,
{
    check_index::<T, P>(index, points)?;
    points.point(index).ok_or(FitError::InvalidPoint { index })
}
