//! Arena of segments linked by index.
//!
//! Parents refer to their children by [`SegmentId`], so replacing a
//! segment's state or regrouping siblings never aliases a live fit.

use tracing::debug;

use super::query::facing_ends;
use super::{present, End, Segment};
use crate::error::FitError;
use crate::geom::{unit_dot, Real, Vec2};
use crate::track::PointSequence;

/// Handle to a segment stored in a [`SegmentArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(usize);

impl SegmentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owner of every segment of one track.
///
/// Each segment is held by at most one parent. While it is held, its window
/// is frozen: `get_mut` and `mimic` refuse it until the parent releases it.
#[derive(Debug, Clone)]
pub struct SegmentArena<T> {
    segments: Vec<Segment<T>>,
    parents: Vec<Option<SegmentId>>,
}

impl<T> Default for SegmentArena<T> {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            parents: Vec::new(),
        }
    }
}

impl<T: Real> SegmentArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `segment`. Child links it may carry from another arena are dropped.
    pub fn push(&mut self, mut segment: Segment<T>) -> SegmentId {
        segment.set_children(None);
        self.segments.push(segment);
        self.parents.push(None);
        SegmentId(self.segments.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment<T>> {
        self.segments.get(id.0)
    }

    /// Mutable access to a segment that no parent holds.
    pub fn get_mut(&mut self, id: SegmentId) -> Result<&mut Segment<T>, FitError> {
        self.check_free(id)?;
        self.slot_mut(id)
    }

    /// The segment holding `id` as a child, if any.
    pub fn parent(&self, id: SegmentId) -> Option<SegmentId> {
        self.parents.get(id.0).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &Segment<T>)> {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, segment)| (SegmentId(i), segment))
    }

    fn slot(&self, id: SegmentId) -> Result<&Segment<T>, FitError> {
        self.segments.get(id.0).ok_or(FitError::IndexOutOfRange {
            index: id.0,
            len: self.segments.len(),
        })
    }

    fn slot_mut(&mut self, id: SegmentId) -> Result<&mut Segment<T>, FitError> {
        let len = self.segments.len();
        self.segments
            .get_mut(id.0)
            .ok_or(FitError::IndexOutOfRange { index: id.0, len })
    }

    fn check_free(&self, id: SegmentId) -> Result<(), FitError> {
        self.slot(id)?;
        if self.parent(id).is_some() {
            return Err(FitError::InvalidChildren("segment is held by a parent"));
        }
        Ok(())
    }

    /// Overwrite `dst` with a copy of `src`, discarding `dst`'s own fit.
    ///
    /// `dst` must be neither held by a parent nor a parent itself.
    pub fn mimic(&mut self, dst: SegmentId, src: SegmentId) -> Result<(), FitError> {
        let copy = self.slot(src)?.clone();
        self.check_free(dst)?;
        debug!(
            dst = dst.0,
            src = src.0,
            kind = %copy.kind(),
            "segment mimics sibling"
        );
        self.slot_mut(dst)?.mimic(&copy)
    }

    /// Make `children` the fine subdivision of `parent`, replacing any
    /// children it already has.
    ///
    /// Children must be non-empty, in order, held by no other parent, and
    /// cover the parent's window exactly with no present sample left
    /// between neighbours.
    pub fn adopt<P>(
        &mut self,
        parent: SegmentId,
        children: &[SegmentId],
        points: &P,
    ) -> Result<(), FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let whole = self.slot(parent)?;
        let (first, last) = match (children.first(), children.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(FitError::InvalidChildren("no children given")),
        };
        if whole.is_empty() {
            return Err(FitError::InvalidChildren("parent is empty"));
        }
        for (k, &child) in children.iter().enumerate() {
            if self.slot(child)?.is_empty() {
                return Err(FitError::InvalidChildren("child is empty"));
            }
            if child == parent || self.descends_from(parent, child) {
                return Err(FitError::InvalidChildren("segment cannot adopt an ancestor"));
            }
            if self.parent(child).is_some_and(|p| p != parent) || children[..k].contains(&child) {
                return Err(FitError::InvalidChildren("child is already held"));
            }
        }
        if self.slot(first)?.lo() != whole.lo() || self.slot(last)?.hi() != whole.hi() {
            return Err(FitError::InvalidChildren("children do not cover the parent"));
        }
        for pair in children.windows(2) {
            let left = self.slot(pair[0])?;
            let right = self.slot(pair[1])?;
            let next = points.next_present(left.hi() + 1);
            if right.lo() <= left.hi() || next != Some(right.lo()) {
                return Err(FitError::InvalidChildren("children are not contiguous"));
            }
        }

        debug!(parent = parent.0, children = children.len(), "segment adopts children");
        self.release(parent)?;
        for &child in children {
            self.parents[child.0] = Some(parent);
        }
        self.slot_mut(parent)?.set_children(Some(children.to_vec()));
        Ok(())
    }

    /// Detach the children of `parent`, returning them.
    pub fn release(&mut self, parent: SegmentId) -> Result<Option<Vec<SegmentId>>, FitError> {
        let segment = self.slot_mut(parent)?;
        let children = segment.children().map(<[SegmentId]>::to_vec);
        segment.set_children(None);
        for child in children.iter().flatten() {
            self.parents[child.0] = None;
        }
        Ok(children)
    }

    /// Whether `node` lies somewhere below `root`.
    fn descends_from(&self, node: SegmentId, root: SegmentId) -> bool {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(children) = self.get(id).and_then(Segment::children) {
                if children.contains(&node) {
                    return true;
                }
                stack.extend_from_slice(children);
            }
        }
        false
    }

    /// Distance traversed by `id`.
    ///
    /// With children, their distances are summed together with the straight
    /// hop from each child's last sample to the next child's first, so the
    /// total matches a segment whose endpoints split it at the same places.
    pub fn distance_traversed<P>(&self, id: SegmentId, points: &P) -> Result<T, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let segment = self.slot(id)?;
        let Some(children) = segment.children() else {
            return segment.distance_traversed(points);
        };
        let mut total = T::zero();
        for (k, &child) in children.iter().enumerate() {
            total = total + self.distance_traversed(child, points)?;
            if let Some(&next) = children.get(k + 1) {
                let from = present(self.slot(child)?.hi(), points)?;
                let to = present(self.slot(next)?.lo(), points)?;
                total = total + from.distance(to);
            }
        }
        Ok(total)
    }
    /// Direction of `id` at `which`, taken from the matching child when it
    /// has children: the first child for `Initial`, the last for `Final` and
    /// child `k` for `Nth(k)`.
    pub fn direction_vector<P>(
        &self,
        id: SegmentId,
        which: End,
        points: &P,
    ) -> Result<Vec2<T>, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let segment = self.slot(id)?;
        let Some(children) = segment.children() else {
            return segment.direction_vector(which, points);
        };
        let (child, inner) = match which {
            End::Initial => (children.first(), End::Initial),
            End::Final => (children.last(), End::Final),
            End::Nth(k) => (children.get(k), End::Nth(0)),
        };
        let child = child.copied().ok_or(FitError::IndexOutOfRange {
            index: match which {
                End::Nth(k) => k,
                _ => 0,
            },
            len: children.len(),
        })?;
        self.direction_vector(child, inner, points)
    }

    /// Alignment of two adjacent segments at their facing ends.
    pub fn dot<P>(&self, a: SegmentId, b: SegmentId, points: &P) -> Result<T, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let (end_a, end_b) = facing_ends(self.slot(a)?.lo(), self.slot(b)?.lo());
        Ok(unit_dot(
            self.direction_vector(a, end_a, points)?,
            self.direction_vector(b, end_b, points)?,
        ))
    }
}
