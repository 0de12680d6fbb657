//! Centroid tracks: ordered positions with gaps.

use kurbo::Rect;

use crate::geom::{Real, Vec2};

/// Read access to an ordered sequence of optional positions.
///
/// `point` must be a pure, repeatable read: segments re-read indices they
/// added earlier in order to remove them again.
pub trait PointSequence<T: Real> {
    /// Number of time indices, present or not.
    fn len(&self) -> usize;

    /// Position at `index`, or `None` for a gap or an index past the end.
    fn point(&self, index: usize) -> Option<Vec2<T>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First present index at or after `from`.
    fn next_present(&self, from: usize) -> Option<usize> {
        (from..self.len()).find(|&i| self.point(i).is_some())
    }

    /// Last present index at or before `from`.
    fn prev_present(&self, from: usize) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let start = from.min(self.len() - 1);
        (0..=start).rev().find(|&i| self.point(i).is_some())
    }
}

impl<T: Real> PointSequence<T> for [Option<Vec2<T>>] {
    fn len(&self) -> usize {
        <[Option<Vec2<T>>]>::len(self)
    }

    fn point(&self, index: usize) -> Option<Vec2<T>> {
        self.get(index).copied().flatten()
    }
}

impl<T: Real> PointSequence<T> for Vec<Option<Vec2<T>>> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn point(&self, index: usize) -> Option<Vec2<T>> {
        self.as_slice().get(index).copied().flatten()
    }
}

/// One animal's centroid track.
#[derive(Debug, Clone, Default)]
pub struct Track<T> {
    /// Name used in reports (usually the source file).
    pub name: String,
    pub points: Vec<Option<Vec2<T>>>,
}

impl<T: Real> Track<T> {
    pub fn new(name: impl Into<String>, points: Vec<Option<Vec2<T>>>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Number of indices that carry a position.
    pub fn present_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    /// Same track in another precision.
    pub fn cast<U: Real>(&self) -> Track<U> {
        Track {
            name: self.name.clone(),
            points: self.points.iter().map(|p| p.map(Vec2::cast)).collect(),
        }
    }

    /// Axis-aligned bounds of the present positions.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut present = self.points.iter().flatten();
        let first = present.next()?;
        let seed = Rect::from_points(
            kurbo::Point::from(first.cast::<f64>()),
            kurbo::Point::from(first.cast::<f64>()),
        );
        Some(present.fold(seed, |rect, p| {
            rect.union_pt(kurbo::Point::from(p.cast::<f64>()))
        }))
    }
}

impl<T: Real> PointSequence<T> for Track<T> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn point(&self, index: usize) -> Option<Vec2<T>> {
        self.points.point(index)
    }
}
