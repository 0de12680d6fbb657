//! Geometric queries derived from a segment's current fit.

use super::{present, Segment, Shape};
use crate::error::FitError;
use crate::fit::Circle;
use crate::geom::{unit_dot, Real, Vec2};
use crate::track::PointSequence;

/// Which part of a segment a direction is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// Start of the first interval.
    Initial,
    /// End of the last interval.
    Final,
    /// The k-th interval between endpoints.
    Nth(usize),
}

impl<T: Real> Segment<T> {
    /// `(start, end)` indices of the interval a direction is taken from.
    pub fn interval_for(&self, which: End) -> Result<(usize, usize), FitError> {
        let intervals = self.intervals();
        let picked = match which {
            End::Initial => intervals.first(),
            End::Final => intervals.last(),
            End::Nth(k) => intervals.get(k),
        };
        match (picked, which) {
            (Some(&interval), _) => Ok(interval),
            (None, End::Nth(k)) if !intervals.is_empty() => Err(FitError::IndexOutOfRange {
                index: k,
                len: intervals.len(),
            }),
            (None, _) => Err(FitError::DegenerateFit("empty segment")),
        }
    }

    /// Travel direction at the requested end, scaled by the distance covered.
    ///
    /// Straight: the displacement between the interval's ends projected onto
    /// the line. Arc: the tangent at the requested end (mid-interval for
    /// `Nth`) with length equal to the arclength swept. Dwell: the raw
    /// displacement. Not normalized.
    ///
    /// The line's `angle_bias` does not scale the result; callers that want
    /// to discount poorly aligned fits read it from the fit directly.
    pub fn direction_vector<P>(&self, which: End, points: &P) -> Result<Vec2<T>, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        if !self.kind().has_fit() {
            return Err(FitError::NoFitForKind(self.kind()));
        }

        let (start, end) = self.interval_for(which)?;
        let p0 = present(start, points)?;
        let p1 = present(end, points)?;

        let direction = match &self.shape {
            Shape::Weird | Shape::Clutter => return Err(FitError::NoFitForKind(self.kind())),
            Shape::Dwell(_) => p1 - p0,
            Shape::Straight(fit) => {
                let tangent = fit.line().tangent();
                tangent * tangent.dot(p1 - p0)
            }
            Shape::Arc(fit) => {
                let circle = fit.circle();
                let sweep = sweep(&circle, start, end, points);
                let (anchor, turn) = match which {
                    End::Initial => (p0, T::zero()),
                    End::Final => (p1, T::zero()),
                    End::Nth(_) => (p0, sweep / T::lit(2.0)),
                };
                let radial = (anchor - circle.center).rotate(turn).normalize();
                let tangent = if sweep < T::zero() {
                    -radial.perp()
                } else {
                    radial.perp()
                };
                tangent * (circle.radius * sweep.abs())
            }
        };
        Ok(direction)
    }

    /// Distance covered over interval `k`.
    ///
    /// Straight-line distance between the interval's ends for kinds without
    /// a curve, distance along the line for straight segments and arclength
    /// for arcs.
    pub fn interval_distance<P>(&self, k: usize, points: &P) -> Result<T, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let (start, end) = self.interval_for(End::Nth(k))?;
        let p0 = present(start, points)?;
        let p1 = present(end, points)?;
        let distance = match &self.shape {
            Shape::Weird | Shape::Clutter | Shape::Dwell(_) => p0.distance(p1),
            Shape::Straight(fit) => (fit.parallel_coordinate(p1) - fit.parallel_coordinate(p0)).abs(),
            Shape::Arc(fit) => {
                let circle = fit.circle();
                circle.radius * sweep(&circle, start, end, points).abs()
            }
        };
        Ok(distance)
    }

    /// Distance covered over the whole segment, summed across intervals.
    pub fn distance_traversed<P>(&self, points: &P) -> Result<T, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        (0..self.intervals().len()).try_fold(T::zero(), |total, k| {
            Ok(total + self.interval_distance(k, points)?)
        })
    }

    /// Project `p` onto the fitted curve.
    ///
    /// Arcs move the point radially onto the circle and dwells collapse it
    /// onto the mean. Straight segments only correct points on the positive
    /// side of the line's normal; points on the other side come back as is.
    pub fn snap_to_line(&self, p: Vec2<T>) -> Result<Vec2<T>, FitError> {
        self.shape
            .accumulator()
            .map(|fit| fit.snap(p))
            .ok_or(FitError::NoFitForKind(self.kind()))
    }

    /// Squared distance from `p` to the fitted curve.
    pub fn squared_error(&self, p: Vec2<T>) -> Result<T, FitError> {
        self.shape
            .accumulator()
            .map(|fit| fit.squared_error(p))
            .ok_or(FitError::NoFitForKind(self.kind()))
    }

    /// Mean squared residual over the samples in the window; NaN when empty.
    pub fn mean_squared_error<P>(&self, points: &P) -> Result<T, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let fit = self
            .shape
            .accumulator()
            .ok_or(FitError::NoFitForKind(self.kind()))?;
        if self.is_empty() {
            return Ok(T::nan());
        }
        let (sum, n) = (self.lo..=self.hi())
            .filter_map(|i| points.point(i))
            .fold((T::zero(), 0usize), |(sum, n), p| {
                (sum + fit.squared_error(p), n + 1)
            });
        Ok(sum / T::count(n))
    }

    /// Alignment with an adjacent segment.
    ///
    /// Dot product of the unit directions at the ends facing each other:
    /// this segment's final direction against `other`'s initial one when
    /// this segment starts first, and the reverse otherwise. Near 1 for
    /// segments that continue each other.
    pub fn dot_with<P>(&self, other: &Segment<T>, points: &P) -> Result<T, FitError>
    where
        P: PointSequence<T> + ?Sized,
    {
        let (mine, theirs) = facing_ends(self.lo(), other.lo());
        Ok(unit_dot(
            self.direction_vector(mine, points)?,
            other.direction_vector(theirs, points)?,
        ))
    }
}

/// Ends of two segments that face each other, ordered by starting index.
pub(crate) fn facing_ends(lo: usize, other_lo: usize) -> (End, End) {
    if lo < other_lo {
        (End::Final, End::Initial)
    } else {
        (End::Initial, End::Final)
    }
}

/// Signed angle swept about the circle's center from `start` to `end`,
/// accumulated sample by sample so arcs past half a turn are measured whole.
fn sweep<T, P>(circle: &Circle<T>, start: usize, end: usize, points: &P) -> T
where
    T: Real,
    P: PointSequence<T> + ?Sized,
{
    let mut total = T::zero();
    let mut previous: Option<Vec2<T>> = None;
    for p in (start..=end).filter_map(|i| points.point(i)) {
        if let Some(q) = previous {
            total = total + circle.arc_delta_coordinate(q, p);
        }
        previous = Some(p);
    }
    total
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::segment::Kind;

    fn line_track<T: Real>() -> Vec<Option<Vec2<T>>> {
        [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]
            .iter()
            .map(|&(x, y)| Some(Vec2::new(T::lit(x), T::lit(y))))
            .collect()
    }

    /// Counter-clockwise arc around (10, 10), radius 5, from angle 0 through `span`.
    fn arc_track<T: Real>(count: usize, span: f64) -> Vec<Option<Vec2<T>>> {
        (0..count)
            .map(|i| {
                let t = span * i as f64 / (count - 1) as f64;
                Some(Vec2::new(
                    T::lit(10.0 + 5.0 * t.cos()),
                    T::lit(10.0 + 5.0 * t.sin()),
                ))
            })
            .collect()
    }

    fn straight_scenario<T: Real>(tol: f64) {
        let points = line_track::<T>();
        let segment = Segment::over(Kind::Straight, 0..=3, &points).unwrap();
        let distance = segment.distance_traversed(&points).unwrap();
        assert!((distance.as_f64() - 3.0).abs() < tol);

        let initial = segment.direction_vector(End::Initial, &points).unwrap();
        assert!(initial.x.as_f64() > 0.0);
        assert!(initial.y.as_f64().abs() < tol);
        assert!((initial.length().as_f64() - 3.0).abs() < tol);
    }

    #[test]
    fn straight_scenario_f64() {
        straight_scenario::<f64>(1e-12);
    }

    #[test]
    fn straight_scenario_f32() {
        straight_scenario::<f32>(1e-5);
    }

    fn arc_queries<T: Real>(tol: f64) {
        // Three quarters of a turn, longer than the half turn a single
        // angular difference can express.
        let points = arc_track::<T>(25, 1.5 * PI);
        let segment = Segment::over(Kind::Arc, 0..=24, &points).unwrap();
        let distance = segment.distance_traversed(&points).unwrap().as_f64();
        assert!((distance - 5.0 * 1.5 * PI).abs() < tol * 10.0, "{}", distance);

        // Starts at angle 0 going counter-clockwise: tangent is +y.
        let initial = segment.direction_vector(End::Initial, &points).unwrap();
        let unit = initial.normalize();
        assert!(unit.x.as_f64().abs() < tol);
        assert!((unit.y.as_f64() - 1.0).abs() < tol);

        // Ends at angle 3pi/2 (bottom of the circle): tangent is +x.
        let last = segment.direction_vector(End::Final, &points).unwrap().normalize();
        assert!((last.x.as_f64() - 1.0).abs() < tol);
    }

    #[test]
    fn arc_queries_f64() {
        arc_queries::<f64>(1e-9);
    }

    #[test]
    fn arc_queries_f32() {
        arc_queries::<f32>(1e-3);
    }

    #[test]
    fn endpoints_split_distance_and_direction() {
        let points = arc_track::<f64>(13, PI);
        let mut segment = Segment::over(Kind::Arc, 0..=12, &points).unwrap();
        segment.set_endpoints(vec![6], &points).unwrap();

        let first = segment.interval_distance(0, &points).unwrap();
        let second = segment.interval_distance(1, &points).unwrap();
        assert!((first - 5.0 * PI / 2.0).abs() < 1e-9);
        assert!((first + second - segment.distance_traversed(&points).unwrap()).abs() < 1e-12);

        // Midpoint of the second quarter (angle 3pi/4): tangent points up-left.
        let mid = segment.direction_vector(End::Nth(1), &points).unwrap();
        let expected = Vec2::new(-1.0, -1.0).normalize() * (5.0 * PI / 2.0);
        assert!((mid - expected).length() < 1e-9, "{:?}", mid);

        assert_eq!(
            segment.direction_vector(End::Nth(2), &points),
            Err(FitError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    fn snap_is_idempotent_for_both_curves<T: Real>(tol: f64) {
        let points = line_track::<T>();
        let straight = Segment::over(Kind::Straight, 0..=3, &points).unwrap();
        let p = Vec2::new(T::lit(1.2), T::lit(0.7));
        let once = straight.snap_to_line(p).unwrap();
        assert_eq!(straight.snap_to_line(once).unwrap(), once);

        let arc_points = arc_track::<T>(9, PI);
        let arc = Segment::over(Kind::Arc, 0..=8, &arc_points).unwrap();
        let once = arc.snap_to_line(Vec2::new(T::lit(30.0), T::lit(12.0))).unwrap();
        let twice = arc.snap_to_line(once).unwrap();
        assert!((once - twice).length().as_f64() < tol);
        let center = Vec2::new(T::lit(10.0), T::lit(10.0));
        assert!((once.distance(center).as_f64() - 5.0).abs() < tol);
    }

    #[test]
    fn snap_is_idempotent_for_both_curves_f64() {
        snap_is_idempotent_for_both_curves::<f64>(1e-9);
    }

    #[test]
    fn snap_is_idempotent_for_both_curves_f32() {
        snap_is_idempotent_for_both_curves::<f32>(1e-3);
    }

    // Straight snapping only moves points on the positive side of the normal.
    fn one_sided_snap<T: Real>(tol: f64) {
        let points = line_track::<T>();
        let segment = Segment::over(Kind::Straight, 0..=3, &points).unwrap();
        let Shape::Straight(fit) = segment.shape() else {
            panic!("straight segment without a line fit");
        };
        let normal = fit.line().normal();
        let base = Vec2::new(T::lit(1.5), T::zero());
        let positive = base + normal * T::lit(0.25);
        let negative = base - normal * T::lit(0.25);

        let snapped = segment.snap_to_line(positive).unwrap();
        assert!((snapped - base).length().as_f64() < tol);
        assert_eq!(segment.snap_to_line(negative).unwrap(), negative);
    }

    #[test]
    fn one_sided_snap_f64() {
        one_sided_snap::<f64>(1e-12);
    }

    #[test]
    fn one_sided_snap_f32() {
        one_sided_snap::<f32>(1e-6);
    }

    #[test]
    fn dot_picks_facing_ends() {
        let points = arc_track::<f64>(13, PI);
        let a = Segment::over(Kind::Arc, 0..=6, &points).unwrap();
        let b = Segment::over(Kind::Arc, 6..=12, &points).unwrap();
        assert!((a.dot_with(&b, &points).unwrap() - 1.0).abs() < 1e-9);
        assert!((b.dot_with(&a, &points).unwrap() - 1.0).abs() < 1e-9);

        // Straight through the first half against the second half's arc.
        let chord = Segment::over(Kind::Straight, 0..=6, &points).unwrap();
        let dot = chord.dot_with(&b, &points).unwrap();
        assert!((dot - (PI / 4.0).cos()).abs() < 1e-9, "{}", dot);
    }

    #[test]
    fn queries_need_a_fit_except_distance() {
        let points = line_track::<f64>();
        let clutter = Segment::over(Kind::Clutter, 0..=3, &points).unwrap();
        assert_eq!(
            clutter.direction_vector(End::Initial, &points),
            Err(FitError::NoFitForKind(Kind::Clutter))
        );
        assert!(clutter.snap_to_line(Vec2::zero()).is_err());
        assert_eq!(clutter.distance_traversed(&points).unwrap(), 3.0);
    }

    #[test]
    fn dwell_snaps_to_mean() {
        let points = line_track::<f64>();
        let dwell = Segment::over(Kind::Dwell, 0..=3, &points).unwrap();
        assert_eq!(dwell.snap_to_line(Vec2::new(9.0, 9.0)).unwrap(), Vec2::new(1.5, 0.0));
        assert!((dwell.mean_squared_error(&points).unwrap() - 1.25).abs() < 1e-12);
    }
}
