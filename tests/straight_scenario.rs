use trackfit::{End, FitError, Kind, Real, Segment, SegmentArena, Shape, Track, Vec2};

fn walk<T: Real>() -> Track<T> {
    Track::new(
        "walk",
        [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]
            .iter()
            .map(|&(x, y)| Some(Vec2::new(T::lit(x), T::lit(y))))
            .collect(),
    )
}

fn horizontal_walk<T: Real>(tol: f64) -> Result<(), FitError> {
    let track = walk::<T>();
    let segment = Segment::over(Kind::Straight, 0..=3, &track)?;

    let Shape::Straight(fit) = segment.shape() else {
        panic!("straight segment without a line fit");
    };
    let line = fit.line_checked()?;
    assert!(line.a.as_f64().abs() < tol);
    assert!((line.b.as_f64().abs() - 1.0).abs() < tol);

    let distance = segment.distance_traversed(&track)?;
    assert!((distance.as_f64() - 3.0).abs() < tol);

    let initial = segment.direction_vector(End::Initial, &track)?;
    let unit = initial.normalize();
    assert!((unit.x.as_f64() - 1.0).abs() < tol);
    assert!(unit.y.as_f64().abs() < tol);
    Ok(())
}

#[test]
fn horizontal_walk_double() -> Result<(), FitError> {
    horizontal_walk::<f64>(1e-12)
}

#[test]
fn horizontal_walk_single() -> Result<(), FitError> {
    horizontal_walk::<f32>(1e-5)
}

#[test]
fn grow_track_sample_by_sample() -> Result<(), FitError> {
    let mut points = walk::<f64>().points;
    points.insert(2, None);
    points.insert(2, None);
    let track = Track::new("gappy", points);

    let mut segment = Segment::new(Kind::Straight, 0, &track)?;
    let mut next = track.points.iter().skip(1).position(Option::is_some).map(|i| i + 1);
    let mut visited = vec![0];
    while let Some(i) = next {
        visited.push(i);
        next = segment.add_right(i, &track)?;
    }
    assert_eq!(visited, vec![0, 1, 4, 5]);
    assert_eq!((segment.lo(), segment.hi()), (0, 5));
    assert!((segment.distance_traversed(&track)? - 3.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn arena_merges_by_mimicking() -> Result<(), FitError> {
    let track = walk::<f64>();
    let mut arena = SegmentArena::new();
    let head = arena.push(Segment::over(Kind::Dwell, 0..=1, &track)?);
    let tail = arena.push(Segment::over(Kind::Straight, 2..=3, &track)?);
    let whole = arena.push(Segment::over(Kind::Straight, 0..=3, &track)?);

    assert!((arena.dot(head, tail, &track)? - 1.0).abs() < 1e-12);
    arena.mimic(head, whole)?;
    let merged = arena.get(head).expect("segment just pushed");
    assert_eq!(merged.kind(), Kind::Straight);
    assert_eq!((merged.lo(), merged.hi()), (0, 3));
    Ok(())
}
