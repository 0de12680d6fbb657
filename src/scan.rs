//! Rolling-window fit quality along a track.
//!
//! A fixed number of present samples slides through the track one sample at
//! a time using `shift_right`, so each step costs O(1) fit work plus the
//! residual sum over the window. This is the raw signal a classifier
//! thresholds to decide where dwells, straight runs and turns lie.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::FitError;
use crate::geom::Real;
use crate::segment::{Kind, Segment, Shape};
use crate::track::{PointSequence, Track};

/// Fit summary for one window position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFit<T> {
    pub lo: usize,
    pub hi: usize,
    /// Mean squared residual of the window's samples against the fit.
    pub mean_squared_error: T,
    /// Distance traversed inside the window.
    pub distance: T,
    /// Characteristic size of the fit: RMS spread for a dwell, angle bias
    /// for a line, radius for an arc.
    pub scale: T,
}

/// Every window of one kind over one track.
#[derive(Debug, Clone)]
pub struct KindScan<T> {
    pub kind: Kind,
    pub windows: Vec<WindowFit<T>>,
}

/// Scans of every configured kind over one track.
#[derive(Debug, Clone)]
pub struct TrackScan<T> {
    pub name: String,
    pub scans: Vec<KindScan<T>>,
}

/// Slide a window of `config.window` present samples of `kind` along `points`.
///
/// Gaps of up to `config.max_gap` samples are bridged; after a longer gap
/// the window refills from scratch.
pub fn scan<T, P>(points: &P, kind: Kind, config: &ScanConfig) -> Result<Vec<WindowFit<T>>, FitError>
where
    T: Real,
    P: PointSequence<T> + ?Sized,
{
    if !kind.has_fit() {
        return Err(FitError::NoFitForKind(kind));
    }
    let window = config.window_for(kind);
    let mut windows = Vec::new();
    let mut start = points.next_present(0);

    'runs: while let Some(first) = start {
        let mut segment = Segment::new(kind, first, points)?;
        let mut next = points.next_present(first + 1);
        if window <= 1 {
            windows.push(summarize(&segment, points)?);
        }

        loop {
            let Some(index) = next else {
                break 'runs;
            };
            if index - segment.hi() - 1 > config.max_gap {
                debug!(after = segment.hi(), resume = index, "gap too long, restarting window");
                start = Some(index);
                continue 'runs;
            }
            let full = segment.fitted_count().unwrap_or(0) >= window;
            next = if full {
                segment.shift_right(index, points)?
            } else {
                segment.add_right(index, points)?
            };
            if segment.fitted_count().unwrap_or(0) >= window {
                windows.push(summarize(&segment, points)?);
            }
        }
    }
    Ok(windows)
}

fn summarize<T, P>(segment: &Segment<T>, points: &P) -> Result<WindowFit<T>, FitError>
where
    T: Real,
    P: PointSequence<T> + ?Sized,
{
    let mean_squared_error = segment.mean_squared_error(points)?;
    let scale = match segment.shape() {
        Shape::Straight(fit) => fit.line().angle_bias,
        Shape::Arc(fit) => fit.circle().radius,
        _ => mean_squared_error.sqrt(),
    };
    Ok(WindowFit {
        lo: segment.lo(),
        hi: segment.hi(),
        mean_squared_error,
        distance: segment.distance_traversed(points)?,
        scale,
    })
}

/// Scan every configured kind over each track, one track per rayon task.
pub fn scan_tracks<T: Real>(
    tracks: &[Track<T>],
    config: &ScanConfig,
) -> Vec<Result<TrackScan<T>, FitError>> {
    let t_start = Instant::now();
    let results: Vec<Result<TrackScan<T>, FitError>> = tracks
        .par_iter()
        .map(|track| {
            let scans = config
                .kinds
                .iter()
                .map(|&kind| {
                    Ok(KindScan {
                        kind,
                        windows: scan(track, kind, config)?,
                    })
                })
                .collect::<Result<Vec<_>, FitError>>()?;
            Ok(TrackScan {
                name: track.name.clone(),
                scans,
            })
        })
        .collect();
    info!(
        tracks = tracks.len(),
        elapsed_ms = t_start.elapsed().as_millis() as u64,
        "scanned tracks"
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec2;

    fn track_from(raw: &[Option<(f64, f64)>]) -> Track<f64> {
        Track::new(
            "test",
            raw.iter().map(|p| p.map(|(x, y)| Vec2::new(x, y))).collect(),
        )
    }

    fn straight(n: usize) -> Vec<Option<(f64, f64)>> {
        (0..n).map(|i| Some((i as f64, 0.5 * i as f64))).collect()
    }

    #[test]
    fn windows_keep_their_size() {
        let track = track_from(&straight(12));
        let config = ScanConfig {
            window: 5,
            ..ScanConfig::default()
        };
        let windows = scan(&track, Kind::Straight, &config).unwrap();
        assert_eq!(windows.len(), 8);
        assert_eq!((windows[0].lo, windows[0].hi), (0, 4));
        assert_eq!((windows[7].lo, windows[7].hi), (7, 11));
        for w in &windows {
            assert!(w.mean_squared_error < 1e-12);
            assert!((w.distance - 4.0 * 1.25_f64.sqrt()).abs() < 1e-9);
        }
    }

    #[test]
    fn long_gaps_restart_the_window() {
        let mut raw = straight(20);
        for p in raw.iter_mut().take(10).skip(6) {
            *p = None;
        }
        raw[14] = None;
        let track = track_from(&raw);
        let config = ScanConfig {
            window: 3,
            max_gap: 2,
            ..ScanConfig::default()
        };
        let windows = scan(&track, Kind::Dwell, &config).unwrap();
        // Run one: 0..=5 gives 4 windows. The four-sample gap restarts at 10.
        // Run two bridges the single gap at 14: 10..=19 holds 9 samples, 7 windows.
        assert_eq!(windows.len(), 11);
        assert!(windows.iter().all(|w| w.hi < 6 || w.lo >= 10));
        assert!(windows.iter().any(|w| w.lo == 13 && w.hi == 16));
    }

    #[test]
    fn arc_windows_report_radius() {
        let raw: Vec<Option<(f64, f64)>> = (0..30)
            .map(|i| {
                let t = i as f64 * 0.1;
                Some((4.0 * t.cos(), 4.0 * t.sin()))
            })
            .collect();
        let track = track_from(&raw);
        let windows = scan(&track, Kind::Arc, &ScanConfig::default()).unwrap();
        assert_eq!(windows.len(), 22);
        for w in &windows {
            assert!((w.scale - 4.0).abs() < 1e-6);
            assert!((w.distance - 4.0 * 0.8).abs() < 1e-6);
        }
    }

    #[test]
    fn single_sample_windows_include_the_first() {
        let track = track_from(&straight(3));
        let config = ScanConfig {
            window: 1,
            ..ScanConfig::default()
        };
        let windows = scan(&track, Kind::Dwell, &config).unwrap();
        let bounds: Vec<(usize, usize)> = windows.iter().map(|w| (w.lo, w.hi)).collect();
        assert_eq!(bounds, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn scan_rejects_kinds_without_fit() {
        let track = track_from(&straight(4));
        assert_eq!(
            scan(&track, Kind::Clutter, &ScanConfig::default()),
            Err(FitError::NoFitForKind(Kind::Clutter))
        );
    }

    #[test]
    fn batch_scans_every_track_and_kind() {
        let tracks: Vec<Track<f32>> = (0..4)
            .map(|k| track_from(&straight(10 + k)).cast::<f32>())
            .collect();
        let results = scan_tracks(&tracks, &ScanConfig::default());
        assert_eq!(results.len(), 4);
        for (k, result) in results.iter().enumerate() {
            let scan = result.as_ref().unwrap();
            assert_eq!(scan.scans.len(), 3);
            for kind_scan in &scan.scans {
                assert_eq!(kind_scan.windows.len(), 10 + k - 9 + 1);
            }
        }
    }
}
