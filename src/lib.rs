//! trackfit: incremental geometric fits over tracked centroid paths.
//!
//! Maintains line, arc and dwell fits over sliding windows of an animal's
//! centroid track, and answers the geometric questions a movement
//! classifier asks about them: travel direction, distance covered,
//! projection onto the fitted curve and alignment between neighbours.
//!
//! # Example
//!
//! ```
//! use trackfit::{End, Kind, Segment, Vec2};
//!
//! let points: Vec<Option<Vec2<f64>>> = (0..4)
//!     .map(|i| Some(Vec2::new(i as f64, 0.0)))
//!     .collect();
//! let segment = Segment::over(Kind::Straight, 0..=3, &points)?;
//! assert!((segment.distance_traversed(&points)? - 3.0).abs() < 1e-12);
//! let heading = segment.direction_vector(End::Initial, &points)?;
//! assert!(heading.x > 0.0);
//! # Ok::<(), trackfit::FitError>(())
//! ```

#![forbid(unsafe_code)]

mod config;
mod geom;
mod scan;
mod track;

pub mod error;
pub mod fit;
pub mod segment;

// Re-export kurbo so downstream users get the same version
// used by Track::bounding_box.
pub use kurbo;

pub use config::ScanConfig;
pub use error::FitError;
pub use geom::{unit_dot, wrap_angle, Real, Vec2};
pub use scan::{scan, scan_tracks, KindScan, TrackScan, WindowFit};
pub use segment::{End, Kind, Segment, SegmentArena, SegmentId, Shape};
pub use track::{PointSequence, Track};
