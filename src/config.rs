use crate::segment::Kind;

/// Rolling-window scan parameters in one struct.
/// Adjustable at runtime; the CLI builds one from its flags.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of present samples in each window.
    /// Clamped up to the minimum a fit needs (1 for dwell, 2 for line, 3 for arc).
    pub window: usize,
    /// Longest run of consecutive missing samples a window may bridge.
    /// A longer gap ends the current run of windows; scanning restarts after it.
    pub max_gap: usize,
    /// Fit kinds evaluated per track. Kinds without a fit are rejected.
    pub kinds: Vec<Kind>,
}

impl ScanConfig {
    /// Effective window for `kind` after clamping to the fit's minimum.
    pub fn window_for(&self, kind: Kind) -> usize {
        self.window.max(kind.min_points())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window: 9,
            max_gap: 3,
            kinds: vec![Kind::Dwell, Kind::Straight, Kind::Arc],
        }
    }
}
