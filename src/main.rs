use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use trackfit::{scan_tracks, Kind, Real, ScanConfig, Track, Vec2};

#[derive(Parser)]
#[command(name = "trackfit", about = "Rolling line, arc and dwell fits over centroid tracks")]
struct Cli {
    /// Track files: one `x y` (or `x,y`) sample per row; blank, `-` or `nan` rows are gaps
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Present samples per window
    #[arg(short, long, default_value = "9")]
    window: usize,

    /// Longest gap (missing samples) a window may bridge
    #[arg(long, default_value = "3")]
    max_gap: usize,

    /// Fit kinds to evaluate
    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "dwell,straight,arc")]
    kinds: Vec<KindArg>,

    /// Fit in single precision
    #[arg(long)]
    single: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Dwell,
    Straight,
    Arc,
}

impl From<KindArg> for Kind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Dwell => Kind::Dwell,
            KindArg::Straight => Kind::Straight,
            KindArg::Arc => Kind::Arc,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trackfit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ScanConfig {
        window: cli.window,
        max_gap: cli.max_gap,
        kinds: cli.kinds.iter().map(|&k| k.into()).collect(),
    };

    let tracks = cli
        .inputs
        .iter()
        .map(|path| load_track(path))
        .collect::<Result<Vec<_>, _>>()?;

    eprintln!();
    eprintln!(
        "  trackfit \u{00b7} {} tracks \u{00b7} window {} \u{00b7} {} precision",
        tracks.len(),
        config.window,
        if cli.single { "single" } else { "double" },
    );
    eprintln!();

    if cli.single {
        let tracks: Vec<Track<f32>> = tracks.iter().map(Track::cast).collect();
        report(&tracks, &config)?;
    } else {
        report(&tracks, &config)?;
    }

    eprintln!();
    Ok(())
}

/// Print one summary block per track.
fn report<T: Real>(tracks: &[Track<T>], config: &ScanConfig) -> Result<(), Box<dyn Error>> {
    let results = scan_tracks(tracks, config);
    for (track, result) in tracks.iter().zip(results) {
        let scan = result?;
        let bounds = match track.bounding_box() {
            Some(r) => format!("{:.1}..{:.1} \u{00d7} {:.1}..{:.1}", r.x0, r.x1, r.y0, r.y1),
            None => "empty".to_string(),
        };
        eprintln!(
            "  {:<20} {} samples ({} tracked) \u{00b7} {}",
            scan.name,
            track.points.len(),
            track.present_count(),
            bounds,
        );
        for kind_scan in &scan.scans {
            let rms = median(kind_scan.windows.iter().map(|w| w.mean_squared_error.sqrt()));
            let step = median(kind_scan.windows.iter().map(|w| w.distance));
            eprintln!(
                "    {:<10} {:>6} windows \u{00b7} median rms {} \u{00b7} median travel {}",
                kind_scan.kind.name(),
                kind_scan.windows.len(),
                fmt_opt(rms),
                fmt_opt(step),
            );
        }
    }
    Ok(())
}

/// Median of the finite values, if any.
fn median<T: Real>(values: impl Iterator<Item = T>) -> Option<f64> {
    let mut finite: Vec<f64> = values.map(Real::as_f64).filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);
    Some(finite[finite.len() / 2])
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

/// Read a whitespace or comma separated track file.
fn load_track(path: &Path) -> Result<Track<f64>, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    let mut points = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        let point = match fields.as_slice() {
            [] => None,
            [only] if *only == "-" || only.eq_ignore_ascii_case("nan") => None,
            [x, y, ..] if *x == "-" || *y == "-" => None,
            [x, y, ..] => {
                let parse = |s: &str| {
                    s.parse::<f64>()
                        .map_err(|e| format!("{}:{}: {}", path.display(), n + 1, e))
                };
                let (x, y) = (parse(*x)?, parse(*y)?);
                if x.is_nan() || y.is_nan() {
                    None
                } else {
                    Some(Vec2::new(x, y))
                }
            }
            _ => {
                return Err(format!("{}:{}: expected `x y`", path.display(), n + 1).into());
            }
        };
        points.push(point);
    }

    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Track::new(name, points))
}
