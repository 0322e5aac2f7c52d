// Our Real scalar type:
pub type Real = f64;

use core::str::FromStr;
use std::sync::OnceLock;

/// Lazily-initialized confidence tolerance used when assigning sample points
/// to label cuboids. Defaults to `0.7`, but can be overridden:
///  1) **Build-time**: set env var `PARTBOX_CONFIDENCE_TOL` (e.g. `PARTBOX_CONFIDENCE_TOL=0.5 cargo build`)
///  2) **Runtime**: call [`set_confidence_tolerance`] once before using the library
static CONFIDENCE_TOL_CELL: OnceLock<Real> = OnceLock::new();

const DEFAULT_CONFIDENCE_TOL: Real = 0.7;

/// Returns the current confidence tolerance.
/// If not set yet, it tries `PARTBOX_CONFIDENCE_TOL` (parsed as [`Real`]) and
/// falls back to the default.
pub fn confidence_tolerance() -> Real {
    *CONFIDENCE_TOL_CELL.get_or_init(|| {
        // Compile-time env if provided, inherited by dependencies
        if let Some(environment_variable) = option_env!("PARTBOX_CONFIDENCE_TOL") {
            if let Ok(value) = Real::from_str(environment_variable) {
                return value.clamp(0.0, 1.0);
            }
        }
        DEFAULT_CONFIDENCE_TOL
    })
}

/// Set the confidence tolerance programmatically once (subsequent calls are ignored).
/// Call near program start: `partbox::float_types::set_confidence_tolerance(0.5);`
pub fn set_confidence_tolerance(value: Real) {
    let _ = CONFIDENCE_TOL_CELL.set(value.clamp(0.0, 1.0));
}

/// Largest admissible gap between neighboring sample points inside a single
/// cuboid, as a fraction of the object diameter. A larger gap along any local
/// axis splits the cuboid into disjoint sub-cuboids.
pub const SPLIT_GAP_RATIO: Real = 0.1;

/// Diagonal loading added to every empirical covariance before inversion.
/// Every covariance inversion in the trainer goes through this value; it is a
/// structural invariant of the learned relations, not a tunable knob.
pub const COVARIANCE_REGULARIZATION: Real = 1.0e-3;

/// Tolerance for geometric comparisons on sample point positions.
pub const EPSILON: Real = 1e-10;
