//! Errors shared by the statistical engines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Too little (or unusable) data for a statistically meaningful result.
///
/// Returned as an explicit "not computable" value for one section; it never
/// aborts the analysis of other sections.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsufficientDataError {
    #[error("no crossing events at this section")]
    NoEvents,

    #[error("window width must be positive and finite, got {width}")]
    InvalidWindowWidth { width: f64 },

    #[error("{windows} windows needed to cover the crossings, at most {max} allowed")]
    TooManyWindows { windows: f64, max: usize },

    #[error("only {bins} chi-square classes after merging, need at least {required}")]
    TooFewBins { bins: usize, required: usize },

    #[error("only {headways} headways, need at least {required}")]
    TooFewHeadways { headways: usize, required: usize },

    #[error("headway sample contains a non-positive value")]
    NonPositiveHeadway,

    #[error("only {points} usable speed-density points, need at least {required}")]
    TooFewPoints { points: usize, required: usize },

    #[error("speed does not decrease with density (slope {slope:.4})")]
    NonDecreasingSpeed { slope: f64 },
}
