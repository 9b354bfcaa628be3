//! Arrival distribution: are crossings at a section Poisson?
//!
//! Crossings are counted in fixed-width windows (see [`TimeWindows`]) and the
//! per-window counts are tested against a Poisson law with λ estimated from
//! the data:
//! - classes j = 0..cutoff, the last one open-ended so expectations sum to K
//! - adjacent classes merged left to right until each expects `min_expected`
//! - chi-square with `classes - 2` degrees of freedom (one for the total,
//!   one for the estimated λ)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::CrossingEvent;
use crate::error::InsufficientDataError;
use crate::stats::{chi_square_sf, mean, poisson_cdf, poisson_pmf, sample_variance};
use crate::windowing::TimeWindows;

// ─── Configuration ───────────────────────────────────────────────────

/// Chi-square goodness-of-fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalConfig {
    /// Minimum expected count per merged class.
    pub min_expected: f64,
    /// Minimum number of merged classes for a usable test.
    pub min_bins: usize,
    /// Significance level; the Poisson hypothesis is rejected at p <= alpha.
    pub alpha: f64,
    /// Classes extend at least to the count whose Poisson CDF reaches this.
    pub tail_probability: f64,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            min_expected: 5.0,
            min_bins: 5,
            alpha: 0.05,
            tail_probability: 0.999,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Crossing counts per time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalHistogram {
    pub windows: TimeWindows,
    pub counts: Vec<u32>,
}

impl ArrivalHistogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

/// One (possibly merged) class of the frequency table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyClass {
    /// Smallest per-window count in the class.
    pub lower: u32,
    /// Largest per-window count, or None for the open-ended tail.
    pub upper: Option<u32>,
    /// Windows whose count falls in the class.
    pub observed: u32,
    pub expected: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitDecision {
    Accept,
    Reject,
}

impl std::fmt::Display for FitDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFitResult {
    pub lambda_hat: f64,
    pub chi_square_statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub alpha: f64,
    pub decision: FitDecision,
    pub classes: Vec<FrequencyClass>,
}

/// Histogram, dispersion and Poisson test for one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalAnalysis {
    pub histogram: ArrivalHistogram,
    /// Mean crossings per window, empty windows included.
    pub lambda_hat: f64,
    /// Sample variance of the window counts; None with a single window.
    pub count_variance: Option<f64>,
    /// Variance over mean; 1 for Poisson, below 1 for regular arrivals.
    pub dispersion_index: Option<f64>,
    pub goodness_of_fit: Result<GoodnessOfFitResult, InsufficientDataError>,
}

// ─── Computation ─────────────────────────────────────────────────────

/// Count crossings per window.
pub fn build_histogram(
    events: &[CrossingEvent],
    window_width: f64,
) -> Result<ArrivalHistogram, InsufficientDataError> {
    let windows = TimeWindows::for_events(events, window_width)?;
    let mut counts = vec![0_u32; windows.count()];
    for e in events {
        counts[windows.index_of(e.crossing_time)] += 1;
    }
    Ok(ArrivalHistogram { windows, counts })
}

/// Histogram and Poisson test for one section's crossings.
pub fn analyze_arrivals(
    events: &[CrossingEvent],
    window_width: f64,
    config: &ArrivalConfig,
) -> Result<ArrivalAnalysis, InsufficientDataError> {
    let histogram = build_histogram(events, window_width)?;

    let as_f64: Vec<f64> = histogram.counts.iter().map(|&c| c as f64).collect();
    let lambda_hat = mean(&as_f64).unwrap_or(0.0);
    let count_variance = sample_variance(&as_f64);
    let dispersion_index = count_variance
        .filter(|_| lambda_hat > 0.0)
        .map(|v| v / lambda_hat);

    let goodness_of_fit = poisson_goodness_of_fit(&histogram.counts, config);
    if let Err(e) = &goodness_of_fit {
        debug!(windows = histogram.counts.len(), error = %e, "poisson test not computable");
    }

    Ok(ArrivalAnalysis {
        histogram,
        lambda_hat,
        count_variance,
        dispersion_index,
        goodness_of_fit,
    })
}

/// Chi-square test of per-window counts against a fitted Poisson law.
pub fn poisson_goodness_of_fit(
    counts: &[u32],
    config: &ArrivalConfig,
) -> Result<GoodnessOfFitResult, InsufficientDataError> {
    let windows = counts.len();
    let total: u64 = counts.iter().map(|&c| c as u64).sum();
    if windows == 0 || total == 0 {
        return Err(InsufficientDataError::NoEvents);
    }
    let k = windows as f64;
    let lambda_hat = total as f64 / k;

    let max_count = counts.iter().copied().max().unwrap_or(0);
    let mut tail_start = 0_u32;
    while poisson_cdf(tail_start, lambda_hat) < config.tail_probability {
        tail_start += 1;
    }
    let cutoff = max_count.max(tail_start);

    let mut raw = Vec::with_capacity(cutoff as usize + 1);
    let mut expected_sum = 0.0;
    for j in 0..cutoff {
        let expected = k * poisson_pmf(j, lambda_hat);
        expected_sum += expected;
        raw.push(FrequencyClass {
            lower: j,
            upper: Some(j),
            observed: counts.iter().filter(|&&c| c == j).count() as u32,
            expected,
        });
    }
    raw.push(FrequencyClass {
        lower: cutoff,
        upper: None,
        observed: counts.iter().filter(|&&c| c >= cutoff).count() as u32,
        expected: (k - expected_sum).max(0.0),
    });

    let classes = merge_classes(&raw, config.min_expected);
    debug!(
        lambda_hat,
        raw = raw.len(),
        merged = classes.len(),
        "poisson frequency table"
    );
    if classes.len() < config.min_bins {
        return Err(InsufficientDataError::TooFewBins {
            bins: classes.len(),
            required: config.min_bins,
        });
    }

    let chi_square_statistic: f64 = classes
        .iter()
        .map(|c| (c.observed as f64 - c.expected).powi(2) / c.expected)
        .sum();
    let degrees_of_freedom = classes.len() - 2;
    let p_value = chi_square_sf(chi_square_statistic, degrees_of_freedom as f64);
    let decision = if p_value <= config.alpha {
        FitDecision::Reject
    } else {
        FitDecision::Accept
    };

    Ok(GoodnessOfFitResult {
        lambda_hat,
        chi_square_statistic,
        degrees_of_freedom,
        p_value,
        alpha: config.alpha,
        decision,
        classes,
    })
}

/// Merge adjacent classes left to right until each expects `min_expected`.
/// A trailing remainder joins the previous class.
fn merge_classes(raw: &[FrequencyClass], min_expected: f64) -> Vec<FrequencyClass> {
    let mut merged: Vec<FrequencyClass> = Vec::new();
    let mut pending: Option<FrequencyClass> = None;

    for class in raw {
        let acc = match pending.take() {
            Some(p) => FrequencyClass {
                lower: p.lower,
                upper: class.upper,
                observed: p.observed + class.observed,
                expected: p.expected + class.expected,
            },
            None => *class,
        };
        if acc.expected >= min_expected {
            merged.push(acc);
        } else {
            pending = Some(acc);
        }
    }

    if let Some(rest) = pending {
        match merged.last_mut() {
            Some(last) => {
                last.upper = rest.upper;
                last.observed += rest.observed;
                last.expected += rest.expected;
            }
            None => merged.push(rest),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VehicleId;

    fn event(vehicle: u64, t: f64) -> CrossingEvent {
        CrossingEvent {
            vehicle_id: VehicleId(vehicle),
            section_position: 200.0,
            crossing_time: t,
            interpolated_speed: 30.0,
        }
    }

    #[test]
    fn histogram_counts_every_event() {
        let events = vec![event(1, 0.0), event(2, 3.0), event(3, 9.99), event(4, 10.0), event(5, 25.0)];
        let h = build_histogram(&events, 10.0).unwrap();
        assert_eq!(h.counts, vec![3, 1, 1]);
        assert_eq!(h.total(), 5);
    }

    #[test]
    fn histogram_includes_empty_windows() {
        let events = vec![event(1, 0.0), event(2, 35.0)];
        let h = build_histogram(&events, 10.0).unwrap();
        assert_eq!(h.counts, vec![1, 0, 0, 1]);
    }

    #[test]
    fn no_events_is_insufficient() {
        assert_eq!(build_histogram(&[], 10.0), Err(InsufficientDataError::NoEvents));
        let err = analyze_arrivals(&[], 10.0, &ArrivalConfig::default()).unwrap_err();
        assert_eq!(err, InsufficientDataError::NoEvents);
    }

    #[test]
    fn unusable_window_width_is_an_error() {
        let events = vec![event(1, 0.0), event(2, 5.0)];
        let config = ArrivalConfig::default();
        for width in [0.0, -10.0, f64::INFINITY] {
            let err = analyze_arrivals(&events, width, &config).unwrap_err();
            assert!(matches!(err, InsufficientDataError::InvalidWindowWidth { .. }), "width {width}");
        }
        let far = vec![event(1, 0.0), event(2, 600.0)];
        assert!(matches!(
            build_histogram(&far, 1e-9),
            Err(InsufficientDataError::TooManyWindows { .. })
        ));
    }

    #[test]
    fn few_windows_keep_histogram() {
        let events = vec![event(1, 0.0), event(2, 5.0), event(3, 12.0)];
        let a = analyze_arrivals(&events, 10.0, &ArrivalConfig::default()).unwrap();
        assert_eq!(a.histogram.counts, vec![2, 1]);
        assert!((a.lambda_hat - 1.5).abs() < 1e-12);
        assert!(matches!(
            a.goodness_of_fit,
            Err(InsufficientDataError::TooFewBins { required: 5, .. })
        ));
    }

    #[test]
    fn merge_pushes_trailing_remainder_into_previous() {
        let raw = vec![
            FrequencyClass { lower: 0, upper: Some(0), observed: 1, expected: 2.0 },
            FrequencyClass { lower: 1, upper: Some(1), observed: 4, expected: 4.0 },
            FrequencyClass { lower: 2, upper: Some(2), observed: 6, expected: 6.0 },
            FrequencyClass { lower: 3, upper: None, observed: 1, expected: 1.0 },
        ];
        let merged = merge_classes(&raw, 5.0);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].lower, merged[0].upper), (0, Some(1)));
        assert_eq!(merged[0].observed, 5);
        assert_eq!((merged[1].lower, merged[1].upper), (2, None));
        assert_eq!(merged[1].observed, 7);
        assert!((merged[1].expected - 7.0).abs() < 1e-12);
    }

    #[test]
    fn expectations_and_observations_sum_to_window_count() {
        let counts: Vec<u32> = (0..120).map(|i| [3, 5, 4, 7, 6, 2, 5, 8, 4, 6][i % 10]).collect();
        let fit = poisson_goodness_of_fit(&counts, &ArrivalConfig::default()).unwrap();
        let observed: u32 = fit.classes.iter().map(|c| c.observed).sum();
        let expected: f64 = fit.classes.iter().map(|c| c.expected).sum();
        assert_eq!(observed, 120);
        assert!((expected - 120.0).abs() < 1e-9);
        assert!(fit.classes.iter().all(|c| c.expected >= 5.0));
        assert_eq!(fit.degrees_of_freedom, fit.classes.len() - 2);
        assert_eq!(fit.classes.last().unwrap().upper, None);
    }

    #[test]
    fn regular_counts_are_rejected() {
        let counts = vec![5_u32; 100];
        let fit = poisson_goodness_of_fit(&counts, &ArrivalConfig::default()).unwrap();
        assert!((fit.lambda_hat - 5.0).abs() < 1e-12);
        assert_eq!(fit.decision, FitDecision::Reject);
        assert!(fit.p_value < 1e-6);
    }

    #[test]
    fn regular_arrivals_are_underdispersed() {
        let events: Vec<_> = (0..200).map(|i| event(i, i as f64 * 2.0)).collect();
        let a = analyze_arrivals(&events, 10.0, &ArrivalConfig::default()).unwrap();
        assert!(a.histogram.counts.iter().all(|&c| c == 5));
        assert!(a.dispersion_index.unwrap() < 0.1);
    }
}
