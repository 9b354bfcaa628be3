//! Headways: time gaps between consecutive vehicles at a section.
//!
//! Events are ordered by crossing time (ties by vehicle id) before
//! differencing, so the result does not depend on extraction order.
//! The coefficient of variation classifies the flow regime using half-open
//! buckets: a CV equal to a threshold belongs to the bucket that starts there.

use serde::{Deserialize, Serialize};

use crate::domain::{sort_chronologically, CrossingEvent, Measure, UndefinedReason};
use crate::stats::{mean, population_std_dev};

// ─── Configuration ───────────────────────────────────────────────────

/// CV thresholds separating the flow regimes.
///
/// - `cv < stable_from` → Sparse
/// - `stable_from <= cv < congested_from` → Stable
/// - `cv >= congested_from` → Congested
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub stable_from: f64,
    pub congested_from: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            stable_from: 0.33,
            congested_from: 0.6,
        }
    }
}

impl RegimeThresholds {
    pub fn classify(&self, cv: f64) -> FlowRegime {
        if cv < self.stable_from {
            FlowRegime::Sparse
        } else if cv < self.congested_from {
            FlowRegime::Stable
        } else {
            FlowRegime::Congested
        }
    }
}

/// Headway settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadwayConfig {
    #[serde(default)]
    pub thresholds: RegimeThresholds,
}

// ─── Result types ────────────────────────────────────────────────────

/// Flow regime indicated by the headway CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowRegime {
    Sparse,
    Stable,
    Congested,
}

impl std::fmt::Display for FlowRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sparse => write!(f, "sparse"),
            Self::Stable => write!(f, "stable"),
            Self::Congested => write!(f, "congested"),
        }
    }
}

/// Summary statistics of a headway series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadwaySummary {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub coefficient_of_variation: Measure,
    /// None when the CV is undefined.
    pub regime: Option<FlowRegime>,
}

/// Whether a summary could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HeadwayStatus {
    /// Fewer than two crossings: no headway exists.
    InsufficientData { event_count: usize },
    Computed(HeadwaySummary),
}

/// Headway series of one section plus its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadwayAnalysis {
    /// Differences of consecutive crossing times, in chronological order.
    pub headways: Vec<f64>,
    pub status: HeadwayStatus,
}

impl HeadwayAnalysis {
    pub fn summary(&self) -> Option<&HeadwaySummary> {
        match &self.status {
            HeadwayStatus::Computed(summary) => Some(summary),
            HeadwayStatus::InsufficientData { .. } => None,
        }
    }
}

// ─── Computation ─────────────────────────────────────────────────────

/// Compute the headway series and summary for one section's events.
pub fn compute_headways(events: &[CrossingEvent], config: &HeadwayConfig) -> HeadwayAnalysis {
    let mut ordered = events.to_vec();
    sort_chronologically(&mut ordered);

    let headways: Vec<f64> = ordered
        .windows(2)
        .map(|pair| pair[1].crossing_time - pair[0].crossing_time)
        .collect();

    let (Some(mean_hw), Some(std_hw)) = (mean(&headways), population_std_dev(&headways)) else {
        return HeadwayAnalysis {
            headways,
            status: HeadwayStatus::InsufficientData {
                event_count: events.len(),
            },
        };
    };

    let (cv, regime) = if mean_hw > 0.0 {
        let cv = std_hw / mean_hw;
        (Measure::Value(cv), Some(config.thresholds.classify(cv)))
    } else {
        (Measure::Undefined(UndefinedReason::ZeroMean), None)
    };

    HeadwayAnalysis {
        headways,
        status: HeadwayStatus::Computed(HeadwaySummary {
            mean: mean_hw,
            std_dev: std_hw,
            coefficient_of_variation: cv,
            regime,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VehicleId;

    fn event(vehicle: u64, t: f64) -> CrossingEvent {
        CrossingEvent {
            vehicle_id: VehicleId(vehicle),
            section_position: 400.0,
            crossing_time: t,
            interpolated_speed: 30.0,
        }
    }

    #[test]
    fn worked_example_is_congested() {
        let events = vec![event(1, 10.0), event(2, 12.0), event(3, 12.5)];
        let a = compute_headways(&events, &HeadwayConfig::default());
        assert_eq!(a.headways, vec![2.0, 0.5]);
        let s = a.summary().unwrap();
        assert!((s.mean - 1.25).abs() < 1e-12);
        assert!((s.std_dev - 0.75).abs() < 1e-12);
        assert!((s.coefficient_of_variation.value().unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(s.regime, Some(FlowRegime::Congested));
    }

    #[test]
    fn unordered_input_is_sorted_first() {
        let events = vec![event(3, 12.5), event(1, 10.0), event(2, 12.0)];
        let a = compute_headways(&events, &HeadwayConfig::default());
        assert_eq!(a.headways, vec![2.0, 0.5]);
    }

    #[test]
    fn fewer_than_two_events_is_insufficient() {
        let a = compute_headways(&[], &HeadwayConfig::default());
        assert!(a.headways.is_empty());
        assert_eq!(a.status, HeadwayStatus::InsufficientData { event_count: 0 });

        let a = compute_headways(&[event(1, 3.0)], &HeadwayConfig::default());
        assert!(a.headways.is_empty());
        assert_eq!(a.status, HeadwayStatus::InsufficientData { event_count: 1 });
        assert!(a.summary().is_none());
    }

    #[test]
    fn simultaneous_crossings_have_undefined_cv() {
        let events = vec![event(1, 5.0), event(2, 5.0), event(3, 5.0)];
        let a = compute_headways(&events, &HeadwayConfig::default());
        let s = a.summary().unwrap();
        assert_eq!(s.mean, 0.0);
        assert_eq!(
            s.coefficient_of_variation,
            Measure::Undefined(UndefinedReason::ZeroMean)
        );
        assert_eq!(s.regime, None);
    }

    #[test]
    fn threshold_boundaries_belong_to_upper_bucket() {
        let t = RegimeThresholds::default();
        assert_eq!(t.classify(0.0), FlowRegime::Sparse);
        assert_eq!(t.classify(0.3299), FlowRegime::Sparse);
        assert_eq!(t.classify(0.33), FlowRegime::Stable);
        assert_eq!(t.classify(0.5999), FlowRegime::Stable);
        assert_eq!(t.classify(0.6), FlowRegime::Congested);
        assert_eq!(t.classify(2.0), FlowRegime::Congested);
    }

    #[test]
    fn uniform_headways_are_sparse() {
        let events: Vec<_> = (0..10).map(|i| event(i, i as f64 * 2.0)).collect();
        let a = compute_headways(&events, &HeadwayConfig::default());
        let s = a.summary().unwrap();
        assert_eq!(a.headways.len(), 9);
        assert!(s.std_dev.abs() < 1e-12);
        assert_eq!(s.regime, Some(FlowRegime::Sparse));
    }
}
