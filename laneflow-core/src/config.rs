//! Analysis configuration passed explicitly to every engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arrival::ArrivalConfig;
use crate::crossing::CrossingConfig;
use crate::flow_speed::FlowSpeedConfig;
use crate::fundamental::FundamentalConfig;
use crate::headway::HeadwayConfig;
use crate::headway_fit::HeadwayFitConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window width must be positive and finite, got {0}")]
    InvalidWindowWidth(f64),

    #[error("at least one section position is required")]
    NoSections,

    #[error("section position {0} is not finite")]
    NonFiniteSection(f64),

    #[error("section positions must be strictly increasing ({previous} then {next})")]
    UnorderedSections { previous: f64, next: f64 },

    #[error("regime thresholds must satisfy 0 <= stable_from <= congested_from (got {stable_from}, {congested_from})")]
    InvalidThresholds { stable_from: f64, congested_from: f64 },

    #[error("alpha must lie in (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("min_expected must be positive, got {0}")]
    InvalidMinExpected(f64),

    #[error("min_bins must be at least 3, got {0}")]
    InvalidMinBins(usize),

    #[error("tail_probability must lie in (0, 1), got {0}")]
    InvalidTailProbability(f64),

    #[error("{field} must be at least {min}, got {value}")]
    TooSmall { field: &'static str, min: usize, value: usize },
}

/// Sections, window width and per-engine settings for one lane analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Section positions along the lane, same unit as trajectory positions.
    #[serde(default = "default_sections")]
    pub sections: Vec<f64>,
    #[serde(default = "default_window_width")]
    pub window_width_s: f64,
    #[serde(default)]
    pub crossing: CrossingConfig,
    #[serde(default)]
    pub headway: HeadwayConfig,
    #[serde(default)]
    pub headway_fit: HeadwayFitConfig,
    #[serde(default)]
    pub arrival: ArrivalConfig,
    #[serde(default)]
    pub flow_speed: FlowSpeedConfig,
    #[serde(default)]
    pub fundamental: FundamentalConfig,
}

fn default_sections() -> Vec<f64> {
    vec![200.0, 400.0, 600.0]
}

fn default_window_width() -> f64 {
    10.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            window_width_s: default_window_width(),
            crossing: CrossingConfig::default(),
            headway: HeadwayConfig::default(),
            headway_fit: HeadwayFitConfig::default(),
            arrival: ArrivalConfig::default(),
            flow_speed: FlowSpeedConfig::default(),
            fundamental: FundamentalConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.window_width_s.is_finite() && self.window_width_s > 0.0) {
            return Err(ConfigError::InvalidWindowWidth(self.window_width_s));
        }
        if self.sections.is_empty() {
            return Err(ConfigError::NoSections);
        }
        if let Some(&bad) = self.sections.iter().find(|s| !s.is_finite()) {
            return Err(ConfigError::NonFiniteSection(bad));
        }
        if let Some(pair) = self.sections.windows(2).find(|p| p[1] <= p[0]) {
            return Err(ConfigError::UnorderedSections {
                previous: pair[0],
                next: pair[1],
            });
        }

        let t = &self.headway.thresholds;
        if !(t.stable_from >= 0.0 && t.stable_from <= t.congested_from && t.congested_from.is_finite()) {
            return Err(ConfigError::InvalidThresholds {
                stable_from: t.stable_from,
                congested_from: t.congested_from,
            });
        }

        let a = &self.arrival;
        if !(a.alpha > 0.0 && a.alpha < 1.0) {
            return Err(ConfigError::InvalidAlpha(a.alpha));
        }
        if !(a.min_expected > 0.0 && a.min_expected.is_finite()) {
            return Err(ConfigError::InvalidMinExpected(a.min_expected));
        }
        if a.min_bins < 3 {
            return Err(ConfigError::InvalidMinBins(a.min_bins));
        }
        if !(a.tail_probability > 0.0 && a.tail_probability < 1.0) {
            return Err(ConfigError::InvalidTailProbability(a.tail_probability));
        }

        if self.headway_fit.min_headways < 2 {
            return Err(ConfigError::TooSmall {
                field: "headway_fit.min_headways",
                min: 2,
                value: self.headway_fit.min_headways,
            });
        }
        if self.fundamental.min_points < 2 {
            return Err(ConfigError::TooSmall {
                field: "fundamental.min_points",
                min: 2,
                value: self.fundamental.min_points,
            });
        }
        Ok(())
    }
}
