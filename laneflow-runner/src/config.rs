//! Serializable run configuration.
//!
//! A run config names the trajectory source and lane, and carries the
//! [`AnalysisConfig`] handed to the engines. Everything except the data
//! section has defaults, so a minimal TOML file is:
//!
//! ```toml
//! [data]
//! path = "trajectories-0820am-0835am.txt"
//! format = "ngsim"
//! lane = 2
//! ```

use std::path::{Path, PathBuf};

use laneflow_core::config::AnalysisConfig;
use laneflow_core::domain::LaneId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::synthetic::SyntheticConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid analysis settings: {0}")]
    Invalid(#[from] laneflow_core::config::ConfigError),
}

/// On-disk layout of a trajectory file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// Raw NGSIM whitespace-separated text.
    #[default]
    Ngsim,
    /// Normalized CSV: `vehicle_id,time_s,position,speed,lane`.
    Csv,
}

/// Where the trajectories come from and which lane to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Trajectory file. Without one, `synthetic` must be set.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: DataFormat,
    #[serde(default = "default_lane")]
    pub lane: LaneId,
    /// Generate seeded synthetic trajectories when no file is given.
    #[serde(default)]
    pub synthetic: bool,
}

fn default_lane() -> LaneId {
    LaneId(2)
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: DataFormat::default(),
            lane: default_lane(),
            synthetic: false,
        }
    }
}

/// Complete configuration of one lane analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run extraction and per-section analyses on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

fn default_parallel() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            data: DataConfig::default(),
            analysis: AnalysisConfig::default(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load and validate a run config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a run config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.analysis.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laneflow_core::flow_speed::ZeroSpeedPolicy;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = RunConfig::from_toml(
            r#"
[data]
path = "lane.txt"
"#,
        )
        .unwrap();
        assert_eq!(config.data.path, Some(PathBuf::from("lane.txt")));
        assert_eq!(config.data.format, DataFormat::Ngsim);
        assert_eq!(config.data.lane, LaneId(2));
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert!(config.parallel);
    }

    #[test]
    fn nested_analysis_settings_parse() {
        let config = RunConfig::from_toml(
            r#"
parallel = false

[data]
path = "lane.csv"
format = "csv"
lane = 3

[analysis]
sections = [100.0, 300.0]
window_width_s = 30.0

[analysis.arrival]
alpha = 0.01

[analysis.flow_speed]
zero_speed_policy = "exclude"
"#,
        )
        .unwrap();
        assert!(!config.parallel);
        assert_eq!(config.data.format, DataFormat::Csv);
        assert_eq!(config.data.lane, LaneId(3));
        assert_eq!(config.analysis.sections, vec![100.0, 300.0]);
        assert_eq!(config.analysis.window_width_s, 30.0);
        assert_eq!(config.analysis.arrival.alpha, 0.01);
        assert_eq!(config.analysis.arrival.min_bins, 5);
        assert_eq!(config.analysis.flow_speed.zero_speed_policy, ZeroSpeedPolicy::Exclude);
    }

    #[test]
    fn invalid_analysis_is_rejected() {
        let err = RunConfig::from_toml(
            r#"
[analysis]
window_width_s = 0.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = RunConfig::from_toml("[data\npath = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = RunConfig::default();
        config.data.synthetic = true;
        config.analysis.sections = vec![250.0, 500.0];
        let text = config.to_toml().unwrap();
        let back = RunConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RunConfig::from_file(Path::new("/nonexistent/run.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.toml"));
    }
}
