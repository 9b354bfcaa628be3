//! Lane analysis runner: wires loading, extraction and the section engines.
//!
//! Two entry points:
//! - `run_lane_analysis()`: resolves data from a `RunConfig`, then runs. Used by the CLI.
//! - `run_from_data()`: takes pre-loaded rows. Used by tests and repeated runs.
//!
//! Extraction runs per vehicle and the section analyses run per section, both
//! on the rayon pool when `parallel` is set. Events are regrouped and sorted
//! after extraction, so parallel and sequential runs give identical reports.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use laneflow_core::arrival::{analyze_arrivals, ArrivalAnalysis};
use laneflow_core::config::AnalysisConfig;
use laneflow_core::crossing::{SectionCrossingExtractor, SectionCrossings, SectionEvents};
use laneflow_core::domain::{CrossingEvent, LaneId, TrajectoryRecord};
use laneflow_core::error::InsufficientDataError;
use laneflow_core::flow_speed::{compute_flow_speed, FlowSpeedSample};
use laneflow_core::fundamental::{fundamental_diagram, FundamentalDiagram};
use laneflow_core::headway::{compute_headways, HeadwayAnalysis};
use laneflow_core::headway_fit::{fit_headway_distribution, HeadwayDistributionFit};
use laneflow_core::trajectory::{InputOrderError, TrajectoryTable};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_trajectories, DataSource, LoadError, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid analysis settings: {0}")]
    Analysis(#[from] laneflow_core::config::ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
}

/// Current schema version for exported reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Every analysis of one section.
///
/// Each engine result is its own `Result`, so a section with too little data
/// for one statistic still reports the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    pub section_position: f64,
    pub events: Vec<CrossingEvent>,
    pub headway: HeadwayAnalysis,
    pub headway_fit: Result<HeadwayDistributionFit, InsufficientDataError>,
    pub arrival: Result<ArrivalAnalysis, InsufficientDataError>,
    pub flow_speed: Result<Vec<FlowSpeedSample>, InsufficientDataError>,
    pub fundamental: Result<FundamentalDiagram, InsufficientDataError>,
}

/// Crossings and section analyses of one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneAnalysis {
    pub lane: LaneId,
    pub vehicle_count: usize,
    pub sample_count: usize,
    /// Vehicles skipped for malformed trajectories.
    pub rejected: Vec<InputOrderError>,
    pub sections: Vec<SectionReport>,
}

impl LaneAnalysis {
    pub fn total_events(&self) -> usize {
        self.sections.iter().map(|s| s.events.len()).sum()
    }
}

/// Complete result of one lane analysis run, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub source: DataSource,
    pub dataset_hash: String,
    pub config: AnalysisConfig,
    pub analysis: LaneAnalysis,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl LaneReport {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }
}

/// Load data per the run config and analyze the configured lane.
pub fn run_lane_analysis(config: &RunConfig) -> Result<LaneReport, RunError> {
    config.analysis.validate()?;
    let loaded = load_trajectories(&config.data, &config.synthetic)?;
    run_from_data(&loaded, config)
}

/// Analyze the configured lane of already loaded data. No I/O.
pub fn run_from_data(loaded: &LoadedData, config: &RunConfig) -> Result<LaneReport, RunError> {
    config.analysis.validate()?;
    let lane = if loaded.is_synthetic() {
        config.synthetic.lane
    } else {
        config.data.lane
    };
    let records = loaded.lane_records(lane)?;
    let analysis = analyze_records(&records, lane, &config.analysis, config.parallel);
    Ok(LaneReport {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        source: loaded.source.clone(),
        dataset_hash: loaded.dataset_hash.clone(),
        config: config.analysis.clone(),
        analysis,
    })
}

/// Analyze rows of a single lane. Rows of other lanes are ignored.
pub fn analyze_records(
    records: &[TrajectoryRecord],
    lane: LaneId,
    config: &AnalysisConfig,
    parallel: bool,
) -> LaneAnalysis {
    let table = TrajectoryTable::for_lane(records, lane);
    if !table.rejected().is_empty() {
        warn!(
            lane = %lane,
            rejected = table.rejected().len(),
            "skipped vehicles with malformed trajectories"
        );
    }
    info!(
        lane = %lane,
        vehicles = table.vehicles().len(),
        samples = table.sample_count(),
        sections = config.sections.len(),
        parallel,
        "analyzing lane"
    );

    let crossings = extract_crossings(&table, config, parallel);
    info!(events = crossings.total_events(), "extracted crossings");

    let sections: Vec<SectionReport> = if parallel {
        crossings
            .into_sections()
            .into_par_iter()
            .map(|s| analyze_section(s, config))
            .collect()
    } else {
        crossings
            .into_sections()
            .into_iter()
            .map(|s| analyze_section(s, config))
            .collect()
    };

    LaneAnalysis {
        lane,
        vehicle_count: table.vehicles().len(),
        sample_count: table.sample_count(),
        rejected: table.rejected().to_vec(),
        sections,
    }
}

fn extract_crossings(table: &TrajectoryTable, config: &AnalysisConfig, parallel: bool) -> SectionCrossings {
    let extractor = SectionCrossingExtractor::new(&config.crossing);
    let sections = &config.sections;
    let events: Vec<CrossingEvent> = if parallel {
        table
            .vehicles()
            .par_iter()
            .flat_map_iter(|v| extractor.extract_all(v, sections))
            .collect()
    } else {
        table
            .vehicles()
            .iter()
            .flat_map(|v| extractor.extract_all(v, sections))
            .collect()
    };
    SectionCrossings::assemble(sections, events)
}

/// Run every engine on one section's events.
pub fn analyze_section(section: SectionEvents, config: &AnalysisConfig) -> SectionReport {
    let events = section.events;
    let width = config.window_width_s;

    let headway = compute_headways(&events, &config.headway);
    let headway_fit = fit_headway_distribution(&headway.headways, &config.headway_fit);
    let arrival = analyze_arrivals(&events, width, &config.arrival);
    let flow_speed = compute_flow_speed(&events, width, &config.flow_speed);
    let fundamental = flow_speed
        .as_ref()
        .map(|samples| fundamental_diagram(samples, &config.fundamental))
        .map_err(Clone::clone);

    debug!(
        section = section.section_position,
        events = events.len(),
        headway_fit = headway_fit.is_ok(),
        arrival = arrival.is_ok(),
        "section analyzed"
    );

    SectionReport {
        section_position: section.section_position,
        events,
        headway,
        headway_fit,
        arrival,
        flow_speed,
        fundamental,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laneflow_core::domain::VehicleId;

    fn constant_speed_vehicle(id: u64, entry: f64, speed: f64) -> Vec<TrajectoryRecord> {
        (0..120)
            .map(|i| {
                let t = entry + i as f64 * 0.1;
                TrajectoryRecord {
                    vehicle_id: VehicleId(id),
                    time_s: t,
                    position: speed * (t - entry),
                    speed,
                    lane: LaneId(2),
                }
            })
            .collect()
    }

    #[test]
    fn sections_are_reported_in_config_order() {
        let records: Vec<_> = (0..10)
            .flat_map(|i| constant_speed_vehicle(i + 1, i as f64 * 3.0, 40.0))
            .collect();
        let config = AnalysisConfig {
            sections: vec![100.0, 200.0, 300.0],
            ..AnalysisConfig::default()
        };
        let report = analyze_records(&records, LaneId(2), &config, false);
        assert_eq!(report.vehicle_count, 10);
        let positions: Vec<f64> = report.sections.iter().map(|s| s.section_position).collect();
        assert_eq!(positions, vec![100.0, 200.0, 300.0]);
        for s in &report.sections {
            assert_eq!(s.events.len(), 10);
            assert!(s.flow_speed.is_ok());
        }
    }

    #[test]
    fn section_without_crossings_reports_insufficient_data() {
        let records = constant_speed_vehicle(1, 0.0, 40.0);
        let config = AnalysisConfig {
            sections: vec![100.0, 10_000.0],
            ..AnalysisConfig::default()
        };
        let report = analyze_records(&records, LaneId(2), &config, false);
        let far = &report.sections[1];
        assert!(far.events.is_empty());
        assert_eq!(far.arrival.as_ref().unwrap_err(), &InsufficientDataError::NoEvents);
        assert_eq!(far.flow_speed.as_ref().unwrap_err(), &InsufficientDataError::NoEvents);
        assert_eq!(far.fundamental.as_ref().unwrap_err(), &InsufficientDataError::NoEvents);
        assert_eq!(report.sections[0].events.len(), 1);
    }

    #[test]
    fn malformed_vehicle_does_not_abort_lane() {
        let mut records = constant_speed_vehicle(1, 0.0, 40.0);
        let mut bad = constant_speed_vehicle(2, 5.0, 40.0);
        bad.swap(3, 4);
        records.extend(bad);
        records.extend(constant_speed_vehicle(3, 10.0, 40.0));

        let config = AnalysisConfig {
            sections: vec![200.0],
            ..AnalysisConfig::default()
        };
        let report = analyze_records(&records, LaneId(2), &config, true);
        assert_eq!(report.vehicle_count, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].vehicle_id(), VehicleId(2));
        assert_eq!(report.sections[0].events.len(), 2);
    }
}
