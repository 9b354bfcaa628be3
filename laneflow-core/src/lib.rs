//! Laneflow Core: section crossings and traffic-flow statistics for one lane.
//!
//! This crate turns discretely sampled vehicle trajectories into continuous-time
//! crossing events and derives flow statistics from them:
//! - Validated per-vehicle trajectories (ordering, duplicates, finiteness)
//! - Section crossing extraction by linear interpolation
//! - Headways, CV and flow regime classification
//! - Exponential / lognormal headway fits (Kolmogorov-Smirnov)
//! - Per-window arrival counts and a Poisson chi-square test
//! - Per-window flow rate, time-mean and space-mean speed
//! - Greenshields fundamental diagram
//!
//! Every engine is a pure function over immutable slices, configured through
//! [`config::AnalysisConfig`].

pub mod arrival;
pub mod config;
pub mod crossing;
pub mod domain;
pub mod error;
pub mod flow_speed;
pub mod fundamental;
pub mod headway;
pub mod headway_fit;
pub mod stats;
pub mod trajectory;
pub mod windowing;

pub use arrival::{analyze_arrivals, ArrivalAnalysis, ArrivalConfig, FitDecision};
pub use config::{AnalysisConfig, ConfigError};
pub use crossing::{extract_crossing, SectionCrossingExtractor, SectionCrossings, SpeedPolicy};
pub use domain::{
    CrossingEvent, LaneId, Measure, TrajectoryRecord, TrajectorySample, UndefinedReason,
    VehicleId,
};
pub use error::InsufficientDataError;
pub use flow_speed::{compute_flow_speed, FlowSpeedConfig, FlowSpeedSample, ZeroSpeedPolicy};
pub use fundamental::{fundamental_diagram, FundamentalDiagram};
pub use headway::{compute_headways, FlowRegime, HeadwayAnalysis};
pub use headway_fit::{fit_headway_distribution, HeadwayDistributionFit, HeadwayModel};
pub use trajectory::{InputOrderError, TrajectoryTable, VehicleTrajectory};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: result and config types can cross rayon workers.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Inputs
        require_send::<TrajectorySample>();
        require_sync::<TrajectorySample>();
        require_send::<VehicleTrajectory>();
        require_sync::<VehicleTrajectory>();
        require_send::<TrajectoryTable>();
        require_sync::<TrajectoryTable>();

        // Engines and config
        require_send::<SectionCrossingExtractor>();
        require_sync::<SectionCrossingExtractor>();
        require_send::<AnalysisConfig>();
        require_sync::<AnalysisConfig>();

        // Results
        require_send::<CrossingEvent>();
        require_sync::<CrossingEvent>();
        require_send::<HeadwayAnalysis>();
        require_sync::<HeadwayAnalysis>();
        require_send::<HeadwayDistributionFit>();
        require_sync::<HeadwayDistributionFit>();
        require_send::<ArrivalAnalysis>();
        require_sync::<ArrivalAnalysis>();
        require_send::<FlowSpeedSample>();
        require_sync::<FlowSpeedSample>();
        require_send::<FundamentalDiagram>();
        require_sync::<FundamentalDiagram>();

        // Errors
        require_send::<InputOrderError>();
        require_sync::<InputOrderError>();
        require_send::<InsufficientDataError>();
        require_sync::<InsufficientDataError>();
    }

    #[test]
    fn worked_example_end_to_end() {
        let config = AnalysisConfig {
            sections: vec![400.0],
            ..AnalysisConfig::default()
        };
        let records: Vec<TrajectoryRecord> = [(1, 10.0, 30.0), (2, 12.0, 20.0), (3, 12.5, 25.0)]
            .iter()
            .flat_map(|&(id, t, v)| {
                // Constant speed through the section, one sample either side.
                [-1.0, 1.0].map(move |dt| TrajectoryRecord {
                    vehicle_id: VehicleId(id),
                    time_s: t + dt,
                    position: 400.0 + v * dt,
                    speed: v,
                    lane: LaneId(1),
                })
            })
            .collect();

        let table = TrajectoryTable::for_lane(&records, LaneId(1));
        let extractor = SectionCrossingExtractor::new(&config.crossing);
        let crossings = SectionCrossings::extract(&table, &config.sections, &extractor);
        let events = &crossings.sections()[0].events;
        let times: Vec<f64> = events.iter().map(|e| e.crossing_time).collect();
        assert_eq!(times, vec![10.0, 12.0, 12.5]);

        let headways = compute_headways(events, &config.headway);
        assert_eq!(headways.summary().and_then(|s| s.regime), Some(FlowRegime::Congested));

        let flow = compute_flow_speed(events, config.window_width_s, &config.flow_speed).unwrap();
        assert!((flow[0].time_mean_speed.value().unwrap() - 25.0).abs() < 1e-9);
    }
}
