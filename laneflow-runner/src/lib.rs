//! Laneflow Runner: lane analysis orchestration, data loading, export.
//!
//! This crate builds on `laneflow-core` to provide:
//! - TOML run configuration
//! - NGSIM and normalized CSV loaders with synthetic fallback
//! - Seeded synthetic trajectories
//! - Parallel crossing extraction and per-section analysis
//! - JSON, CSV and text reports

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod synthetic;

pub use config::{ConfigError, DataConfig, DataFormat, RunConfig};
pub use data_loader::{load_file, load_trajectories, DataSource, LoadError, LoadedData};
pub use export::{export_crossings_csv, export_flow_csv, export_json, import_json, render_text_summary};
pub use runner::{
    analyze_records, run_from_data, run_lane_analysis, LaneAnalysis, LaneReport, RunError,
    SectionReport, SCHEMA_VERSION,
};
pub use synthetic::{generate_trajectories, SyntheticConfig, SyntheticError};
