//! Trajectory loading and data resolution for the runner.
//!
//! Two on-disk formats are supported:
//! - **NGSIM**: raw whitespace-separated text with 18+ columns per row
//! - **CSV**: normalized `vehicle_id,time_s,position,speed,lane` with header
//!
//! Resolution policy:
//! 1. If a file is configured → load it
//! 2. If no file and synthetic is enabled → generate seeded trajectories (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! Rows become fixed [`TrajectoryRecord`]s here; nothing downstream looks at
//! column names or positions.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use laneflow_core::domain::{LaneId, TrajectoryRecord, VehicleId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DataConfig, DataFormat};
use crate::synthetic::{generate_trajectories, SyntheticConfig, SyntheticError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no trajectory file configured (use --synthetic for synthetic data)")]
    NoDataSource,

    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("no rows for lane {lane}")]
    NoRowsForLane { lane: LaneId },

    #[error("synthetic data: {0}")]
    Synthetic(#[from] SyntheticError),
}

/// Where loaded rows came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    File { path: PathBuf, format: DataFormat },
    Synthetic { seed: u64 },
}

/// Result of loading trajectories, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// All rows of every lane, in file order.
    pub records: Vec<TrajectoryRecord>,
    pub source: DataSource,
    /// BLAKE3 over every loaded row.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }

    /// Rows belonging to `lane`.
    pub fn lane_records(&self, lane: LaneId) -> Result<Vec<TrajectoryRecord>, LoadError> {
        let rows: Vec<_> = self.records.iter().filter(|r| r.lane == lane).copied().collect();
        if rows.is_empty() {
            return Err(LoadError::NoRowsForLane { lane });
        }
        Ok(rows)
    }
}

/// Load trajectories per the data config, with synthetic fallback.
pub fn load_trajectories(data: &DataConfig, synthetic: &SyntheticConfig) -> Result<LoadedData, LoadError> {
    let (records, source) = match &data.path {
        Some(path) => {
            let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let records = match data.format {
                DataFormat::Ngsim => parse_ngsim(file)?,
                DataFormat::Csv => read_csv(file)?,
            };
            info!(path = %path.display(), rows = records.len(), "loaded trajectories");
            (
                records,
                DataSource::File {
                    path: path.clone(),
                    format: data.format,
                },
            )
        }
        None if data.synthetic => {
            warn!(
                seed = synthetic.seed,
                vehicles = synthetic.vehicles,
                "generating synthetic trajectories; results will be tagged as synthetic"
            );
            (
                generate_trajectories(synthetic)?,
                DataSource::Synthetic { seed: synthetic.seed },
            )
        }
        None => return Err(LoadError::NoDataSource),
    };

    let dataset_hash = compute_dataset_hash(&records);
    Ok(LoadedData {
        records,
        source,
        dataset_hash,
    })
}

/// Load a trajectory file without going through a config.
pub fn load_file(path: &Path, format: DataFormat) -> Result<LoadedData, LoadError> {
    let data = DataConfig {
        path: Some(path.to_path_buf()),
        format,
        ..DataConfig::default()
    };
    load_trajectories(&data, &SyntheticConfig::default())
}

// ─── NGSIM ───────────────────────────────────────────────────────────

/// NGSIM frames are 0.1 s apart.
const NGSIM_FRAME_S: f64 = 0.1;
const NGSIM_MIN_COLUMNS: usize = 18;
const COL_VEHICLE_ID: usize = 0;
const COL_FRAME_ID: usize = 1;
const COL_LOCAL_Y: usize = 5;
const COL_VELOCITY: usize = 11;
const COL_LANE_ID: usize = 13;

/// Parse raw NGSIM whitespace-separated trajectory text. Blank lines are skipped.
pub fn parse_ngsim<R: Read>(reader: R) -> Result<Vec<TrajectoryRecord>, LoadError> {
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| LoadError::Io {
            path: PathBuf::from("<ngsim>"),
            source,
        })?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < NGSIM_MIN_COLUMNS {
            return Err(LoadError::MalformedLine {
                line: line_no,
                reason: format!("expected at least {NGSIM_MIN_COLUMNS} columns, found {}", fields.len()),
            });
        }

        let vehicle: u64 = parse_field(&fields, COL_VEHICLE_ID, "Vehicle ID", line_no)?;
        let frame: u64 = parse_field(&fields, COL_FRAME_ID, "Frame ID", line_no)?;
        let position: f64 = parse_field(&fields, COL_LOCAL_Y, "Local Y", line_no)?;
        let speed: f64 = parse_field(&fields, COL_VELOCITY, "Vehicle Velocity", line_no)?;
        let lane: u32 = parse_field(&fields, COL_LANE_ID, "Lane ID", line_no)?;

        records.push(TrajectoryRecord {
            vehicle_id: VehicleId(vehicle),
            time_s: frame as f64 * NGSIM_FRAME_S,
            position,
            speed,
            lane: LaneId(lane),
        });
    }
    Ok(records)
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    col: usize,
    name: &str,
    line: usize,
) -> Result<T, LoadError>
where
    T::Err: std::fmt::Display,
{
    fields[col].parse().map_err(|e| LoadError::MalformedLine {
        line,
        reason: format!("{name} '{}': {e}", fields[col]),
    })
}

// ─── CSV ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    vehicle_id: u64,
    time_s: f64,
    position: f64,
    speed: f64,
    lane: u32,
}

impl From<CsvRow> for TrajectoryRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            vehicle_id: VehicleId(row.vehicle_id),
            time_s: row.time_s,
            position: row.position,
            speed: row.speed,
            lane: LaneId(row.lane),
        }
    }
}

impl From<&TrajectoryRecord> for CsvRow {
    fn from(r: &TrajectoryRecord) -> Self {
        Self {
            vehicle_id: r.vehicle_id.0,
            time_s: r.time_s,
            position: r.position,
            speed: r.speed,
            lane: r.lane.0,
        }
    }
}

/// Read normalized trajectory CSV.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<TrajectoryRecord>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize::<CsvRow>()
        .map(|row| row.map(TrajectoryRecord::from).map_err(LoadError::from))
        .collect()
}

/// Write records as normalized trajectory CSV.
pub fn write_csv(records: &[TrajectoryRecord]) -> Result<String, LoadError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for r in records {
        wtr.serialize(CsvRow::from(r))?;
    }
    let data = wtr.into_inner().map_err(|e| LoadError::Io {
        path: PathBuf::from("<csv>"),
        source: e.into_error(),
    })?;
    String::from_utf8(data).map_err(|e| LoadError::MalformedLine {
        line: 0,
        reason: format!("CSV output is not valid UTF-8: {e}"),
    })
}

// ─── Provenance ──────────────────────────────────────────────────────

/// Deterministic BLAKE3 hash over all loaded rows, in load order.
fn compute_dataset_hash(records: &[TrajectoryRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for r in records {
        hasher.update(&r.vehicle_id.0.to_le_bytes());
        hasher.update(&r.time_s.to_le_bytes());
        hasher.update(&r.position.to_le_bytes());
        hasher.update(&r.speed.to_le_bytes());
        hasher.update(&r.lane.0.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Two NGSIM rows in the US-101 column layout.
    const NGSIM_SAMPLE: &str = "\
2 13 437 1118846980200 16.467 35.381 6451137.641 1873344.962 14.5 4.9 2 40.00 0.00 2 0 0 0.00 0.00
2 14 437 1118846980300 16.447 39.381 6451137.783 1873348.963 14.5 4.9 2 40.00 0.00 2 0 0 0.00 0.00

3 20 400 1118846981000 28.100 10.000 6451140.000 1873320.000 15.0 6.0 2 35.50 0.10 3 2 0 50.00 1.40
";

    #[test]
    fn parses_ngsim_columns() {
        let records = parse_ngsim(NGSIM_SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        let r = records[0];
        assert_eq!(r.vehicle_id, VehicleId(2));
        assert!((r.time_s - 1.3).abs() < 1e-12);
        assert_eq!(r.position, 35.381);
        assert_eq!(r.speed, 40.0);
        assert_eq!(r.lane, LaneId(2));
        assert_eq!(records[2].lane, LaneId(3));
    }

    #[test]
    fn short_ngsim_line_is_malformed() {
        let err = parse_ngsim("1 2 3 4 5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn bad_ngsim_number_names_the_column() {
        let line = "2 x 437 0 0 35.0 0 0 0 0 2 40.0 0 2 0 0 0 0\n";
        let err = parse_ngsim(line.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Frame ID"));
    }

    #[test]
    fn csv_round_trip() {
        let records = parse_ngsim(NGSIM_SAMPLE.as_bytes()).unwrap();
        let text = write_csv(&records).unwrap();
        assert!(text.starts_with("vehicle_id,time_s,position,speed,lane\n"));
        let back = read_csv(text.as_bytes()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn load_file_hashes_deterministically() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(NGSIM_SAMPLE.as_bytes()).unwrap();
        let a = load_file(file.path(), DataFormat::Ngsim).unwrap();
        let b = load_file(file.path(), DataFormat::Ngsim).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.dataset_hash.len(), 64);
        assert!(!a.is_synthetic());
        assert_eq!(a.lane_records(LaneId(2)).unwrap().len(), 2);
        assert!(matches!(
            a.lane_records(LaneId(9)),
            Err(LoadError::NoRowsForLane { lane: LaneId(9) })
        ));
    }

    #[test]
    fn missing_source_without_synthetic_fails() {
        let err = load_trajectories(&DataConfig::default(), &SyntheticConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::NoDataSource));
    }

    #[test]
    fn synthetic_fallback_is_tagged() {
        let data = DataConfig {
            synthetic: true,
            ..DataConfig::default()
        };
        let synthetic = SyntheticConfig {
            vehicles: 5,
            ..SyntheticConfig::default()
        };
        let loaded = load_trajectories(&data, &synthetic).unwrap();
        assert!(loaded.is_synthetic());
        assert_eq!(loaded.source, DataSource::Synthetic { seed: 42 });
        assert!(!loaded.records.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_file(Path::new("/nonexistent/lane.txt"), DataFormat::Csv).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
