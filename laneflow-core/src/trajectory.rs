//! Validated per-vehicle sample sequences for one lane.
//!
//! Rows are grouped by vehicle in the order they arrive. Each group is then
//! validated exactly once:
//! - at least one sample
//! - every field finite
//! - every sample tagged with the group's vehicle id
//! - time strictly increasing (a repeated timestamp is a data-quality error)
//!
//! Grouping never sorts; out-of-order samples surface as an `InputOrderError`.
//! A rejected vehicle is skipped and logged; the rest of the lane is kept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{LaneId, TrajectoryRecord, TrajectorySample, VehicleId};

/// A malformed vehicle trajectory. Fatal for that vehicle only.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputOrderError {
    #[error(
        "vehicle {vehicle_id}: sample {index} at t={time_s} precedes previous sample at t={previous_time_s}"
    )]
    OutOfOrder {
        vehicle_id: VehicleId,
        index: usize,
        previous_time_s: f64,
        time_s: f64,
    },

    #[error("vehicle {vehicle_id}: duplicate timestamp t={time_s} at sample {index}")]
    DuplicateTimestamp {
        vehicle_id: VehicleId,
        index: usize,
        time_s: f64,
    },

    #[error("vehicle {vehicle_id}: sample {index} has a non-finite field")]
    NonFiniteSample { vehicle_id: VehicleId, index: usize },

    #[error("vehicle {vehicle_id}: sample {index} belongs to vehicle {found}")]
    ForeignSample {
        vehicle_id: VehicleId,
        index: usize,
        found: VehicleId,
    },

    #[error("vehicle {vehicle_id}: trajectory has no samples")]
    EmptyTrajectory { vehicle_id: VehicleId },
}

impl InputOrderError {
    /// The vehicle whose trajectory was rejected.
    pub fn vehicle_id(&self) -> VehicleId {
        match self {
            Self::OutOfOrder { vehicle_id, .. }
            | Self::DuplicateTimestamp { vehicle_id, .. }
            | Self::NonFiniteSample { vehicle_id, .. }
            | Self::ForeignSample { vehicle_id, .. }
            | Self::EmptyTrajectory { vehicle_id } => *vehicle_id,
        }
    }
}

// ─── Vehicle trajectory ──────────────────────────────────────────────

/// A single vehicle's samples, guaranteed time-ordered.
///
/// Only constructible through [`VehicleTrajectory::new`], so every consumer
/// can rely on the ordering invariant without re-checking it.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTrajectory {
    vehicle_id: VehicleId,
    samples: Vec<TrajectorySample>,
}

impl VehicleTrajectory {
    /// Validate and wrap a vehicle's samples.
    pub fn new(
        vehicle_id: VehicleId,
        samples: Vec<TrajectorySample>,
    ) -> Result<Self, InputOrderError> {
        if samples.is_empty() {
            return Err(InputOrderError::EmptyTrajectory { vehicle_id });
        }

        for (index, sample) in samples.iter().enumerate() {
            if sample.vehicle_id != vehicle_id {
                return Err(InputOrderError::ForeignSample {
                    vehicle_id,
                    index,
                    found: sample.vehicle_id,
                });
            }
            if !sample.is_finite() {
                return Err(InputOrderError::NonFiniteSample { vehicle_id, index });
            }
            if index > 0 {
                let previous = samples[index - 1].time_s;
                if sample.time_s == previous {
                    return Err(InputOrderError::DuplicateTimestamp {
                        vehicle_id,
                        index,
                        time_s: sample.time_s,
                    });
                }
                if sample.time_s < previous {
                    return Err(InputOrderError::OutOfOrder {
                        vehicle_id,
                        index,
                        previous_time_s: previous,
                        time_s: sample.time_s,
                    });
                }
            }
        }

        Ok(Self {
            vehicle_id,
            samples,
        })
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: validation rejects empty trajectories.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean of the recorded speeds over the whole trajectory.
    pub fn mean_speed(&self) -> f64 {
        self.samples.iter().map(|s| s.speed).sum::<f64>() / self.samples.len() as f64
    }
}

// ─── Trajectory table ────────────────────────────────────────────────

/// All valid vehicle trajectories of one lane, plus the rejected ones.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryTable {
    vehicles: Vec<VehicleTrajectory>,
    rejected: Vec<InputOrderError>,
}

impl TrajectoryTable {
    /// Group samples by vehicle (input order kept) and validate each group.
    ///
    /// Vehicles come out in ascending id order.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = TrajectorySample>,
    {
        let mut groups: BTreeMap<VehicleId, Vec<TrajectorySample>> = BTreeMap::new();
        for sample in samples {
            groups.entry(sample.vehicle_id).or_default().push(sample);
        }

        let mut vehicles = Vec::with_capacity(groups.len());
        let mut rejected = Vec::new();

        for (vehicle_id, group) in groups {
            match VehicleTrajectory::new(vehicle_id, group) {
                Ok(trajectory) => vehicles.push(trajectory),
                Err(e) => {
                    warn!(vehicle = %vehicle_id, error = %e, "skipping malformed trajectory");
                    rejected.push(e);
                }
            }
        }

        Self { vehicles, rejected }
    }

    /// Keep only the records of `lane`, then build the table.
    pub fn for_lane(records: &[TrajectoryRecord], lane: LaneId) -> Self {
        Self::from_samples(
            records
                .iter()
                .filter(|r| r.lane == lane)
                .map(TrajectoryRecord::sample),
        )
    }

    pub fn vehicles(&self) -> &[VehicleTrajectory] {
        &self.vehicles
    }

    pub fn rejected(&self) -> &[InputOrderError] {
        &self.rejected
    }

    /// Number of samples across all valid vehicles.
    pub fn sample_count(&self) -> usize {
        self.vehicles.iter().map(VehicleTrajectory::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}
