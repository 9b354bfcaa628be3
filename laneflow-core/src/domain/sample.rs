//! Trajectory samples and identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle identifier as assigned by the trajectory source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lane identifier as assigned by the trajectory source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LaneId(pub u32);

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One observation of one vehicle, already restricted to a single lane.
///
/// `position` is the longitudinal coordinate along the lane (feet for NGSIM),
/// `speed` the recorded instantaneous speed in position units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub vehicle_id: VehicleId,
    pub time_s: f64,
    pub position: f64,
    pub speed: f64,
}

impl TrajectorySample {
    pub fn new(vehicle_id: VehicleId, time_s: f64, position: f64, speed: f64) -> Self {
        Self {
            vehicle_id,
            time_s,
            position,
            speed,
        }
    }

    /// Returns true if time, position and speed are all finite.
    pub fn is_finite(&self) -> bool {
        self.time_s.is_finite() && self.position.is_finite() && self.speed.is_finite()
    }
}

/// A normalized row as produced by a loader, before lane filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub vehicle_id: VehicleId,
    pub time_s: f64,
    pub position: f64,
    pub speed: f64,
    pub lane: LaneId,
}

impl TrajectoryRecord {
    pub fn sample(&self) -> TrajectorySample {
        TrajectorySample::new(self.vehicle_id, self.time_s, self.position, self.speed)
    }
}
