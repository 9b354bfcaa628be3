//! Domain types for LaneFlow

pub mod crossing;
pub mod measure;
pub mod sample;

pub use crossing::{sort_chronologically, CrossingEvent};
pub use measure::{Measure, UndefinedReason};
pub use sample::{LaneId, TrajectoryRecord, TrajectorySample, VehicleId};
