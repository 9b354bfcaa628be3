//! Crossing events, the continuous-time output of section extraction.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::sample::VehicleId;

/// The instant a vehicle passes a cross-section, in the direction of
/// increasing position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub vehicle_id: VehicleId,
    pub section_position: f64,
    pub crossing_time: f64,
    pub interpolated_speed: f64,
}

impl CrossingEvent {
    /// Chronological order: crossing time first, vehicle id as tie-break.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.crossing_time
            .total_cmp(&other.crossing_time)
            .then_with(|| self.vehicle_id.cmp(&other.vehicle_id))
    }
}

/// Sort events by crossing time, ties broken by vehicle id.
///
/// The sort is stable, so events that compare equal keep their input order.
pub fn sort_chronologically(events: &mut [CrossingEvent]) {
    events.sort_by(CrossingEvent::chronological_cmp);
}
