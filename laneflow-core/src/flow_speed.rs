//! Windowed flow and mean speeds at one section.
//!
//! Per window: flow rate in vehicles/hour, time-mean speed (arithmetic mean of
//! crossing speeds) and space-mean speed (harmonic mean). Windows share the
//! arrival histogram's binning.

use serde::{Deserialize, Serialize};

use crate::domain::{CrossingEvent, Measure, UndefinedReason};
use crate::error::InsufficientDataError;
use crate::windowing::TimeWindows;

/// How non-positive crossing speeds enter the speed means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroSpeedPolicy {
    /// Keep them; the space-mean speed of the window becomes undefined.
    #[default]
    Propagate,
    /// Count them toward flow only and leave them out of both speed means.
    Exclude,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSpeedConfig {
    #[serde(default)]
    pub zero_speed_policy: ZeroSpeedPolicy,
}

/// Flow and speed statistics of one time window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowSpeedSample {
    pub window_index: usize,
    pub window_start: f64,
    pub window_end: f64,
    pub vehicle_count: u32,
    /// Vehicles per hour.
    pub flow_rate_vph: f64,
    pub time_mean_speed: Measure,
    pub space_mean_speed: Measure,
    /// Crossings with a non-positive speed.
    pub zero_speed_count: u32,
}

/// Flow and mean speeds for every window covering the events.
pub fn compute_flow_speed(
    events: &[CrossingEvent],
    window_width: f64,
    config: &FlowSpeedConfig,
) -> Result<Vec<FlowSpeedSample>, InsufficientDataError> {
    let windows = TimeWindows::for_events(events, window_width)?;

    let mut speeds: Vec<Vec<f64>> = vec![Vec::new(); windows.count()];
    for e in events {
        speeds[windows.index_of(e.crossing_time)].push(e.interpolated_speed);
    }

    Ok(speeds
        .iter()
        .enumerate()
        .map(|(k, window_speeds)| {
            let (window_start, window_end) = windows.bounds(k);
            window_sample(k, window_start, window_end, window_width, window_speeds, config)
        })
        .collect())
}

fn window_sample(
    window_index: usize,
    window_start: f64,
    window_end: f64,
    width: f64,
    speeds: &[f64],
    config: &FlowSpeedConfig,
) -> FlowSpeedSample {
    let vehicle_count = speeds.len() as u32;
    let zero_speed_count = speeds.iter().filter(|&&v| v <= 0.0).count() as u32;
    let flow_rate_vph = vehicle_count as f64 / width * 3600.0;

    let (time_mean_speed, space_mean_speed) = if speeds.is_empty() {
        (
            Measure::Undefined(UndefinedReason::NoVehicles),
            Measure::Undefined(UndefinedReason::NoVehicles),
        )
    } else {
        match config.zero_speed_policy {
            ZeroSpeedPolicy::Propagate => (
                arithmetic_mean(speeds),
                if zero_speed_count > 0 {
                    Measure::Undefined(UndefinedReason::DivideByZeroSpeed)
                } else {
                    harmonic_mean(speeds)
                },
            ),
            ZeroSpeedPolicy::Exclude => {
                let moving: Vec<f64> = speeds.iter().copied().filter(|&v| v > 0.0).collect();
                if moving.is_empty() {
                    (
                        Measure::Undefined(UndefinedReason::DivideByZeroSpeed),
                        Measure::Undefined(UndefinedReason::DivideByZeroSpeed),
                    )
                } else {
                    (arithmetic_mean(&moving), harmonic_mean(&moving))
                }
            }
        }
    };

    FlowSpeedSample {
        window_index,
        window_start,
        window_end,
        vehicle_count,
        flow_rate_vph,
        time_mean_speed,
        space_mean_speed,
        zero_speed_count,
    }
}

fn arithmetic_mean(speeds: &[f64]) -> Measure {
    Measure::Value(speeds.iter().sum::<f64>() / speeds.len() as f64)
}

/// Harmonic mean of strictly positive speeds.
fn harmonic_mean(speeds: &[f64]) -> Measure {
    let inverse_sum: f64 = speeds.iter().map(|v| 1.0 / v).sum();
    Measure::Value(speeds.len() as f64 / inverse_sum)
}
