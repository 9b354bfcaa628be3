//! Seeded synthetic trajectories for development and testing.
//!
//! Vehicles enter at position 0 with exponential gaps (Poisson arrivals) and
//! drive the road at a per-vehicle cruising speed with small per-frame noise.
//! Samples are quantized to the frame grid the way NGSIM frames are, so
//! crossings fall between samples and exercise interpolation.
//!
//! Runs on synthetic data are tagged in the report.

use laneflow_core::domain::{LaneId, TrajectoryRecord, VehicleId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SyntheticError {
    #[error("invalid synthetic parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("up to {frames} frames per vehicle, at most {max} allowed")]
    TooManyFrames { frames: f64, max: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub vehicles: usize,
    /// Mean arrivals per second at the road entry.
    pub arrival_rate: f64,
    /// Mean cruising speed, ft/s.
    pub mean_speed: f64,
    pub speed_std_dev: f64,
    /// Distance driven by each vehicle, ft.
    pub road_length: f64,
    /// Sampling interval, s.
    pub frame_s: f64,
    pub lane: LaneId,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            vehicles: 300,
            arrival_rate: 0.5,
            mean_speed: 45.0,
            speed_std_dev: 6.0,
            road_length: 800.0,
            frame_s: 0.1,
            lane: LaneId(2),
        }
    }
}

/// Slowest cruising speed a generated vehicle may have, ft/s.
const MIN_SPEED: f64 = 5.0;
/// Per-frame speed jitter, ft/s.
const FRAME_NOISE: f64 = 0.5;
/// Upper bound on samples generated for one vehicle.
pub const MAX_FRAMES_PER_VEHICLE: usize = 100_000;

/// Generate trajectories for `config.vehicles` vehicles, grouped by vehicle.
pub fn generate_trajectories(config: &SyntheticConfig) -> Result<Vec<TrajectoryRecord>, SyntheticError> {
    if !(config.frame_s > 0.0 && config.frame_s.is_finite()) {
        return Err(SyntheticError::InvalidParameter {
            name: "frame_s",
            value: config.frame_s,
        });
    }
    if !(config.road_length > 0.0 && config.road_length.is_finite()) {
        return Err(SyntheticError::InvalidParameter {
            name: "road_length",
            value: config.road_length,
        });
    }
    if !(config.arrival_rate > 0.0 && config.arrival_rate.is_finite()) {
        return Err(SyntheticError::InvalidParameter {
            name: "arrival_rate",
            value: config.arrival_rate,
        });
    }
    // Every frame advances at least MIN_SPEED · frame_s.
    let frames = (config.road_length / (MIN_SPEED * config.frame_s)).ceil() + 1.0;
    if !(frames <= MAX_FRAMES_PER_VEHICLE as f64) {
        return Err(SyntheticError::TooManyFrames {
            frames,
            max: MAX_FRAMES_PER_VEHICLE,
        });
    }
    let gaps = Exp::new(config.arrival_rate).map_err(|_| SyntheticError::InvalidParameter {
        name: "arrival_rate",
        value: config.arrival_rate,
    })?;
    let cruise = Normal::new(config.mean_speed, config.speed_std_dev).map_err(|_| {
        SyntheticError::InvalidParameter {
            name: "speed_std_dev",
            value: config.speed_std_dev,
        }
    })?;
    let jitter = Normal::new(0.0, FRAME_NOISE).map_err(|_| SyntheticError::InvalidParameter {
        name: "frame_noise",
        value: FRAME_NOISE,
    })?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut records = Vec::new();
    let mut entry_time = 0.0_f64;

    for v in 0..config.vehicles {
        entry_time += gaps.sample(&mut rng);
        let speed = cruise.sample(&mut rng).max(MIN_SPEED);
        let id = VehicleId(v as u64 + 1);

        // First frame at or after entry.
        let mut frame = (entry_time / config.frame_s).ceil() as u64;
        let mut time_s = frame as f64 * config.frame_s;
        let mut position = speed * (time_s - entry_time);
        loop {
            let frame_speed = (speed + jitter.sample(&mut rng)).max(MIN_SPEED);
            records.push(TrajectoryRecord {
                vehicle_id: id,
                time_s,
                position,
                speed: frame_speed,
                lane: config.lane,
            });
            if position >= config.road_length {
                break;
            }
            frame += 1;
            let next_time = frame as f64 * config.frame_s;
            position += frame_speed * (next_time - time_s);
            time_s = next_time;
        }
    }

    Ok(records)
}
