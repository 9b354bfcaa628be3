//! Fundamental diagram from windowed flow and speed.
//!
//! Each window with a defined space-mean speed becomes a (density, speed)
//! point; Greenshields' linear speed-density model `v = vf - (vf/kj)·k` is
//! fitted by least squares. Speeds are converted from ft/s to mph so density
//! comes out in vehicles per mile.

use serde::{Deserialize, Serialize};

use crate::error::InsufficientDataError;
use crate::flow_speed::FlowSpeedSample;

const FT_PER_S_TO_MPH: f64 = 3600.0 / 5280.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalConfig {
    /// Minimum number of usable points for a fit.
    pub min_points: usize,
    /// Points at or above this density (veh/mi) are dropped as outliers.
    pub max_density: f64,
}

impl Default for FundamentalConfig {
    fn default() -> Self {
        Self {
            min_points: 5,
            max_density: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub window_index: usize,
    pub flow_vph: f64,
    pub speed_mph: f64,
    /// Vehicles per mile.
    pub density: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreenshieldsFit {
    /// Free-flow speed, mph.
    pub free_flow_speed: f64,
    /// Jam density, veh/mi.
    pub jam_density: f64,
    /// Maximum flow vf·kj/4, veh/h.
    pub capacity: f64,
    /// Density at capacity, kj/2.
    pub critical_density: f64,
    pub r_squared: f64,
    pub points_used: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalDiagram {
    pub points: Vec<DensityPoint>,
    pub fit: Result<GreenshieldsFit, InsufficientDataError>,
}

/// (density, speed) points for windows with a positive space-mean speed.
pub fn density_points(samples: &[FlowSpeedSample]) -> Vec<DensityPoint> {
    samples
        .iter()
        .filter_map(|s| {
            let v = s.space_mean_speed.value().filter(|&v| v > 0.0)?;
            let speed_mph = v * FT_PER_S_TO_MPH;
            Some(DensityPoint {
                window_index: s.window_index,
                flow_vph: s.flow_rate_vph,
                speed_mph,
                density: s.flow_rate_vph / speed_mph,
            })
        })
        .collect()
}

/// Least-squares Greenshields fit over the usable points.
pub fn fit_greenshields(
    points: &[DensityPoint],
    config: &FundamentalConfig,
) -> Result<GreenshieldsFit, InsufficientDataError> {
    let usable: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| p.density > 0.0 && p.density < config.max_density && p.speed_mph > 0.0)
        .map(|p| (p.density, p.speed_mph))
        .collect();
    if usable.len() < config.min_points {
        return Err(InsufficientDataError::TooFewPoints {
            points: usable.len(),
            required: config.min_points,
        });
    }

    let n = usable.len() as f64;
    let mean_k = usable.iter().map(|(k, _)| k).sum::<f64>() / n;
    let mean_v = usable.iter().map(|(_, v)| v).sum::<f64>() / n;
    let sxx: f64 = usable.iter().map(|(k, _)| (k - mean_k).powi(2)).sum();
    let sxy: f64 = usable.iter().map(|(k, v)| (k - mean_k) * (v - mean_v)).sum();
    if sxx == 0.0 {
        return Err(InsufficientDataError::NonDecreasingSpeed { slope: 0.0 });
    }

    let slope = sxy / sxx;
    if slope >= 0.0 {
        return Err(InsufficientDataError::NonDecreasingSpeed { slope });
    }
    let intercept = mean_v - slope * mean_k;

    let ss_tot: f64 = usable.iter().map(|(_, v)| (v - mean_v).powi(2)).sum();
    let ss_res: f64 = usable
        .iter()
        .map(|(k, v)| (v - (intercept + slope * k)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

    let free_flow_speed = intercept;
    let jam_density = -intercept / slope;
    Ok(GreenshieldsFit {
        free_flow_speed,
        jam_density,
        capacity: free_flow_speed * jam_density / 4.0,
        critical_density: jam_density / 2.0,
        r_squared,
        points_used: usable.len(),
    })
}

/// Density points plus the Greenshields fit for one section.
pub fn fundamental_diagram(samples: &[FlowSpeedSample], config: &FundamentalConfig) -> FundamentalDiagram {
    let points = density_points(samples);
    let fit = fit_greenshields(&points, config);
    FundamentalDiagram { points, fit }
}
