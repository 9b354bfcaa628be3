//! Section crossing extraction: continuous-time events from sampled trajectories.
//!
//! For a section at position `s`, the crossing is bracketed by the first
//! adjacent pair with `y[i-1] < s <= y[i]` and placed by linear interpolation:
//!
//! ```text
//! t = t[i-1] + (s - y[i-1]) / (y[i] - y[i-1]) * (t[i] - t[i-1])
//! ```
//!
//! Only the first forward crossing counts, so a vehicle contributes at most
//! one event per section. A vehicle that never reaches the section (or never
//! moves forward) contributes none.

use serde::{Deserialize, Serialize};

use crate::domain::{sort_chronologically, CrossingEvent, TrajectorySample};
use crate::trajectory::{InputOrderError, TrajectoryTable, VehicleTrajectory};

/// How the speed attached to a crossing event is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedPolicy {
    /// Linear interpolation between the bracketing samples, like the time.
    #[default]
    Interpolate,
    /// Recorded speed of the nearer bracketing sample (ties go to the earlier one).
    NearestSample,
    /// Mean recorded speed over the vehicle's whole trajectory.
    VehicleMean,
}

/// Crossing extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossingConfig {
    #[serde(default)]
    pub speed_policy: SpeedPolicy,
}

// ─── Extraction ──────────────────────────────────────────────────────

/// Extracts crossing events from validated trajectories.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionCrossingExtractor {
    speed_policy: SpeedPolicy,
}

impl SectionCrossingExtractor {
    pub fn new(config: &CrossingConfig) -> Self {
        Self {
            speed_policy: config.speed_policy,
        }
    }

    pub fn speed_policy(&self) -> SpeedPolicy {
        self.speed_policy
    }

    /// The first forward crossing of `section` by `vehicle`, if any.
    pub fn extract(&self, vehicle: &VehicleTrajectory, section: f64) -> Option<CrossingEvent> {
        let samples = vehicle.samples();
        let (i, bracket) = locate(samples, section)?;
        let (before, after) = (&samples[i - 1], &samples[i]);

        let (crossing_time, interpolated) = match bracket {
            Bracket::OnSample => (after.time_s, after.speed),
            Bracket::Fraction(alpha) => (
                interior_time(before.time_s, after.time_s, alpha),
                before.speed + alpha * (after.speed - before.speed),
            ),
        };

        let speed = match self.speed_policy {
            SpeedPolicy::Interpolate => interpolated,
            SpeedPolicy::NearestSample => match bracket {
                Bracket::OnSample => after.speed,
                Bracket::Fraction(alpha) if alpha <= 0.5 => before.speed,
                Bracket::Fraction(_) => after.speed,
            },
            SpeedPolicy::VehicleMean => vehicle.mean_speed(),
        };

        Some(CrossingEvent {
            vehicle_id: vehicle.vehicle_id(),
            section_position: section,
            crossing_time,
            interpolated_speed: speed,
        })
    }

    /// Crossing events of one vehicle across every section, in section order.
    pub fn extract_all(&self, vehicle: &VehicleTrajectory, sections: &[f64]) -> Vec<CrossingEvent> {
        sections
            .iter()
            .filter_map(|&section| self.extract(vehicle, section))
            .collect()
    }
}

/// Validate a raw sample sequence, then extract the crossing of `section`.
///
/// An empty slice has nothing to cross and yields `Ok(None)`.
pub fn extract_crossing(
    samples: &[TrajectorySample],
    section: f64,
    config: &CrossingConfig,
) -> Result<Option<CrossingEvent>, InputOrderError> {
    let Some(first) = samples.first() else {
        return Ok(None);
    };
    let vehicle = VehicleTrajectory::new(first.vehicle_id, samples.to_vec())?;
    Ok(SectionCrossingExtractor::new(config).extract(&vehicle, section))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bracket {
    /// The later sample sits exactly on the section.
    OnSample,
    /// Interpolation fraction in (0, 1).
    Fraction(f64),
}

/// First pair index `i` with `y[i-1] < section <= y[i]`.
fn locate(samples: &[TrajectorySample], section: f64) -> Option<(usize, Bracket)> {
    samples.windows(2).enumerate().find_map(|(k, pair)| {
        let (before, after) = (&pair[0], &pair[1]);
        if !(before.position < section && section <= after.position) {
            return None;
        }
        let bracket = if section == after.position {
            Bracket::OnSample
        } else {
            Bracket::Fraction((section - before.position) / (after.position - before.position))
        };
        Some((k + 1, bracket))
    })
}

/// `t0 + alpha·(t1 - t0)`, kept strictly inside `(t0, t1)`.
///
/// Rounding can land an interior crossing on either sample time when the
/// section is a few ulps from a sample position. Two adjacent floats have
/// nothing between them; the rounded value is returned as is.
fn interior_time(t0: f64, t1: f64, alpha: f64) -> f64 {
    let t = t0 + alpha * (t1 - t0);
    let (lo, hi) = (next_up(t0), next_down(t1));
    if lo > hi {
        return t;
    }
    t.clamp(lo, hi)
}

/// Smallest float greater than a finite `x`.
fn next_up(x: f64) -> f64 {
    if x == 0.0 {
        f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() + 1)
    } else {
        f64::from_bits(x.to_bits() - 1)
    }
}

/// Largest float smaller than a finite `x`.
fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

// ─── Per-section grouping ────────────────────────────────────────────

/// All crossing events of one section, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionEvents {
    pub section_position: f64,
    pub events: Vec<CrossingEvent>,
}

/// Crossing events grouped by section, one group per configured section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCrossings {
    sections: Vec<SectionEvents>,
}

impl SectionCrossings {
    /// Group events by section and sort every group chronologically.
    ///
    /// Events may arrive in any order, e.g. from a parallel extraction.
    pub fn assemble<I>(sections: &[f64], events: I) -> Self
    where
        I: IntoIterator<Item = CrossingEvent>,
    {
        let mut groups: Vec<SectionEvents> = sections
            .iter()
            .map(|&section_position| SectionEvents {
                section_position,
                events: Vec::new(),
            })
            .collect();

        for event in events {
            if let Some(group) = groups
                .iter_mut()
                .find(|g| g.section_position == event.section_position)
            {
                group.events.push(event);
            }
        }

        for group in &mut groups {
            sort_chronologically(&mut group.events);
        }

        Self { sections: groups }
    }

    /// Sequential extraction over a whole table.
    pub fn extract(
        table: &TrajectoryTable,
        sections: &[f64],
        extractor: &SectionCrossingExtractor,
    ) -> Self {
        Self::assemble(
            sections,
            table
                .vehicles()
                .iter()
                .flat_map(|v| extractor.extract_all(v, sections)),
        )
    }

    pub fn sections(&self) -> &[SectionEvents] {
        &self.sections
    }

    pub fn into_sections(self) -> Vec<SectionEvents> {
        self.sections
    }

    pub fn total_events(&self) -> usize {
        self.sections.iter().map(|s| s.events.len()).sum()
    }
}
