//! Reporting and export: JSON, CSV and plain-text renderings of a lane report.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-window flow/speed table and the crossing event list
//! - **Text**: human-readable summary per section
//!
//! Exported JSON carries a `schema_version`; newer versions are rejected on load.
//! Undefined statistics are written as `undefined:<reason>`, never as a number.

use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use laneflow_core::domain::{Measure, UndefinedReason};

use crate::runner::{LaneAnalysis, LaneReport, SectionReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `LaneReport` to pretty JSON.
pub fn export_json(report: &LaneReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize LaneReport to JSON")
}

/// Deserialize a `LaneReport` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<LaneReport> {
    let report: LaneReport =
        serde_json::from_str(json).context("failed to deserialize LaneReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export per-window flow and speed for every section.
///
/// Columns: section_position, window_index, window_start, window_end,
/// vehicle_count, flow_rate_vph, time_mean_speed, space_mean_speed,
/// zero_speed_count. Sections without events contribute no rows.
pub fn export_flow_csv(analysis: &LaneAnalysis) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "section_position",
        "window_index",
        "window_start",
        "window_end",
        "vehicle_count",
        "flow_rate_vph",
        "time_mean_speed",
        "space_mean_speed",
        "zero_speed_count",
    ])?;

    for section in &analysis.sections {
        let Ok(samples) = &section.flow_speed else {
            continue;
        };
        for s in samples {
            wtr.write_record([
                &format!("{}", section.section_position),
                &s.window_index.to_string(),
                &format!("{:.3}", s.window_start),
                &format!("{:.3}", s.window_end),
                &s.vehicle_count.to_string(),
                &format!("{:.1}", s.flow_rate_vph),
                &measure_cell(&s.time_mean_speed),
                &measure_cell(&s.space_mean_speed),
                &s.zero_speed_count.to_string(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export every crossing event: section_position, vehicle_id, crossing_time, speed.
pub fn export_crossings_csv(analysis: &LaneAnalysis) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["section_position", "vehicle_id", "crossing_time", "speed"])?;
    for section in &analysis.sections {
        for e in &section.events {
            wtr.write_record([
                &format!("{}", e.section_position),
                &e.vehicle_id.to_string(),
                &format!("{:.4}", e.crossing_time),
                &format!("{:.4}", e.interpolated_speed),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn measure_cell(m: &Measure) -> String {
    match m {
        Measure::Value(v) => format!("{v:.4}"),
        Measure::Undefined(reason) => format!("undefined:{}", reason_code(*reason)),
    }
}

fn reason_code(reason: UndefinedReason) -> &'static str {
    match reason {
        UndefinedReason::NoVehicles => "no_vehicles",
        UndefinedReason::DivideByZeroSpeed => "divide_by_zero_speed",
        UndefinedReason::ZeroMean => "zero_mean",
    }
}

// ─── Text summary ───────────────────────────────────────────────────

/// Render a human-readable summary of a lane report.
pub fn render_text_summary(report: &LaneReport) -> String {
    let a = &report.analysis;
    let mut out = String::new();

    let _ = writeln!(out, "Lane flow analysis");
    let _ = writeln!(out, "{}", "-".repeat(50));
    let _ = writeln!(out, "Generated:  {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Lane:       {}", a.lane);
    let sections: Vec<String> = report.config.sections.iter().map(|s| s.to_string()).collect();
    let _ = writeln!(out, "Sections:   {}", sections.join(", "));
    let _ = writeln!(out, "Window:     {} s", report.config.window_width_s);
    let _ = writeln!(
        out,
        "Vehicles:   {} ({} samples, {} rejected)",
        a.vehicle_count,
        a.sample_count,
        a.rejected.len()
    );
    let _ = writeln!(out, "Dataset:    {}", &report.dataset_hash);
    if report.is_synthetic() {
        let _ = writeln!(out, "WARNING: synthetic data");
    }

    for section in &a.sections {
        let _ = writeln!(out);
        render_section(&mut out, section);
    }
    out
}

fn render_section(out: &mut String, s: &SectionReport) {
    let _ = writeln!(out, "Section {} ({} crossings)", s.section_position, s.events.len());

    match s.headway.summary() {
        Some(h) => {
            let regime = h.regime.map(|r| r.to_string()).unwrap_or_else(|| "n/a".into());
            let _ = writeln!(
                out,
                "  Headway:  mean={:.2}s  sd={:.2}s  CV={}  regime={}",
                h.mean, h.std_dev, h.coefficient_of_variation, regime
            );
        }
        None => {
            let _ = writeln!(out, "  Headway:  insufficient data");
        }
    }

    match &s.headway_fit {
        Ok(fit) => {
            let _ = writeln!(
                out,
                "  Fit:      exponential K-S p={:.3}, lognormal K-S p={:.3}, best={}",
                fit.exponential.score.p_value, fit.lognormal.score.p_value, fit.best
            );
        }
        Err(e) => {
            let _ = writeln!(out, "  Fit:      not computable ({e})");
        }
    }

    match &s.arrival {
        Ok(arrival) => match &arrival.goodness_of_fit {
            Ok(g) => {
                let _ = writeln!(
                    out,
                    "  Poisson:  λ={:.2}  χ²={:.2}  df={}  p={:.3} → {}",
                    g.lambda_hat, g.chi_square_statistic, g.degrees_of_freedom, g.p_value, g.decision
                );
            }
            Err(e) => {
                let _ = writeln!(out, "  Poisson:  λ={:.2}, test not computable ({e})", arrival.lambda_hat);
            }
        },
        Err(e) => {
            let _ = writeln!(out, "  Poisson:  not computable ({e})");
        }
    }

    if let Ok(samples) = &s.flow_speed {
        let flow = samples.iter().map(|w| w.flow_rate_vph).sum::<f64>() / samples.len() as f64;
        let _ = writeln!(
            out,
            "  Flow:     mean={:.1} veh/h  time-mean speed={}  space-mean speed={}",
            flow,
            mean_of_defined(samples.iter().map(|w| w.time_mean_speed)),
            mean_of_defined(samples.iter().map(|w| w.space_mean_speed)),
        );
    }

    match &s.fundamental {
        Ok(fd) => match &fd.fit {
            Ok(g) => {
                let _ = writeln!(
                    out,
                    "  Greenshields: vf={:.1} mph  kj={:.1} veh/mi  capacity={:.0} veh/h  R²={:.3}",
                    g.free_flow_speed, g.jam_density, g.capacity, g.r_squared
                );
            }
            Err(e) => {
                let _ = writeln!(out, "  Greenshields: not computable ({e})");
            }
        },
        Err(e) => {
            let _ = writeln!(out, "  Greenshields: not computable ({e})");
        }
    }
}

/// Mean over windows with a defined value, formatted in ft/s.
fn mean_of_defined(values: impl Iterator<Item = Measure>) -> String {
    let defined: Vec<f64> = values.filter_map(|m| m.value()).collect();
    if defined.is_empty() {
        return "undefined".into();
    }
    format!("{:.1} ft/s", defined.iter().sum::<f64>() / defined.len() as f64)
}
