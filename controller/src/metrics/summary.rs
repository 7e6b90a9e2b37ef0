//! Plain-text summaries written to the output surface for measure and
//! analyze requests.

use std::fmt::{self, Write as _};

use serde_json::Value;

use super::report::{EMISSIONS_UNIT, ENERGY_UNIT, GRAMS_UNIT, equivalent_lines, fixed, scientific};
use super::{ComponentBreakdown, ComponentValues, MetricsSnapshot, ResponseShape, RunMetrics};

const RULE: &str = "═══════════════════";

fn heading(out: &mut String, title: &str) -> fmt::Result {
    if !out.is_empty() {
        writeln!(out)?;
    }
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")?;
    writeln!(out)
}

fn row(out: &mut String, label: &str, value: &str) -> fmt::Result {
    writeln!(out, "{:<16}{value}", format!("{label}:"))
}

/// Text for a measure settlement: the flat emissions block, the component
/// breakdown blocks, or the raw payload when neither applies.
pub fn measurement_summary(raw: &Value, snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();
    let rendered = match (snapshot.shape, &snapshot.original, &snapshot.breakdown) {
        (ResponseShape::Flat, Some(run), _) => write_flat(&mut out, run),
        (ResponseShape::Breakdown, _, Some(breakdown)) => write_breakdown(&mut out, breakdown),
        _ => Ok(()),
    };
    if rendered.is_err() || out.is_empty() {
        out.clear();
        // Writing into a String cannot fail.
        let _ = write_raw(&mut out, raw);
    }
    out
}

fn write_flat(out: &mut String, run: &RunMetrics) -> fmt::Result {
    heading(out, "🌱 EMISSIONS DATA")?;
    if let Some(emissions) = run.emissions {
        writeln!(out, "EMISSION:\n{}\n", scientific(emissions, EMISSIONS_UNIT))?;
    }
    if let Some(energy) = run.energy {
        writeln!(out, "ENERGY:\n{}\n", scientific(energy, ENERGY_UNIT))?;
    }
    if let Some(seconds) = run.execution_time_seconds {
        writeln!(out, "EXECUTION TIME:\n{seconds:.15} s")?;
    }
    Ok(())
}

fn write_components(
    out: &mut String,
    values: &ComponentValues,
    quantity: &str,
    decimals: usize,
    unit: &str,
) -> fmt::Result {
    for (component, value) in [
        ("CPU", values.cpu),
        ("GPU", values.gpu),
        ("RAM", values.ram),
        ("Total", values.total),
    ] {
        if let Some(value) = value {
            row(out, &format!("{component} {quantity}"), &fixed(value, decimals, unit))?;
        }
    }
    Ok(())
}

fn write_breakdown(out: &mut String, breakdown: &ComponentBreakdown) -> fmt::Result {
    let has_components = !(breakdown.energy_kwh.is_empty()
        && breakdown.power_watts.is_empty()
        && breakdown.emissions_kg.is_empty());

    if has_components {
        heading(out, "🌱 EMISSIONS DATA")?;
        write_components(out, &breakdown.energy_kwh, "Energy", 4, ENERGY_UNIT)?;
        writeln!(out)?;
        write_components(out, &breakdown.power_watts, "Power", 2, "W")?;
        writeln!(out)?;
        write_components(out, &breakdown.emissions_kg, "Emissions", 4, EMISSIONS_UNIT)?;
    }

    if let Some(timing) = &breakdown.timing {
        heading(out, "⏱️  TIMING DATA")?;
        if let Some(duration) = timing.duration_seconds {
            row(out, "Duration", &fixed(duration, 4, "seconds"))?;
        }
        if let Some(start) = timing.start_time {
            row(out, "Start Time", &start.to_string())?;
        }
        if let Some(end) = timing.end_time {
            row(out, "End Time", &end.to_string())?;
        }
    }

    if let Some(hardware) = &breakdown.hardware {
        heading(out, "💻 HARDWARE INFO")?;
        if let Some(cpu) = &hardware.cpu_model {
            row(out, "CPU Model", cpu)?;
        }
        if let Some(gpu) = &hardware.gpu_model {
            row(out, "GPU Model", gpu)?;
        }
        if let Some(ram) = hardware.ram_total_gb {
            row(out, "Total RAM", &format!("{ram} GB"))?;
        }
    }
    Ok(())
}

fn write_raw(out: &mut String, raw: &Value) -> fmt::Result {
    heading(out, "📊 MEASUREMENT RESULTS")?;
    let pretty = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
    writeln!(out, "{pretty}")
}

/// Text for an analyze settlement. Empty when the payload carried no
/// analysis.
pub fn analysis_summary(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();
    if write_analysis(&mut out, snapshot).is_err() {
        out.clear();
    }
    out
}

fn write_analysis(out: &mut String, snapshot: &MetricsSnapshot) -> fmt::Result {
    let Some(analysis) = &snapshot.static_analysis else {
        return Ok(());
    };

    heading(out, "🌿 ECO ANALYSIS")?;
    if let Some(score) = analysis.eco_score {
        row(out, "Eco Score", &format!("{score} / 100"))?;
    }
    if let Some(confidence) = analysis.confidence {
        row(out, "Confidence", &format!("{:.0}%", confidence * 100.0))?;
    }
    if let Some(grams) = analysis.emissions_gco2 {
        row(out, "Emissions", &scientific(grams, GRAMS_UNIT))?;
    }
    if let Some(kwh) = analysis.energy_kwh {
        row(out, "Energy", &scientific(kwh, ENERGY_UNIT))?;
    }
    if let Some(seconds) = analysis.runtime_seconds {
        row(out, "Runtime", &scientific(seconds, "s"))?;
    }
    if let Some(time) = &analysis.complexity.time_complexity {
        row(out, "Time", time)?;
    }
    if let Some(space) = &analysis.complexity.space_complexity {
        row(out, "Space", space)?;
    }
    if let Some(estimate) = &analysis.annual_estimate {
        if let Some(kwh) = estimate.kwh {
            row(out, "Annual Energy", &scientific(kwh, ENERGY_UNIT))?;
        }
        if let Some(grams) = estimate.gco2 {
            row(out, "Annual CO2", &scientific(grams, GRAMS_UNIT))?;
        }
    }

    if let Some(equivalents) = snapshot.equivalents() {
        heading(out, "🌍 EQUIVALENTS")?;
        for line in equivalent_lines(&equivalents) {
            row(out, &line.label, &line.value.to_string())?;
        }
    }
    if !analysis.suggestions.is_empty() {
        heading(out, "💡 SUGGESTIONS")?;
        for suggestion in &analysis.suggestions {
            writeln!(out, "- {suggestion}")?;
        }
    }
    if !analysis.warnings.is_empty() {
        heading(out, "⚠️  WARNINGS")?;
        for warning in &analysis.warnings {
            writeln!(out, "- {warning}")?;
        }
    }
    Ok(())
}
