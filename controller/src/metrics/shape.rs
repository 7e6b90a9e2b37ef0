use serde::Serialize;
use serde_json::Value;

use super::fields::{has_any_number, object};

pub(crate) const COMPONENT_KEYS: [&str; 12] = [
    "cpu_energy",
    "gpu_energy",
    "ram_energy",
    "total_energy",
    "cpu_power",
    "gpu_power",
    "ram_power",
    "total_power",
    "cpu_emissions",
    "gpu_emissions",
    "ram_emissions",
    "total_emissions",
];

const FLAT_KEYS: [&str; 3] = ["emissions", "energy", "execution_time"];
const ANALYSIS_KEYS: [&str; 2] = ["emissions_gco2", "eco_score"];

/// Historical response layouts, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseShape {
    /// Static analysis keyed by `emissions_gco2` / `eco_score`.
    Analysis,
    /// `{original, optimized, improvements?}` measured pair.
    Comparison,
    /// Code reply without measurements but with a `static_analysis` block.
    AttachedAnalysis,
    /// Per-component cpu/gpu/ram energy, power and emissions.
    Breakdown,
    /// `{emissions, energy, execution_time}`.
    Flat,
    Unrecognized,
}

type Detector = fn(&Value) -> bool;

const DETECTORS: [(ResponseShape, Detector); 5] = [
    (ResponseShape::Analysis, is_analysis),
    (ResponseShape::Comparison, is_comparison),
    (ResponseShape::AttachedAnalysis, has_attached_analysis),
    (ResponseShape::Breakdown, is_breakdown),
    (ResponseShape::Flat, is_flat),
];

pub fn detect(raw: &Value) -> ResponseShape {
    DETECTORS
        .iter()
        .find(|(_, matches)| matches(raw))
        .map(|(shape, _)| *shape)
        .unwrap_or(ResponseShape::Unrecognized)
}

/// The object holding measured values: `metrics` when the payload wraps them,
/// the payload itself otherwise.
pub(crate) fn measured_body(raw: &Value) -> &Value {
    object(raw, &["metrics"]).unwrap_or(raw)
}

fn is_analysis(raw: &Value) -> bool {
    has_any_number(raw, &ANALYSIS_KEYS)
}

fn is_comparison(raw: &Value) -> bool {
    let body = measured_body(raw);
    object(body, &["original"]).is_some() && object(body, &["optimized"]).is_some()
}

/// The `static_analysis` block, at top level or inside `metrics`.
pub(crate) fn attached_analysis(raw: &Value) -> Option<&Value> {
    object(raw, &["static_analysis"]).or_else(|| object(measured_body(raw), &["static_analysis"]))
}

fn has_attached_analysis(raw: &Value) -> bool {
    attached_analysis(raw).is_some()
}

fn is_breakdown(raw: &Value) -> bool {
    let body = measured_body(raw);
    object(body, &["detailed_data"]).is_some()
        || object(body, &["emissions"]).is_some()
        || has_any_number(body, &COMPONENT_KEYS)
}

fn is_flat(raw: &Value) -> bool {
    has_any_number(measured_body(raw), &FLAT_KEYS)
}
