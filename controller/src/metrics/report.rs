use std::fmt;

use serde::Serialize;

use super::format::{DEFAULT_PRECISION, ReductionMarkup, reduction_markup, to_scientific};
use super::{
    ComplexityFigures, ComponentBreakdown, ComponentValues, Equivalents, Improvements,
    MetricsSnapshot, ResponseShape, RunMetrics, StaticAnalysis,
};

pub(crate) const EMISSIONS_UNIT: &str = "kg CO2eq";
pub(crate) const GRAMS_UNIT: &str = "g CO2eq";
pub(crate) const ENERGY_UNIT: &str = "kWh";
pub(crate) const TIME_UNIT: &str = "s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Original,
    Optimized,
    Results,
    Analysis,
    Equivalents,
    Breakdown,
}

impl SectionKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Original => "ORIGINAL CODE",
            Self::Optimized => "OPTIMIZED CODE",
            Self::Results => "RESULTS",
            Self::Analysis => "ECO ANALYSIS",
            Self::Equivalents => "EQUIVALENTS",
            Self::Breakdown => "BREAKDOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum LineValue {
    Text(String),
    Reduction(ReductionMarkup),
}

impl fmt::Display for LineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Reduction(markup) => write!(f, "{markup}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub label: String,
    pub value: LineValue,
}

impl ReportLine {
    fn text(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: LineValue::Text(value.into()),
        }
    }

    fn reduction(label: &str, markup: ReductionMarkup) -> Self {
        Self {
            label: label.to_string(),
            value: LineValue::Reduction(markup),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub kind: SectionKind,
    pub lines: Vec<ReportLine>,
}

impl ReportSection {
    pub fn line(&self, label: &str) -> Option<&ReportLine> {
        self.lines.iter().find(|line| line.label == label)
    }
}

/// Rendered metrics panel. Built from scratch for every settlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub shape: ResponseShape,
    pub sections: Vec<ReportSection>,
}

impl MetricsReport {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let mut sections = Vec::new();
        let mut push = |kind: SectionKind, lines: Vec<ReportLine>| {
            if !lines.is_empty() {
                sections.push(ReportSection { kind, lines });
            }
        };

        if let Some(original) = &snapshot.original {
            push(SectionKind::Original, run_lines(original));
        }
        if let Some(optimized) = &snapshot.optimized {
            let mut lines = run_lines(&optimized.run);
            lines.extend(complexity_lines(&optimized.complexity));
            push(SectionKind::Optimized, lines);
        }
        if let Some(improvements) = &snapshot.improvements {
            push(SectionKind::Results, improvement_lines(improvements));
        }
        if let Some(analysis) = &snapshot.static_analysis {
            push(SectionKind::Analysis, analysis_lines(analysis));
        }
        if let Some(equivalents) = snapshot.equivalents() {
            push(SectionKind::Equivalents, equivalent_lines(&equivalents));
        }
        if let Some(breakdown) = &snapshot.breakdown {
            push(SectionKind::Breakdown, breakdown_lines(breakdown));
        }

        Self {
            shape: snapshot.shape,
            sections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", section.kind.title())?;
            for line in &section.lines {
                writeln!(f, "{}: {}", line.label, line.value)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn scientific(value: f64, unit: &str) -> String {
    format!("{} {unit}", to_scientific(value, DEFAULT_PRECISION))
}

pub(crate) fn fixed(value: f64, decimals: usize, unit: &str) -> String {
    format!("{value:.decimals$} {unit}")
}

fn run_lines(run: &RunMetrics) -> Vec<ReportLine> {
    let mut lines = Vec::new();
    if let Some(emissions) = run.emissions {
        lines.push(ReportLine::text("EMISSION", scientific(emissions, EMISSIONS_UNIT)));
    }
    if let Some(energy) = run.energy {
        lines.push(ReportLine::text("ENERGY", scientific(energy, ENERGY_UNIT)));
    }
    if let Some(seconds) = run.execution_time_seconds {
        lines.push(ReportLine::text("EXECUTION TIME", format!("{seconds} {TIME_UNIT}")));
    }
    lines
}

fn complexity_lines(complexity: &ComplexityFigures) -> Vec<ReportLine> {
    let mut lines = Vec::new();
    if let Some(time) = &complexity.time_complexity {
        lines.push(ReportLine::text("TIME COMPLEXITY", time.as_str()));
    }
    if let Some(space) = &complexity.space_complexity {
        lines.push(ReportLine::text("SPACE COMPLEXITY", space.as_str()));
    }
    if let Some(cyclomatic) = complexity.cyclomatic_complexity {
        lines.push(ReportLine::text("CYCLOMATIC COMPLEXITY", cyclomatic.to_string()));
    }
    lines
}

fn improvement_lines(improvements: &Improvements) -> Vec<ReportLine> {
    [
        ("EMISSION REDUCTION", improvements.emissions_reduction, EMISSIONS_UNIT),
        ("ENERGY REDUCTION", improvements.energy_reduction, ENERGY_UNIT),
        ("TIME REDUCTION", improvements.time_reduction, TIME_UNIT),
    ]
    .into_iter()
    .filter_map(|(label, value, unit)| {
        value.map(|value| ReportLine::reduction(label, reduction_markup(value, unit)))
    })
    .collect()
}

fn analysis_lines(analysis: &StaticAnalysis) -> Vec<ReportLine> {
    let mut lines = Vec::new();
    if let Some(score) = analysis.eco_score {
        lines.push(ReportLine::text("ECO SCORE", format!("{score} / 100")));
    }
    if let Some(confidence) = analysis.confidence {
        lines.push(ReportLine::text("CONFIDENCE", format!("{:.0}%", confidence * 100.0)));
    }
    if let Some(grams) = analysis.emissions_gco2 {
        lines.push(ReportLine::text("EMISSION", scientific(grams, GRAMS_UNIT)));
    }
    if let Some(kwh) = analysis.energy_kwh {
        lines.push(ReportLine::text("ENERGY", scientific(kwh, ENERGY_UNIT)));
    }
    if let Some(seconds) = analysis.runtime_seconds {
        lines.push(ReportLine::text("ESTIMATED RUNTIME", scientific(seconds, TIME_UNIT)));
    }
    if let Some(intensity) = analysis.carbon_intensity_gco2_kwh {
        lines.push(ReportLine::text("CARBON INTENSITY", format!("{intensity} gCO2/kWh")));
    }
    lines.extend(complexity_lines(&analysis.complexity));
    if let Some(estimate) = &analysis.annual_estimate {
        if let Some(kwh) = estimate.kwh {
            lines.push(ReportLine::text("ANNUAL ENERGY", scientific(kwh, ENERGY_UNIT)));
        }
        if let Some(grams) = estimate.gco2 {
            lines.push(ReportLine::text("ANNUAL EMISSION", scientific(grams, GRAMS_UNIT)));
        }
    }
    lines.extend(
        analysis
            .suggestions
            .iter()
            .map(|suggestion| ReportLine::text("SUGGESTION", suggestion.as_str())),
    );
    lines.extend(
        analysis
            .warnings
            .iter()
            .map(|warning| ReportLine::text("WARNING", warning.as_str())),
    );
    lines
}

pub(crate) fn equivalent_lines(equivalents: &Equivalents) -> Vec<ReportLine> {
    [
        ("TREES OFFSET", equivalents.trees_offset, "trees"),
        ("DRIVING", equivalents.car_km, "km"),
        ("EMAILS", equivalents.emails, "emails"),
        ("LIGHT BULB", equivalents.bulb_hours, "hours"),
        ("PHONE CHARGES", equivalents.phone_charges, "charges"),
        ("LAPTOP", equivalents.laptop_hours, "hours"),
    ]
    .into_iter()
    .filter_map(|(label, value, unit)| {
        value.map(|value| ReportLine::text(label, fixed(value, 2, unit)))
    })
    .collect()
}

fn component_lines(
    values: &ComponentValues,
    quantity: &str,
    decimals: usize,
    unit: &str,
) -> Vec<ReportLine> {
    [
        ("CPU", values.cpu),
        ("GPU", values.gpu),
        ("RAM", values.ram),
        ("TOTAL", values.total),
    ]
    .into_iter()
    .filter_map(|(component, value)| {
        value.map(|value| {
            ReportLine::text(&format!("{component} {quantity}"), fixed(value, decimals, unit))
        })
    })
    .collect()
}

fn breakdown_lines(breakdown: &ComponentBreakdown) -> Vec<ReportLine> {
    let mut lines = component_lines(&breakdown.energy_kwh, "ENERGY", 4, ENERGY_UNIT);
    lines.extend(component_lines(&breakdown.power_watts, "POWER", 2, "W"));
    lines.extend(component_lines(&breakdown.emissions_kg, "EMISSIONS", 4, EMISSIONS_UNIT));
    if let Some(duration) = breakdown
        .timing
        .as_ref()
        .and_then(|timing| timing.duration_seconds)
    {
        lines.push(ReportLine::text("DURATION", fixed(duration, 4, "seconds")));
    }
    if let Some(hardware) = &breakdown.hardware {
        if let Some(cpu) = &hardware.cpu_model {
            lines.push(ReportLine::text("CPU MODEL", cpu.as_str()));
        }
        if let Some(gpu) = &hardware.gpu_model {
            lines.push(ReportLine::text("GPU MODEL", gpu.as_str()));
        }
        if let Some(ram) = hardware.ram_total_gb {
            lines.push(ReportLine::text("TOTAL RAM", format!("{ram} GB")));
        }
    }
    lines
}
