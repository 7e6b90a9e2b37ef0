//! Reconciles the service's historical response layouts into one
//! [`MetricsSnapshot`] and renders it.
//!
//! Normalization is pure and total: any JSON value produces a snapshot, and
//! fields the payload does not carry stay `None` so their lines are simply
//! not rendered.

pub mod equivalents;
pub(crate) mod fields;
pub mod format;
pub mod report;
pub mod shape;
pub mod summary;

use serde::Serialize;
use serde_json::Value;

pub use equivalents::Equivalents;
pub use format::{ReductionMarkup, Tone, Trend, reduction_markup, to_scientific};
pub use report::{MetricsReport, ReportLine, ReportSection, SectionKind};
pub use shape::ResponseShape;

use equivalents::kg_to_grams;
use fields::{first_number, first_text, number, object, string_list, sum_present};
use shape::{attached_analysis, measured_body};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// kg CO2eq.
    pub emissions: Option<f64>,
    /// kWh.
    pub energy: Option<f64>,
    pub execution_time_seconds: Option<f64>,
}

impl RunMetrics {
    fn from_value(value: &Value) -> Self {
        Self {
            emissions: first_number(value, &[&["emissions"], &["emissions_kg"]]),
            energy: first_number(value, &[&["energy"], &["energy_consumed"], &["energy_kwh"]]),
            execution_time_seconds: first_number(
                value,
                &[&["execution_time"], &["execution_time_s"], &["duration"]],
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityFigures {
    pub time_complexity: Option<String>,
    pub space_complexity: Option<String>,
    pub cyclomatic_complexity: Option<f64>,
}

impl ComplexityFigures {
    fn from_value(value: &Value) -> Self {
        Self {
            time_complexity: first_text(value, &[&["time_complexity"]]),
            space_complexity: first_text(value, &[&["space_complexity"]]),
            cyclomatic_complexity: number(value, &["cyclomatic_complexity"]),
        }
    }

    fn or(self, fallback: Self) -> Self {
        Self {
            time_complexity: self.time_complexity.or(fallback.time_complexity),
            space_complexity: self.space_complexity.or(fallback.space_complexity),
            cyclomatic_complexity: self.cyclomatic_complexity.or(fallback.cyclomatic_complexity),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedMetrics {
    #[serde(flatten)]
    pub run: RunMetrics,
    #[serde(flatten)]
    pub complexity: ComplexityFigures,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvements {
    pub emissions_reduction: Option<f64>,
    pub energy_reduction: Option<f64>,
    pub time_reduction: Option<f64>,
}

impl Improvements {
    /// Precomputed reductions win field by field; otherwise
    /// `original - optimized` when both sides are present.
    fn resolve(
        explicit: Option<&Value>,
        original: &RunMetrics,
        optimized: &RunMetrics,
    ) -> Option<Self> {
        let explicit_number = |key: &str| explicit.and_then(|block| number(block, &[key]));
        let improvements = Self {
            emissions_reduction: explicit_number("emissions_reduction")
                .or_else(|| difference(original.emissions, optimized.emissions)),
            energy_reduction: explicit_number("energy_reduction")
                .or_else(|| difference(original.energy, optimized.energy)),
            time_reduction: explicit_number("time_reduction").or_else(|| {
                difference(
                    original.execution_time_seconds,
                    optimized.execution_time_seconds,
                )
            }),
        };
        (improvements != Self::default()).then_some(improvements)
    }
}

fn difference(original: Option<f64>, optimized: Option<f64>) -> Option<f64> {
    Some(original? - optimized?)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualEstimate {
    pub kwh: Option<f64>,
    pub gco2: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticAnalysis {
    pub eco_score: Option<f64>,
    /// 0..=1.
    pub confidence: Option<f64>,
    pub emissions_gco2: Option<f64>,
    pub energy_kwh: Option<f64>,
    pub runtime_seconds: Option<f64>,
    pub carbon_intensity_gco2_kwh: Option<f64>,
    pub complexity: ComplexityFigures,
    pub suggestions: Vec<String>,
    pub warnings: Vec<String>,
    pub equivalents: Option<Equivalents>,
    pub annual_estimate: Option<AnnualEstimate>,
}

impl StaticAnalysis {
    fn from_value(raw: &Value) -> Self {
        let emissions_gco2 =
            first_number(raw, &[&["emissions_gco2"], &["estimated", "emissions_gco2"]]);
        let energy_kwh = first_number(raw, &[&["estimated", "energy_kwh"], &["energy_kwh"]]);

        let equivalents =
            Equivalents::resolve(object(raw, &["equivalents"]), emissions_gco2, energy_kwh);
        let annual_estimate = object(raw, &["annual_estimate"])
            .map(|block| AnnualEstimate {
                kwh: number(block, &["kwh"]),
                gco2: number(block, &["gco2"]),
            })
            .filter(|estimate| *estimate != AnnualEstimate::default());

        Self {
            eco_score: number(raw, &["eco_score"]),
            confidence: number(raw, &["confidence"]),
            emissions_gco2,
            energy_kwh,
            runtime_seconds: first_number(raw, &[&["estimated", "runtime_s"], &["runtime_s"]]),
            carbon_intensity_gco2_kwh: number(raw, &["estimated", "carbon_intensity_gco2_kwh"]),
            complexity: object(raw, &["metrics"])
                .map(ComplexityFigures::from_value)
                .unwrap_or_default()
                .or(ComplexityFigures::from_value(raw)),
            suggestions: string_list(raw, &["suggestions"]),
            warnings: string_list(raw, &["warnings"]),
            equivalents: (!equivalents.is_empty()).then_some(equivalents),
            annual_estimate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentValues {
    pub cpu: Option<f64>,
    pub gpu: Option<f64>,
    pub ram: Option<f64>,
    pub total: Option<f64>,
}

impl ComponentValues {
    /// `suffix` is `energy`, `power` or `emissions`. The total prefers an
    /// explicit `total_*`, then the plain key, then the sum of the present
    /// components.
    fn from_value(detail: &Value, suffix: &str) -> Self {
        let component = |prefix: &str| number(detail, &[format!("{prefix}_{suffix}").as_str()]);
        let cpu = component("cpu");
        let gpu = component("gpu");
        let ram = component("ram");
        let total = component("total")
            .or_else(|| number(detail, &[suffix]))
            .or_else(|| sum_present(&[cpu, gpu, ram]));
        Self { cpu, gpu, ram, total }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub duration_seconds: Option<f64>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hardware {
    pub cpu_model: Option<String>,
    pub gpu_model: Option<String>,
    pub ram_total_gb: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentBreakdown {
    pub energy_kwh: ComponentValues,
    pub power_watts: ComponentValues,
    pub emissions_kg: ComponentValues,
    pub timing: Option<Timing>,
    pub hardware: Option<Hardware>,
}

impl ComponentBreakdown {
    fn from_payload(raw: &Value, body: &Value) -> Self {
        let detail = object(body, &["detailed_data"])
            .or_else(|| object(body, &["emissions"]))
            .unwrap_or(body);

        let timing = object(body, &["timing"])
            .or_else(|| object(raw, &["timing"]))
            .map(|block| Timing {
                duration_seconds: number(block, &["duration"]),
                start_time: number(block, &["start_time"]),
                end_time: number(block, &["end_time"]),
            })
            .filter(|timing| *timing != Timing::default());

        let hardware = object(body, &["hardware"])
            .or_else(|| object(raw, &["hardware"]))
            .map(|block| Hardware {
                cpu_model: first_text(block, &[&["cpu_model"], &["cpu", "model"]]),
                gpu_model: first_text(block, &[&["gpu_model"], &["gpu", "model"]]),
                ram_total_gb: first_number(block, &[&["ram_total"], &["memory", "total"]]),
            })
            .or_else(|| {
                object(raw, &["hardware_info"]).map(|block| Hardware {
                    cpu_model: first_text(block, &[&["cpu", "model"], &["cpu_model"]]),
                    gpu_model: first_text(block, &[&["gpu", "model"], &["gpu_model"]]),
                    ram_total_gb: first_number(block, &[&["memory", "total"], &["ram_total"]]),
                })
            })
            .filter(|hardware| *hardware != Hardware::default());

        Self {
            energy_kwh: ComponentValues::from_value(detail, "energy"),
            power_watts: ComponentValues::from_value(detail, "power"),
            emissions_kg: ComponentValues::from_value(detail, "emissions"),
            timing,
            hardware,
        }
    }
}

/// Canonical metrics record. Each settlement replaces the previous snapshot
/// wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub shape: ResponseShape,
    pub original: Option<RunMetrics>,
    pub optimized: Option<OptimizedMetrics>,
    pub improvements: Option<Improvements>,
    pub breakdown: Option<ComponentBreakdown>,
    pub static_analysis: Option<StaticAnalysis>,
}

impl MetricsSnapshot {
    fn empty(shape: ResponseShape) -> Self {
        Self {
            shape,
            original: None,
            optimized: None,
            improvements: None,
            breakdown: None,
            static_analysis: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_none()
            && self.optimized.is_none()
            && self.improvements.is_none()
            && self.breakdown.is_none()
            && self.static_analysis.is_none()
    }

    /// Headline equivalents: the analysis block when present, otherwise
    /// converted from the best measured run (optimized before original).
    pub fn equivalents(&self) -> Option<Equivalents> {
        if let Some(equivalents) = self
            .static_analysis
            .as_ref()
            .and_then(|analysis| analysis.equivalents.clone())
        {
            return Some(equivalents);
        }

        let run = self
            .optimized
            .as_ref()
            .map(|optimized| &optimized.run)
            .filter(|run| !run.is_empty())
            .or(self.original.as_ref())?;
        let computed = Equivalents::compute(run.emissions.map(kg_to_grams), run.energy);
        (!computed.is_empty()).then_some(computed)
    }
}

/// Maps any service payload to a [`MetricsSnapshot`]. Never fails.
pub fn normalize(raw: &Value) -> MetricsSnapshot {
    let shape = shape::detect(raw);
    let body = measured_body(raw);
    let mut snapshot = MetricsSnapshot::empty(shape);

    match shape {
        ResponseShape::Analysis => {
            snapshot.static_analysis = Some(StaticAnalysis::from_value(raw));
        }
        ResponseShape::Comparison => {
            let original = object(body, &["original"])
                .map(RunMetrics::from_value)
                .unwrap_or_default();
            let optimized_value = object(body, &["optimized"]);
            let optimized_run = optimized_value.map(RunMetrics::from_value).unwrap_or_default();

            let static_analysis = attached_analysis(raw).map(StaticAnalysis::from_value);
            let analysed_complexity = static_analysis
                .as_ref()
                .map(|analysis| analysis.complexity.clone())
                .unwrap_or_default();
            let complexity = optimized_value
                .map(ComplexityFigures::from_value)
                .unwrap_or_default()
                .or(analysed_complexity);

            let explicit =
                object(body, &["improvements"]).or_else(|| object(raw, &["improvements"]));
            snapshot.improvements = Improvements::resolve(explicit, &original, &optimized_run);
            snapshot.original = Some(original);
            snapshot.optimized = Some(OptimizedMetrics {
                run: optimized_run,
                complexity,
            });
            snapshot.static_analysis = static_analysis;
        }
        ResponseShape::AttachedAnalysis => {
            snapshot.static_analysis = attached_analysis(raw).map(StaticAnalysis::from_value);
        }
        ResponseShape::Breakdown => {
            let breakdown = ComponentBreakdown::from_payload(raw, body);
            let scalar = RunMetrics::from_value(body);
            let original = RunMetrics {
                emissions: breakdown.emissions_kg.total.or(scalar.emissions),
                energy: breakdown.energy_kwh.total.or(scalar.energy),
                execution_time_seconds: scalar.execution_time_seconds.or_else(|| {
                    breakdown
                        .timing
                        .as_ref()
                        .and_then(|timing| timing.duration_seconds)
                }),
            };
            snapshot.original = (!original.is_empty()).then_some(original);
            snapshot.breakdown = Some(breakdown);
        }
        ResponseShape::Flat => {
            snapshot.original = Some(RunMetrics::from_value(body));
        }
        ResponseShape::Unrecognized => {}
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flat_payload_populates_only_original() {
        let snapshot = normalize(&json!({
            "emissions": 0.0007,
            "energy": 0.0023,
            "execution_time": 1.2345
        }));

        assert_eq!(snapshot.shape, ResponseShape::Flat);
        assert_eq!(
            snapshot.original,
            Some(RunMetrics {
                emissions: Some(0.0007),
                energy: Some(0.0023),
                execution_time_seconds: Some(1.2345),
            })
        );
        assert!(snapshot.optimized.is_none());
        assert!(snapshot.improvements.is_none());
        assert!(snapshot.breakdown.is_none());
        assert!(snapshot.static_analysis.is_none());
    }

    #[test]
    fn normalize_is_idempotent() {
        let payloads = [
            json!({"emissions": 0.0007, "energy": 0.0023, "execution_time": 1.2345}),
            json!({"metrics": {"original": {"emissions": 2.0}, "optimized": {"emissions": 1.0}}}),
            json!({"emissions_gco2": 0.3, "eco_score": 91, "suggestions": ["x"]}),
            json!({"metrics": {"emissions": {"cpu_energy": 0.1, "ram_energy": 0.2}}}),
        ];
        for payload in payloads {
            assert_eq!(normalize(&payload), normalize(&payload));
        }
    }

    #[test]
    fn comparison_prefers_precomputed_improvements() {
        let snapshot = normalize(&json!({
            "optimized_code": "print(1)",
            "metrics": {
                "original": {"emissions": 0.004, "energy": 0.01, "execution_time": 2.0},
                "optimized": {"emissions": 0.001, "energy": 0.004, "execution_time": 0.5},
                "improvements": {"emissions_reduction": 0.0031}
            }
        }));

        assert_eq!(snapshot.shape, ResponseShape::Comparison);
        let improvements = snapshot.improvements.expect("improvements");
        assert_eq!(improvements.emissions_reduction, Some(0.0031));
        let energy = improvements.energy_reduction.expect("energy fallback");
        assert!((energy - 0.006).abs() < 1e-12);
        assert_eq!(improvements.time_reduction, Some(1.5));
    }

    #[test]
    fn comparison_with_missing_side_renders_no_delta() {
        let snapshot = normalize(&json!({
            "original": {"emissions": 0.004},
            "optimized": {"energy": 0.002}
        }));
        assert!(snapshot.improvements.is_none());
        assert_eq!(
            snapshot.optimized.map(|optimized| optimized.run.energy),
            Some(Some(0.002))
        );
    }

    #[test]
    fn comparison_takes_complexity_from_static_analysis() {
        let snapshot = normalize(&json!({
            "metrics": {
                "original": {"emissions": 0.2},
                "optimized": {"emissions": 0.1, "time_complexity": "O(N)"}
            },
            "static_analysis": {
                "eco_score": 80,
                "metrics": {
                    "time_complexity": "O(N^2)",
                    "space_complexity": "O(1)",
                    "cyclomatic_complexity": 4
                }
            }
        }));
        let optimized = snapshot.optimized.expect("optimized");
        assert_eq!(optimized.complexity.time_complexity.as_deref(), Some("O(N)"));
        assert_eq!(optimized.complexity.space_complexity.as_deref(), Some("O(1)"));
        assert_eq!(optimized.complexity.cyclomatic_complexity, Some(4.0));
        assert_eq!(
            snapshot.static_analysis.and_then(|analysis| analysis.eco_score),
            Some(80.0)
        );
    }

    #[test]
    fn breakdown_sums_components_when_total_missing() {
        let snapshot = normalize(&json!({
            "metrics": {
                "emissions": {
                    "cpu_energy": 0.0012,
                    "gpu_energy": 0.0008,
                    "cpu_power": 45.2,
                    "total_emissions": 0.0007
                },
                "timing": {"duration": 1.2345},
                "hardware": {"cpu_model": "Intel Core i7-10700K", "ram_total": 16}
            }
        }));

        assert_eq!(snapshot.shape, ResponseShape::Breakdown);
        let breakdown = snapshot.breakdown.expect("breakdown");
        let total_energy = breakdown.energy_kwh.total.expect("summed total");
        assert!((total_energy - 0.002).abs() < 1e-12);
        assert_eq!(breakdown.energy_kwh.ram, None);
        assert_eq!(breakdown.power_watts.total, Some(45.2));
        assert!(breakdown.emissions_kg.cpu.is_none());
        assert_eq!(
            breakdown.hardware.and_then(|hardware| hardware.ram_total_gb),
            Some(16.0)
        );

        let original = snapshot.original.expect("derived run");
        assert_eq!(original.emissions, Some(0.0007));
        assert_eq!(original.execution_time_seconds, Some(1.2345));
    }

    #[test]
    fn measure_response_reads_detailed_data_and_hardware_info() {
        let snapshot = normalize(&json!({
            "metrics": {
                "emissions": 0.0007,
                "energy": 0.0023,
                "execution_time": 1.5,
                "detailed_data": {"cpu_energy": 0.002, "ram_energy": 0.0003, "total_energy": 0.0023}
            },
            "hardware_info": {"cpu": {"model": "Ryzen 7"}, "memory": {"total": 31.2}},
            "timing": {"duration": 1.5}
        }));

        let breakdown = snapshot.breakdown.expect("breakdown");
        assert_eq!(breakdown.energy_kwh.total, Some(0.0023));
        assert_eq!(
            breakdown.hardware.and_then(|hardware| hardware.cpu_model),
            Some("Ryzen 7".to_string())
        );
        assert_eq!(snapshot.original.and_then(|run| run.emissions), Some(0.0007));
    }

    #[test]
    fn analysis_shape_prefers_supplied_equivalents() {
        let snapshot = normalize(&json!({
            "emissions_gco2": 44.0,
            "eco_score": 72.5,
            "confidence": 0.8,
            "metrics": {"time_complexity": "O(N log N)", "space_complexity": "O(N)"},
            "estimated": {"energy_kwh": 0.1, "runtime_s": 0.02},
            "equivalents": {"trees_offset": 1.5},
            "annual_estimate": {"kwh": 100.0, "gco2": 44000.0},
            "suggestions": ["Use ''.join() instead of += in loops to save ~40% energy"],
            "warnings": []
        }));

        assert_eq!(snapshot.shape, ResponseShape::Analysis);
        let analysis = snapshot.static_analysis.clone().expect("analysis");
        assert_eq!(analysis.eco_score, Some(72.5));
        assert_eq!(analysis.energy_kwh, Some(0.1));
        assert_eq!(analysis.complexity.time_complexity.as_deref(), Some("O(N log N)"));
        assert_eq!(analysis.suggestions.len(), 1);
        assert!(analysis.warnings.is_empty());

        let equivalents = analysis.equivalents.expect("equivalents");
        assert_eq!(equivalents.trees_offset, Some(1.5));
        assert_eq!(equivalents.car_km, Some(44.0 / 120.0));
        assert_eq!(equivalents.emails, Some(11.0));
        assert_eq!(snapshot.equivalents(), Some(equivalents));
        assert!(snapshot.original.is_none());
    }

    #[test]
    fn measured_equivalents_convert_kg_to_grams() {
        let snapshot = normalize(&json!({"emissions": 0.12, "energy": 0.024}));
        let equivalents = snapshot.equivalents().expect("equivalents");
        let car_km = equivalents.car_km.expect("car km");
        assert!((car_km - 1.0).abs() < 1e-12);
        let phone_charges = equivalents.phone_charges.expect("phone charges");
        assert!((phone_charges - 2.0).abs() < 1e-12);
    }

    #[test]
    fn code_reply_keeps_attached_static_analysis() {
        let snapshot = normalize(&json!({
            "optimized_code": "x = 1",
            "changes": [],
            "static_analysis": {
                "emissions_gco2": 12.0,
                "eco_score": 80,
                "suggestions": ["Use a set"]
            }
        }));

        assert_eq!(snapshot.shape, ResponseShape::AttachedAnalysis);
        assert!(!snapshot.is_empty());
        assert!(snapshot.original.is_none());
        let analysis = snapshot.static_analysis.clone().expect("analysis");
        assert_eq!(analysis.eco_score, Some(80.0));
        assert_eq!(analysis.suggestions, vec!["Use a set".to_string()]);
        assert!(snapshot.equivalents().is_some());
        assert!(!MetricsReport::from_snapshot(&snapshot).is_empty());
    }

    #[test]
    fn garbage_never_panics() {
        for payload in [
            Value::Null,
            json!("text"),
            json!(42),
            json!({"metrics": null}),
            json!({"metrics": {"original": "x", "optimized": 3}}),
            json!({"emissions": "NaN-ish", "energy": {}}),
        ] {
            let snapshot = normalize(&payload);
            assert_eq!(snapshot.shape, ResponseShape::Unrecognized);
            assert!(snapshot.is_empty());
            assert!(snapshot.equivalents().is_none());
        }
        assert!(normalize(&json!({"status": "ok"})).is_empty());
    }
}
