use std::fmt;

use serde::Serialize;

pub const DEFAULT_PRECISION: usize = 6;

const INCREASE_GLYPH: char = '▲';
const DECREASE_GLYPH: char = '▼';

/// `mantissa × 10ⁿ` with the exponent in superscript glyphs; exact zero is
/// `"0"`.
pub fn to_scientific(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };

    format!("{mantissa} × 10{}", superscript(exponent))
}

pub fn superscript(exponent: i32) -> String {
    exponent
        .to_string()
        .chars()
        .map(|ch| match ch {
            '-' => '⁻',
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increase,
    Decrease,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Danger,
    Plain,
}

impl Tone {
    pub fn color(self) -> Option<&'static str> {
        match self {
            Self::Success => Some("#27ae60"),
            Self::Danger => Some("#e74c3c"),
            Self::Plain => None,
        }
    }
}

/// Presentational form of a signed delta. It does not interpret the sign;
/// callers decide what a positive value means.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReductionMarkup {
    pub trend: Trend,
    pub magnitude: String,
    pub unit: String,
}

pub fn reduction_markup(value: f64, unit: &str) -> ReductionMarkup {
    let trend = if value > 0.0 {
        Trend::Increase
    } else if value < 0.0 {
        Trend::Decrease
    } else {
        Trend::Unchanged
    };
    ReductionMarkup {
        trend,
        magnitude: to_scientific(value.abs(), DEFAULT_PRECISION),
        unit: unit.to_string(),
    }
}

impl ReductionMarkup {
    pub fn glyph(&self) -> Option<char> {
        match self.trend {
            Trend::Increase => Some(INCREASE_GLYPH),
            Trend::Decrease => Some(DECREASE_GLYPH),
            Trend::Unchanged => None,
        }
    }

    pub fn tone(&self) -> Tone {
        match self.trend {
            Trend::Increase => Tone::Success,
            Trend::Decrease => Tone::Danger,
            Trend::Unchanged => Tone::Plain,
        }
    }

    pub fn to_html(&self) -> String {
        match self.tone().color() {
            Some(color) => format!("<span style=\"color:{color};\">{self}</span>"),
            None => format!("<span>{self}</span>"),
        }
    }
}

impl fmt::Display for ReductionMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(glyph) = self.glyph() {
            write!(f, "{glyph} ")?;
        }
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}
