//! Musical quantization of continuous control values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OrbitError;

// ============================================================================
// Snap universes
// ============================================================================

/// Maelzel metronome markings
pub const TEMPO_MARKS: [f64; 39] = [
    40.0, 42.0, 44.0, 46.0, 48.0, 50.0, 52.0, 54.0, 56.0, 58.0, 60.0, 63.0, 66.0, 69.0, 72.0,
    76.0, 80.0, 84.0, 88.0, 92.0, 96.0, 100.0, 104.0, 108.0, 112.0, 116.0, 120.0, 126.0, 132.0,
    138.0, 144.0, 152.0, 160.0, 168.0, 176.0, 184.0, 192.0, 200.0, 208.0,
];

pub const SUBDIVISION_VALUES: [f64; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];

/// Orbit size ratios taken from simple intervals (octaves, fifth, fourth, thirds)
pub const SCALE_RATIOS: [f64; 14] = [
    0.25,
    1.0 / 3.0,
    0.5,
    2.0 / 3.0,
    0.75,
    0.8,
    1.0,
    1.2,
    1.25,
    4.0 / 3.0,
    1.5,
    2.0,
    3.0,
    4.0,
];

/// Swing percentages, 50 being straight and 66 a triplet feel
pub const SWING_AMOUNTS: [f64; 7] = [50.0, 54.0, 58.0, 62.0, 66.0, 71.0, 75.0];

/// Values a parameter prefers to land on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapSet {
    /// No preferred values; round to the step instead
    None,
    /// Explicit list of values
    Values(&'static [f64]),
    /// `k * span / n` for every `n` in `counts` and `k` in `0..=n`
    Divisions { span: f64, counts: &'static [u32] },
}

impl SnapSet {
    fn candidates(&self) -> Vec<f64> {
        match self {
            Self::None => Vec::new(),
            Self::Values(values) => values.to_vec(),
            Self::Divisions { span, counts } => counts
                .iter()
                .filter(|&&n| n > 0)
                .flat_map(|&n| (0..=n).map(move |k| k as f64 * span / n as f64))
                .collect(),
        }
    }
}

/// Static description of a tunable parameter
#[derive(Debug, Clone, Copy)]
pub struct ParameterConfig {
    pub name: &'static str,
    pub snap: SnapSet,
    /// Fallback grid when no snap value is in range
    pub step: f64,
    pub min: f64,
    pub max: f64,
    pub formatter: fn(f64) -> String,
}

impl ParameterConfig {
    pub fn format(&self, value: f64) -> String {
        (self.formatter)(value)
    }
}

// ============================================================================
// Quantizer
// ============================================================================

/// Clamp `raw` to `[min, max]` and snap it to the nearest preferred value
///
/// Ties go to the lower value. Snap values outside the bounds are ignored;
/// when none remain, the value is rounded to `config.step` instead. Always
/// returns a value inside the bounds, and applying it twice gives the same
/// result as applying it once.
pub fn smart_quantize(raw: f64, config: &ParameterConfig, min: f64, max: f64) -> f64 {
    let (lo, hi) = bounds(config, min, max);
    let value = if raw.is_nan() { lo } else { raw.clamp(lo, hi) };

    let nearest = config
        .snap
        .candidates()
        .into_iter()
        .filter(|c| (lo..=hi).contains(c))
        .fold(None::<f64>, |best, c| match best {
            None => Some(c),
            Some(b) => {
                let (dc, db) = ((c - value).abs(), (b - value).abs());
                if dc < db || (dc == db && c < b) {
                    Some(c)
                } else {
                    Some(b)
                }
            }
        });

    match nearest {
        Some(snapped) => snapped,
        None => round_to_step(value, config.step).clamp(lo, hi),
    }
}

fn bounds(config: &ParameterConfig, min: f64, max: f64) -> (f64, f64) {
    let min = if min.is_nan() { config.min } else { min };
    let max = if max.is_nan() { config.max } else { max };
    if min <= max { (min, max) } else { (max, min) }
}

fn round_to_step(value: f64, step: f64) -> f64 {
    if step > 0.0 && step.is_finite() && value.is_finite() {
        (value / step).round() * step
    } else {
        value
    }
}

// ============================================================================
// Formatters
// ============================================================================

fn format_bpm(value: f64) -> String {
    format!("{:.0} BPM", value)
}

fn format_multiplier(value: f64) -> String {
    format!("{}x", value)
}

fn format_ratio(value: f64) -> String {
    format!("{:.2}x", value)
}

fn format_degrees(value: f64) -> String {
    format!("{}°", (value * 10.0).round() / 10.0)
}

fn format_fraction_percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn format_percent(value: f64) -> String {
    format!("{:.0}%", value)
}

fn format_pixels(value: f64) -> String {
    format!("{:.0} px", value)
}

// ============================================================================
// Parameters
// ============================================================================

static TEMPO: ParameterConfig = ParameterConfig {
    name: "tempo",
    snap: SnapSet::Values(&TEMPO_MARKS),
    step: 1.0,
    min: 40.0,
    max: 240.0,
    formatter: format_bpm,
};

static SUBDIVISION: ParameterConfig = ParameterConfig {
    name: "subdivision",
    snap: SnapSet::Values(&SUBDIVISION_VALUES),
    step: 0.25,
    min: 0.25,
    max: 4.0,
    formatter: format_multiplier,
};

static ORBIT_SCALE: ParameterConfig = ParameterConfig {
    name: "scale",
    snap: SnapSet::Values(&SCALE_RATIOS),
    step: 0.05,
    min: 0.25,
    max: 4.0,
    formatter: format_ratio,
};

static ROTATION: ParameterConfig = ParameterConfig {
    name: "rotation",
    snap: SnapSet::Divisions {
        span: 360.0,
        counts: &[12, 16],
    },
    step: 1.0,
    min: 0.0,
    max: 360.0,
    formatter: format_degrees,
};

static OPACITY: ParameterConfig = ParameterConfig {
    name: "opacity",
    snap: SnapSet::None,
    step: 0.05,
    min: 0.0,
    max: 1.0,
    formatter: format_fraction_percent,
};

static SWING: ParameterConfig = ParameterConfig {
    name: "swing",
    snap: SnapSet::Values(&SWING_AMOUNTS),
    step: 1.0,
    min: 50.0,
    max: 75.0,
    formatter: format_percent,
};

static OFFSET_X: ParameterConfig = ParameterConfig {
    name: "offset_x",
    snap: SnapSet::None,
    step: 1.0,
    min: -500.0,
    max: 500.0,
    formatter: format_pixels,
};

static OFFSET_Y: ParameterConfig = ParameterConfig {
    name: "offset_y",
    snap: SnapSet::None,
    step: 1.0,
    min: -500.0,
    max: 500.0,
    formatter: format_pixels,
};

/// Every continuous control the UI exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicalParameter {
    Tempo,
    Subdivision,
    OrbitScale,
    Rotation,
    Opacity,
    Swing,
    OffsetX,
    OffsetY,
}

impl MusicalParameter {
    pub const ALL: [MusicalParameter; 8] = [
        Self::Tempo,
        Self::Subdivision,
        Self::OrbitScale,
        Self::Rotation,
        Self::Opacity,
        Self::Swing,
        Self::OffsetX,
        Self::OffsetY,
    ];

    pub fn config(&self) -> &'static ParameterConfig {
        match self {
            Self::Tempo => &TEMPO,
            Self::Subdivision => &SUBDIVISION,
            Self::OrbitScale => &ORBIT_SCALE,
            Self::Rotation => &ROTATION,
            Self::Opacity => &OPACITY,
            Self::Swing => &SWING,
            Self::OffsetX => &OFFSET_X,
            Self::OffsetY => &OFFSET_Y,
        }
    }

    /// Quantize within the parameter's own domain
    pub fn quantize(&self, raw: f64) -> f64 {
        let config = self.config();
        smart_quantize(raw, config, config.min, config.max)
    }

    pub fn format(&self, value: f64) -> String {
        self.config().format(value)
    }
}

impl fmt::Display for MusicalParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config().name)
    }
}

impl FromStr for MusicalParameter {
    type Err = OrbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        match wanted.as_str() {
            "bpm" => return Ok(Self::Tempo),
            "orbit_scale" => return Ok(Self::OrbitScale),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|p| p.config().name == wanted)
            .ok_or_else(|| OrbitError::UnknownParameter(s.to_string()))
    }
}
