//! RGB colors and weighted blending.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Blend of an empty color list.
pub const TRANSPARENT: &str = "rgba(0, 0, 0, 0)";

static RGB_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^rgba?\(\s*(\d+(?:\.\d+)?)\s*,\s*(\d+(?:\.\d+)?)\s*,\s*(\d+(?:\.\d+)?)\s*(?:,\s*\d*(?:\.\d+)?\s*)?\)$",
    )
    .expect("valid rgb pattern")
});

static HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid hex pattern"));

// ============ Rgb ============

/// Color with unrounded channels in `0.0..=255.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

/// Accepts `rgb(r, g, b)`, `rgba(r, g, b, a)` (alpha ignored), `#rgb` and
/// `#rrggbb` with fractional channels kept, then any other CSS color
/// (`green`, `hsl(120, 100%, 25%)`, ...) at 8-bit precision.
impl FromStr for Rgb {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if let Some(caps) = RGB_FUNCTION.captures(text) {
            let channel = |i: usize| {
                caps[i]
                    .parse::<f64>()
                    .map(|v| v.clamp(0.0, 255.0))
                    .map_err(|_| AnalysisError::InvalidColor(s.to_string()))
            };
            return Ok(Rgb::new(channel(1)?, channel(2)?, channel(3)?));
        }
        if let Some(caps) = HEX.captures(text) {
            let digits = &caps[1];
            let expanded: String = if digits.len() == 3 {
                digits.chars().flat_map(|c| [c, c]).collect()
            } else {
                digits.to_string()
            };
            let channel = |i: usize| {
                u8::from_str_radix(&expanded[i..i + 2], 16)
                    .map(f64::from)
                    .map_err(|_| AnalysisError::InvalidColor(s.to_string()))
            };
            return Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
        }
        let [r, g, b, _] = csscolorparser::parse(text)
            .map_err(|_| AnalysisError::InvalidColor(s.to_string()))?
            .to_rgba8();
        Ok(Rgb::new(f64::from(r), f64::from(g), f64::from(b)))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let round = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        write!(f, "rgb({}, {}, {})", round(self.r), round(self.g), round(self.b))
    }
}

// ============ Mixers ============

/// Weighting of the n-th color (1-based, outermost node first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mixer {
    /// Every color weighs 1.
    #[default]
    Average,
    /// `1 / n^2`
    Power,
    /// `1 / 2^n`
    Geometric,
    /// `1 / n`
    Harmonic,
}

impl Mixer {
    pub const ALL: [Mixer; 4] = [Mixer::Average, Mixer::Power, Mixer::Geometric, Mixer::Harmonic];

    pub fn weight(&self, position: usize) -> f64 {
        let n = position as f64;
        match self {
            Self::Average => 1.0,
            Self::Power => 1.0 / n.powi(2),
            Self::Geometric => 1.0 / 2f64.powf(n),
            Self::Harmonic => 1.0 / n,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Power => "power",
            Self::Geometric => "geometric",
            Self::Harmonic => "harmonic",
        }
    }
}

impl fmt::Display for Mixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mixer {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Mixer::ALL
            .into_iter()
            .find(|mixer| mixer.as_str() == name)
            .ok_or_else(|| AnalysisError::UnknownMixer(s.to_string()))
    }
}

// ============ Blending ============

/// Weighted channel average; `None` for an empty list.
pub fn mix(colors: &[Rgb], mixer: Mixer) -> Option<Rgb> {
    if colors.is_empty() {
        return None;
    }
    let weights: Vec<f64> = (1..=colors.len()).map(|n| mixer.weight(n)).collect();
    let total: f64 = weights.iter().sum();
    let mut blended = Rgb::new(0.0, 0.0, 0.0);
    for (color, weight) in colors.iter().zip(&weights) {
        let share = weight / total;
        blended.r += color.r * share;
        blended.g += color.g * share;
        blended.b += color.b * share;
    }
    Some(blended)
}

/// Parse and blend color strings; an empty list yields [`TRANSPARENT`].
pub fn mix_colors<S: AsRef<str>>(colors: &[S], mixer: Mixer) -> Result<String> {
    let parsed = colors
        .iter()
        .map(|color| color.as_ref().parse::<Rgb>())
        .collect::<Result<Vec<_>>>()?;
    Ok(blend_to_string(&parsed, mixer))
}

pub(crate) fn blend_to_string(colors: &[Rgb], mixer: Mixer) -> String {
    mix(colors, mixer).map_or_else(|| TRANSPARENT.to_string(), |color| color.to_string())
}
