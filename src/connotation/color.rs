//! Score → display color mapping
//!
//! Pure and deterministic: identical scores always produce identical colors.
//! Magnitudes are quantized into `BANDS` bands; each band picks a point on a
//! pale→saturated ramp (warm for positive, cool for negative) and an alpha
//! that rises with the band.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of magnitude bands.
pub const BANDS: u8 = 4;

const ALPHA_MIN: f32 = 0.25;
const ALPHA_MAX: f32 = 0.85;

/// Pale and saturated endpoints of the warm (positive) ramp.
const WARM: ([u8; 3], [u8; 3]) = ([255, 236, 179], [230, 81, 0]);
/// Pale and saturated endpoints of the cool (negative) ramp.
const COOL: ([u8; 3], [u8; 3]) = ([187, 222, 251], [13, 71, 161]);

/// An RGBA display color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl Color {
    /// Fully transparent: no visible highlight.
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        alpha: 0.0,
    };

    pub fn is_transparent(&self) -> bool {
        self.alpha == 0.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_transparent() {
            write!(f, "transparent")
        } else {
            write!(f, "rgba({}, {}, {}, {:.2})", self.r, self.g, self.b, self.alpha)
        }
    }
}

/// Magnitude band for a score: 0 for neutral, `1..=BANDS` otherwise.
pub fn band(score: f64) -> u8 {
    let magnitude = clamp_score(score).abs();
    if magnitude == 0.0 {
        return 0;
    }
    let band = (magnitude * f64::from(BANDS)).ceil() as u8;
    band.clamp(1, BANDS)
}

/// Map a connotation score to its display color.
pub fn color_of(score: f64) -> Color {
    let score = clamp_score(score);
    let band = band(score);
    if band == 0 {
        return Color::TRANSPARENT;
    }

    let (pale, saturated) = if score > 0.0 { WARM } else { COOL };
    // Band 1 sits on the pale endpoint, the top band on the saturated one.
    let t = f32::from(band - 1) / f32::from(BANDS - 1);
    Color {
        r: lerp(pale[0], saturated[0], t),
        g: lerp(pale[1], saturated[1], t),
        b: lerp(pale[2], saturated[2], t),
        alpha: ALPHA_MIN + (ALPHA_MAX - ALPHA_MIN) * t,
    }
}

/// Clamp to [-1, 1]; NaN and infinities collapse to neutral.
pub(crate) fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn lerp(from: u8, to: u8, t: f32) -> u8 {
    let value = f32::from(from) + (f32::from(to) - f32::from(from)) * t;
    value.round().clamp(0.0, 255.0) as u8
}
