//! Color space conversions: RGB, HSL, and the HSL cone embedding.
//!
//! All conversions are pure functions, invertible up to rounding: for
//! integer RGB inputs, converting to HSL or HSLC and back reproduces the
//! input exactly.
//!
//! The cone embedding (HSLC) exists so that clustering in plain 3D
//! Euclidean space respects hue's circularity: hue and saturation become
//! a point on a disc of radius chroma/2, so two hues a few degrees apart
//! are close even when they straddle the 0°/360° seam. A naive (h, s, l)
//! Euclidean distance would tear that seam open.

use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A color as red/green/blue channels in `[0, 255]`.
///
/// Channels are `f64` because averaged colors are fractional; conversions
/// *to* RGB always round each channel to a whole number.
///
/// Serializes as a `#rrggbb` hex string (channels rounded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    /// Red channel in `[0, 255]`.
    pub r: f64,
    /// Green channel in `[0, 255]`.
    pub g: f64,
    /// Blue channel in `[0, 255]`.
    pub b: f64,
}

/// A color as hue (degrees in `[0, 360)`), saturation (`[0, 1]`), and
/// lightness (`[0, 1]`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue in degrees, `[0, 360)`. Zero when chroma is zero.
    pub h: f64,
    /// Saturation in `[0, 1]`. Zero when lightness is 0 or 1.
    pub s: f64,
    /// Lightness in `[0, 1]`.
    pub l: f64,
}

/// A color as Cartesian coordinates on the HSL cone.
///
/// `(x, y)` is hue/saturation as a point on a disc of radius chroma/2;
/// `z` is lightness shifted to be symmetric about zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hslc {
    /// `chroma/2 · cos(hue)`.
    pub x: f64,
    /// `chroma/2 · sin(hue)`.
    pub y: f64,
    /// `lightness − 0.5`, in `[-0.5, 0.5]`.
    pub z: f64,
}

impl Rgb {
    /// Create a color from channel values.
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Format as a `#rrggbb` hex string, rounding each channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_hex(self) -> String {
        let q = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}", q(self.r), q(self.g), q(self.b))
    }

    /// Parse a `#rrggbb` hex string.
    ///
    /// Returns `None` if the string is not exactly `#` followed by six
    /// hex digits.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(digits.get(range)?, 16).ok()
        };
        Some(Self {
            r: f64::from(channel(0..2)?),
            g: f64::from(channel(2..4)?),
            b: f64::from(channel(4..6)?),
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color: {hex}")))
    }
}

impl Hslc {
    /// The coordinates as an array, for flattening into cluster data.
    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Rebuild from a coordinate array (e.g. a cluster centroid).
    #[must_use]
    pub const fn from_array([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Hue sextant (`[0, 6)`) and chroma from the channel extremes.
///
/// Chroma zero is defined as hue zero. The red-is-max branch wraps the
/// raw `(g - b) / chroma` value into `[0, 6)` so hue stays non-negative.
fn hue_prime(rgb: Rgb) -> (f64, f64) {
    let Rgb { r, g, b } = rgb;
    let maxval = r.max(g).max(b);
    let minval = r.min(g).min(b);
    let chroma = maxval - minval;
    let hp = if chroma == 0.0 {
        0.0
    } else if maxval == r {
        ((g - b) / chroma).rem_euclid(6.0)
    } else if maxval == g {
        (b - r) / chroma + 2.0
    } else {
        (r - g) / chroma + 4.0
    };
    (hp, chroma)
}

/// Convert RGB to HSL.
#[must_use]
pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let (hp, chroma) = hue_prime(rgb);
    let minval = rgb.r.min(rgb.g).min(rgb.b);
    let lightness = (minval + chroma / 2.0) / 255.0;
    let saturation = if lightness <= 0.0 || lightness >= 1.0 {
        0.0
    } else {
        chroma / 255.0 / (1.0 - (2.0 * lightness - 1.0).abs())
    };
    Hsl {
        h: hp * 60.0,
        s: saturation,
        l: lightness,
    }
}

/// Convert HSL to RGB, rounding channels to whole numbers.
#[must_use]
pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let Hsl { h, s, l } = hsl;
    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let second = chroma * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let base = l - chroma / 2.0;
    assemble(hp, chroma, second, base)
}

/// Convert RGB to the HSL cone embedding.
#[must_use]
pub fn rgb_to_hslc(rgb: Rgb) -> Hslc {
    let (hp, chroma) = hue_prime(rgb);
    let minval = rgb.r.min(rgb.g).min(rgb.b);
    let lightness = (minval + chroma / 2.0) / 255.0;
    let radius = chroma / 255.0 / 2.0;
    let angle = hp * PI / 3.0;
    Hslc {
        x: angle.cos() * radius,
        y: angle.sin() * radius,
        z: lightness - 0.5,
    }
}

/// Convert from the HSL cone back to RGB, rounding channels.
#[must_use]
pub fn hslc_to_rgb(hslc: Hslc) -> Rgb {
    let Hslc { x, y, z } = hslc;
    let l = z + 0.5;
    let angle = y.atan2(x).rem_euclid(TAU);
    let hp = angle * 3.0 / PI;
    let chroma = x.hypot(y) * 2.0;
    let second = chroma * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let base = l - chroma / 2.0;
    assemble(hp, chroma, second, base)
}

/// Place chroma and its secondary component into the channel slots for
/// the given hue sextant, add the lightness base, and quantize.
fn assemble(hp: f64, chroma: f64, second: f64, base: f64) -> Rgb {
    let (r, g, b) = if hp < 1.0 {
        (chroma, second, 0.0)
    } else if hp < 2.0 {
        (second, chroma, 0.0)
    } else if hp < 3.0 {
        (0.0, chroma, second)
    } else if hp < 4.0 {
        (0.0, second, chroma)
    } else if hp < 5.0 {
        (second, 0.0, chroma)
    } else {
        (chroma, 0.0, second)
    };
    let q = |v: f64| ((v + base) * 255.0).round().clamp(0.0, 255.0);
    Rgb {
        r: q(r),
        g: q(g),
        b: q(b),
    }
}
