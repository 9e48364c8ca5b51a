//! Tempo selection: derive a tempo from the image itself.
//!
//! The mean-key method summarizes the whole image as one mean color on
//! the HSL cone, quantizes it to a key (pitch sector plus octave band),
//! and places that key on a log scale between a low and high BPM bound.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::color::rgb_to_hsl;
use crate::extract::hslc_mean;
use crate::note::quantize;
use crate::region::whole_image;
use crate::types::PipelineError;

/// Default lower tempo bound in BPM.
pub const LOW_BPM: f64 = 25.0;

/// Default upper tempo bound in BPM.
pub const HIGH_BPM: f64 = 450.0;

/// Selects where the tempo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TempoMethod {
    /// The caller supplies the BPM directly.
    #[default]
    Manual,
    /// Derive the BPM from the image's mean color.
    MeanKey,
}

impl TempoMethod {
    /// The wire/CLI name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::MeanKey => "mean-key",
        }
    }
}

impl fmt::Display for TempoMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TempoMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "mean-key" => Ok(Self::MeanKey),
            other => Err(format!("unknown tempo method: {other}")),
        }
    }
}

/// Derive a tempo from the image's mean color, between the default
/// bounds.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] when the image has no pixels.
pub fn mean_key_tempo(image: &RgbaImage) -> Result<u32, PipelineError> {
    mean_key_tempo_in(image, LOW_BPM, HIGH_BPM)
}

/// Derive a tempo from the image's mean color, between custom bounds.
///
/// The mean color's key (pitch sector plus 12 times the 0-based octave
/// band, spanning `[0, 72]`) is placed log-linearly between `low` and
/// `high` and rounded to a whole BPM.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] when the image has no pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn mean_key_tempo_in(image: &RgbaImage, low: f64, high: f64) -> Result<u32, PipelineError> {
    let mean = hslc_mean(whole_image(image).colors()).ok_or(PipelineError::EmptyInput)?;
    let (sector, band) = quantize(rgb_to_hsl(mean));
    let key = (sector + band * 12) as f64;
    Ok(((high.ln() - low.ln()) / 72.0 * key + low.ln()).exp().round() as u32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(pixel))
    }

    #[test]
    fn white_image_hits_the_upper_bound() {
        // White: top octave band and pitch sector zero, key 72.
        let bpm = mean_key_tempo(&solid([255, 255, 255, 255])).unwrap();
        assert_eq!(bpm, 450);
    }

    #[test]
    fn black_image_hits_the_lower_bound() {
        // Black: band and sector zero, key 0.
        let bpm = mean_key_tempo(&solid([0, 0, 0, 255])).unwrap();
        assert_eq!(bpm, 25);
    }

    #[test]
    fn tempo_grows_with_lightness() {
        let dark = mean_key_tempo(&solid([40, 40, 40, 255])).unwrap();
        let bright = mean_key_tempo(&solid([220, 220, 220, 255])).unwrap();
        assert!(bright > dark, "{bright} <= {dark}");
    }

    #[test]
    fn custom_bounds_are_respected() {
        let bpm = mean_key_tempo_in(&solid([255, 255, 255, 255]), 60.0, 120.0).unwrap();
        assert_eq!(bpm, 120);
        let bpm = mean_key_tempo_in(&solid([0, 0, 0, 255]), 60.0, 120.0).unwrap();
        assert_eq!(bpm, 60);
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = RgbaImage::new(0, 0);
        assert!(matches!(
            mean_key_tempo(&image),
            Err(PipelineError::EmptyInput),
        ));
    }

    #[test]
    fn tempo_method_names_round_trip() {
        for method in [TempoMethod::Manual, TempoMethod::MeanKey] {
            assert_eq!(method.name().parse::<TempoMethod>(), Ok(method));
        }
        assert!("texture".parse::<TempoMethod>().is_err());
    }
}
