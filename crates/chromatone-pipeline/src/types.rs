//! Shared types for the image-to-score pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::Rgb;
use crate::extract::ColorChoice;
use crate::note::{Note, NoteMethod};
use crate::refine::RefineMethod;
use crate::region::RegionMethod;

/// Re-export the pixel buffer types so downstream crates can build and
/// pass images without depending on `image` directly.
pub use image::{Rgba, RgbaImage};

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Configuration for one image-to-score conversion.
///
/// All parameters have defaults matching the interactive defaults of the
/// conversion UI. [`validate`](Self::validate) checks the numeric ranges;
/// the method fields are closed enums, so an unknown mode is
/// unrepresentable rather than a runtime error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tempo in beats per minute. Each region becomes one beat.
    pub bpm: f64,

    /// Total target duration of the score in seconds. Together with
    /// `bpm` this determines the approximate region count.
    pub duration_seconds: f64,

    /// How the image is partitioned into regions.
    pub region: RegionMethod,

    /// How each region's pixels become weighted colors.
    pub color_choice: ColorChoice,

    /// Minimum per-cluster standard deviation for the adaptive color
    /// strategy, in `[0, 1]` cone units.
    pub min_std: f64,

    /// How a representative color becomes a note.
    pub note_method: NoteMethod,

    /// How weighted notes are filtered into the playable lists.
    pub refine_method: RefineMethod,

    /// Weight floor below which a note is dropped, in `[0, 1]`.
    pub min_weight: f64,

    /// Maximum simultaneous notes per chord. Also caps the adaptive
    /// color strategy's cluster count.
    pub max_notes: usize,

    /// Seed for the random source. `None` draws fresh OS entropy per
    /// run, so repeated runs on identical input may legitimately differ;
    /// `Some` pins the run for reproducibility.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bpm: 80.0,
            duration_seconds: 30.0,
            region: RegionMethod::default(),
            color_choice: ColorChoice::default(),
            min_std: 0.05,
            note_method: NoteMethod::default(),
            refine_method: RefineMethod::default(),
            min_weight: 0.1,
            max_notes: 4,
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Check the numeric ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the offending
    /// field when a value is out of range or non-finite.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "bpm must be a positive number, got {}",
                self.bpm,
            )));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "duration must be a positive number of seconds, got {}",
                self.duration_seconds,
            )));
        }
        if !self.min_std.is_finite() || !(0.0..=1.0).contains(&self.min_std) {
            return Err(PipelineError::InvalidConfig(format!(
                "min_std must lie in [0, 1], got {}",
                self.min_std,
            )));
        }
        if !self.min_weight.is_finite() || !(0.0..=1.0).contains(&self.min_weight) {
            return Err(PipelineError::InvalidConfig(format!(
                "min_weight must lie in [0, 1], got {}",
                self.min_weight,
            )));
        }
        if self.max_notes == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_notes must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// The musical output for one region: simultaneous notes with a
/// duration, a render color, and the region geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    /// Unique id for this chord.
    pub id: Uuid,
    /// Notes to sound together. Empty means a rest.
    pub notes: Vec<Note>,
    /// Duration in milliseconds.
    pub duration_ms: f64,
    /// Representative color for rendering, as `#rrggbb`.
    pub color: Rgb,
    /// The region boundary this chord was derived from.
    pub polygon: Vec<Point>,
    /// The region centroid.
    pub centroid: Point,
}

/// Terminal response of one conversion, in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConvertResponse {
    /// The conversion succeeded.
    Ok {
        /// One chord per region, in region order.
        chords: Vec<Chord>,
    },
    /// The conversion failed; any previously displayed score should be
    /// left in place by the caller.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl From<Result<Vec<Chord>, PipelineError>> for ConvertResponse {
    fn from(result: Result<Vec<Chord>, PipelineError>) -> Self {
        match result {
            Ok(chords) => Self::Ok { chords },
            Err(e) => Self::Error {
                message: e.to_string(),
            },
        }
    }
}

/// Errors that can occur during score conversion.
///
/// Numeric degeneracy (homogeneous clusters, empty centroids) is
/// absorbed inside the clustering engine and never surfaces here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The input image has no pixels, or decomposition produced no
    /// regions.
    #[error("input image contains no pixels")]
    EmptyInput,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
