//! chromatone-pipeline: Pure image-to-score conversion (sans-IO).
//!
//! Converts a raster image into a sequence of musical chords through:
//! region decomposition -> color extraction -> note mapping ->
//! aggregation -> refinement.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. Threading, debounce, and
//! cancellation live in `chromatone-worker`; decoding and presentation
//! live with the callers.

pub mod cluster;
pub mod color;
pub mod extract;
pub mod note;
pub mod refine;
pub mod region;
pub mod stats;
pub mod tempo;
pub mod types;

use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

pub use color::Rgb;
pub use extract::ColorChoice;
pub use note::{Note, NoteMethod, PitchClass};
pub use refine::RefineMethod;
pub use region::RegionMethod;
pub use tempo::TempoMethod;
pub use types::{Chord, ConvertResponse, PipelineConfig, PipelineError, Point, Rgba, RgbaImage};

use crate::color::{hslc_to_rgb, rgb_to_hslc};
use crate::extract::ExtractOptions;
use crate::stats::{ArrayMean, MaxBy};

/// Convert an image into a chord sequence.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decompose the image into ~`bpm * duration / 60` ordered regions
/// 3. Extract weighted representative colors per region (pluggable
///    strategy)
/// 4. Map colors to notes and aggregate weights per note, averaging each
///    note's colors on the HSL cone
/// 5. Build one chord per region (duration `60000 / bpm` ms, render
///    color from the heaviest note group)
/// 6. Refine the full weighted-note table and splice the surviving notes
///    back into the chords
///
/// Randomized steps (adaptive clustering) draw from a generator seeded
/// by `config.seed`, or from OS entropy when no seed is set.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if a configuration value is
/// out of range and [`PipelineError::EmptyInput`] if the image has no
/// pixels.
pub fn process(image: &RgbaImage, config: &PipelineConfig) -> Result<Vec<Chord>, PipelineError> {
    config.validate()?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // 2. Region decomposition: one region per beat.
    let beats = config.bpm * config.duration_seconds / 60.0;
    let regions = region::regions(image, config.region, beats);
    if regions.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut chords = Vec::with_capacity(regions.len());
    let mut weighted_notes: Vec<Vec<(Note, f64)>> = Vec::with_capacity(regions.len());

    for reg in &regions {
        let options = ExtractOptions {
            pixel_count: reg.pixel_count(),
            max_clusters: config.max_notes,
            min_std: config.min_std,
        };

        // 3+4. Extract weighted colors and aggregate them per note,
        // preserving first-seen note order. Each group averages its
        // colors on the cone so the render color respects hue wrap.
        let mut groups: Vec<(Note, f64, ArrayMean<3>)> = Vec::new();
        for (color, weight) in extract::extract(reg.colors(), config.color_choice, &options, &mut rng)
        {
            let mapped = note::note_for(color, config.note_method);
            let cone = rgb_to_hslc(color).to_array();
            match groups.iter_mut().find(|(n, _, _)| *n == mapped) {
                Some((_, total, mean)) => {
                    *total += weight;
                    mean.push(cone);
                }
                None => {
                    let mut mean = ArrayMean::new();
                    mean.push(cone);
                    groups.push((mapped, weight, mean));
                }
            }
        }

        // 5. Normalize weights and pick the render color.
        let norm: f64 = groups.iter().map(|(_, w, _)| w).sum();
        let mut best_color = MaxBy::new();
        let mut notes = Vec::with_capacity(groups.len());
        for (mapped, weight, mean) in &groups {
            if let Some(coords) = mean.value() {
                best_color.push(hslc_to_rgb(color::Hslc::from_array(coords)), *weight);
            }
            let share = if norm > 0.0 { weight / norm } else { 0.0 };
            notes.push((*mapped, share));
        }
        weighted_notes.push(notes);

        chords.push(Chord {
            id: Uuid::new_v4(),
            // Filled in by the refinement pass below.
            notes: Vec::new(),
            duration_ms: 60_000.0 / config.bpm,
            color: best_color.into_value().unwrap_or(Rgb::new(0.0, 0.0, 0.0)),
            polygon: reg.polygon(),
            centroid: reg.centroid(),
        });
    }

    // 6. Refine across the whole table and splice back, in region order.
    let refined = refine::refine(
        &weighted_notes,
        config.refine_method,
        config.min_weight,
        config.max_notes,
    );
    for (chord, notes) in chords.iter_mut().zip(refined) {
        chord.notes = notes;
    }

    Ok(chords)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seeded(config: PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            seed: Some(1234),
            ..config
        }
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = RgbaImage::new(0, 0);
        let result = process(&image, &seeded(PipelineConfig::default()));
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn invalid_config_fails_before_computation() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let config = PipelineConfig {
            bpm: -10.0,
            ..PipelineConfig::default()
        };
        let result = process(&image, &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn chord_count_tracks_the_beat_target() {
        // 120 bpm for 2 seconds targets 4 regions on an 8x8 image.
        let image = RgbaImage::from_pixel(8, 8, Rgba([200, 30, 40, 255]));
        let config = seeded(PipelineConfig {
            bpm: 120.0,
            duration_seconds: 2.0,
            ..PipelineConfig::default()
        });
        let chords = process(&image, &config).unwrap();
        assert_eq!(chords.len(), 4);
        for chord in &chords {
            assert!((chord.duration_ms - 500.0).abs() < 1e-9);
        }
    }

    #[test]
    fn chord_ids_are_unique() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([10, 120, 220, 255]));
        let config = seeded(PipelineConfig {
            bpm: 240.0,
            duration_seconds: 4.0,
            ..PipelineConfig::default()
        });
        let chords = process(&image, &config).unwrap();
        let mut ids: Vec<Uuid> = chords.iter().map(|c| c.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), chords.len());
    }

    #[test]
    fn uniform_image_yields_that_color_everywhere() {
        let image = RgbaImage::from_pixel(6, 6, Rgba([255, 0, 0, 255]));
        let config = seeded(PipelineConfig {
            bpm: 60.0,
            duration_seconds: 4.0,
            min_weight: 0.0,
            ..PipelineConfig::default()
        });
        let chords = process(&image, &config).unwrap();
        for chord in &chords {
            assert_eq!(chord.color, Rgb::new(255.0, 0.0, 0.0));
            assert_eq!(chord.notes.len(), 1);
        }
    }

    #[test]
    fn proportional_strategy_matches_mean_on_uniform_input() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        let base = seeded(PipelineConfig {
            bpm: 60.0,
            duration_seconds: 1.0,
            min_weight: 0.0,
            ..PipelineConfig::default()
        });
        let mean = process(&image, &base).unwrap();
        let proportional = process(
            &image,
            &PipelineConfig {
                color_choice: ColorChoice::Proportional,
                ..base
            },
        )
        .unwrap();
        assert_eq!(mean[0].notes, proportional[0].notes);
        assert_eq!(mean[0].color, proportional[0].color);
    }

    #[test]
    fn refinement_caps_notes_per_chord() {
        // Proportional extraction on a noisy image produces many note
        // groups; refinement must cap each chord.
        let image = RgbaImage::from_fn(8, 8, |x, y| {
            Rgba([
                u8::try_from(x * 31 % 256).unwrap_or(0),
                u8::try_from(y * 67 % 256).unwrap_or(0),
                u8::try_from((x + y) * 13 % 256).unwrap_or(0),
                255,
            ])
        });
        let config = seeded(PipelineConfig {
            bpm: 60.0,
            duration_seconds: 1.0,
            color_choice: ColorChoice::Proportional,
            min_weight: 0.0,
            max_notes: 2,
            ..PipelineConfig::default()
        });
        let chords = process(&image, &config).unwrap();
        assert!(chords.iter().all(|c| c.notes.len() <= 2));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let image = RgbaImage::from_fn(6, 6, |x, _| {
            if x < 3 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let config = seeded(PipelineConfig {
            bpm: 60.0,
            duration_seconds: 1.0,
            color_choice: ColorChoice::Xmeans,
            min_weight: 0.0,
            ..PipelineConfig::default()
        });
        let first = process(&image, &config).unwrap();
        let second = process(&image, &config).unwrap();
        let notes = |chords: &[Chord]| {
            chords
                .iter()
                .map(|c| c.notes.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(notes(&first), notes(&second));
    }
}
