//! End-to-end conversion scenarios.

#![allow(clippy::unwrap_used)]

use chromatone_pipeline::{
    ColorChoice, ConvertResponse, PipelineConfig, PipelineError, Rgba, RgbaImage, process,
    tempo::mean_key_tempo,
};

fn seeded() -> PipelineConfig {
    PipelineConfig {
        seed: Some(42),
        ..PipelineConfig::default()
    }
}

/// A 2x2 image of pure red, green, blue, and yellow at one beat total
/// must collapse into a single chord spanning all four pixels.
#[test]
fn four_pixel_image_at_one_beat_yields_one_chord() {
    let mut image = RgbaImage::new(2, 2);
    image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    image.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
    image.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
    image.put_pixel(1, 1, Rgba([255, 255, 0, 255]));

    let config = PipelineConfig {
        bpm: 60.0,
        duration_seconds: 1.0,
        min_weight: 0.0,
        ..seeded()
    };
    let chords = process(&image, &config).unwrap();

    assert_eq!(chords.len(), 1);
    let chord = &chords[0];
    assert!((chord.duration_ms - 1000.0).abs() < 1e-9);
    // The polygon spans the whole image.
    assert!((chord.centroid.x - 1.0).abs() < 1e-9);
    assert!((chord.centroid.y - 1.0).abs() < 1e-9);
    // Mean extraction gives exactly one representative color, so one note.
    assert_eq!(chord.notes.len(), 1);
}

/// An all-black image produces only bottom-octave C chords, every chord
/// one beat long.
#[test]
fn all_black_image_is_all_low_c() {
    for (w, h) in [(4, 4), (10, 6)] {
        let image = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));
        let config = PipelineConfig {
            bpm: 90.0,
            duration_seconds: 4.0,
            min_weight: 0.0,
            ..seeded()
        };
        let chords = process(&image, &config).unwrap();
        assert!(!chords.is_empty());
        for chord in &chords {
            assert!((chord.duration_ms - 60_000.0 / 90.0).abs() < 1e-9);
            assert_eq!(chord.notes.len(), 1);
            assert_eq!(chord.notes[0].to_string(), "C1");
            assert_eq!(chord.color.to_hex(), "#000000");
        }
    }
}

/// All strategies handle a many-region conversion without losing regions.
#[test]
fn every_strategy_preserves_region_count() {
    let image = RgbaImage::from_fn(12, 12, |x, y| {
        if (x / 3 + y / 3) % 2 == 0 {
            Rgba([240, 20, 20, 255])
        } else {
            Rgba([20, 20, 240, 255])
        }
    });
    for choice in [
        ColorChoice::Mean,
        ColorChoice::Proportional,
        ColorChoice::Xmeans,
    ] {
        let config = PipelineConfig {
            bpm: 120.0,
            duration_seconds: 8.0,
            color_choice: choice,
            min_weight: 0.0,
            ..seeded()
        };
        let chords = process(&image, &config).unwrap();
        assert_eq!(chords.len(), 16, "strategy {choice}");
        assert!(chords.iter().all(|c| c.notes.len() <= config.max_notes));
    }
}

/// The adaptive strategy on a two-color region surfaces both pitches.
#[test]
fn xmeans_surfaces_both_colors_of_a_split_region() {
    let image = RgbaImage::from_fn(8, 8, |x, _| {
        if x < 4 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let config = PipelineConfig {
        bpm: 60.0,
        duration_seconds: 1.0,
        color_choice: ColorChoice::Xmeans,
        min_weight: 0.0,
        min_std: 0.01,
        ..seeded()
    };
    let chords = process(&image, &config).unwrap();
    assert_eq!(chords.len(), 1);
    assert!(
        chords[0].notes.len() >= 2,
        "expected both colors to surface, got {:?}",
        chords[0].notes,
    );
}

/// The mean-key tempo of an all-white image sits at the upper bound.
#[test]
fn mean_key_tempo_of_white_is_450() {
    let image = RgbaImage::from_pixel(5, 5, Rgba([255, 255, 255, 255]));
    assert_eq!(mean_key_tempo(&image).unwrap(), 450);
}

/// Failures convert into the error envelope; successes carry the chords.
#[test]
fn response_envelope_round_trips_as_json() {
    let image = RgbaImage::from_pixel(2, 2, Rgba([128, 0, 128, 255]));
    let config = PipelineConfig {
        bpm: 60.0,
        duration_seconds: 1.0,
        min_weight: 0.0,
        ..seeded()
    };

    let ok = ConvertResponse::from(process(&image, &config));
    let json = serde_json::to_string(&ok).unwrap();
    let back: ConvertResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ok);
    assert!(matches!(back, ConvertResponse::Ok { ref chords } if chords.len() == 1));

    let err = ConvertResponse::from(Err::<Vec<_>, _>(PipelineError::EmptyInput));
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains("\"status\":\"error\""));
}

/// Fully transparent pixels read as white, driving notes to the top
/// octave.
#[test]
fn transparent_image_reads_as_white() {
    let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
    let config = PipelineConfig {
        bpm: 60.0,
        duration_seconds: 1.0,
        min_weight: 0.0,
        ..seeded()
    };
    let chords = process(&image, &config).unwrap();
    assert_eq!(chords[0].notes[0].to_string(), "C7");
    assert_eq!(chords[0].color.to_hex(), "#ffffff");
}
