//! chromatone CLI: convert an image file into a chord-sequence score.
//!
//! Decodes the image, derives or accepts a tempo, runs the conversion
//! pipeline, and prints the JSON response envelope to stdout. Failures
//! are printed as the error envelope and reported through the exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chromatone_pipeline::{
    ColorChoice, ConvertResponse, NoteMethod, PipelineConfig, RefineMethod, RegionMethod,
    TempoMethod, tempo,
};
use chromatone_worker::ScoreWorker;

/// Convert a raster image into a playable musical chord sequence.
#[derive(Debug, Parser)]
#[command(name = "chromatone", version, about)]
struct Args {
    /// Image file to convert (PNG, JPEG, BMP, or WebP).
    image: PathBuf,

    /// Where the tempo comes from: "manual" or "mean-key".
    #[arg(long, default_value_t = TempoMethod::Manual)]
    tempo: TempoMethod,

    /// Tempo in beats per minute (ignored with --tempo mean-key).
    #[arg(long, default_value_t = 80.0)]
    bpm: f64,

    /// Total target duration of the score in seconds.
    #[arg(long, default_value_t = 30.0)]
    duration: f64,

    /// Region decomposition: "grid" or "centered-grid".
    #[arg(long, default_value_t = RegionMethod::Grid)]
    region: RegionMethod,

    /// Color summarization: "mean", "proportional", or "xmeans".
    #[arg(long, default_value_t = ColorChoice::Mean)]
    color: ColorChoice,

    /// Minimum cluster standard deviation for --color xmeans, in [0, 1].
    #[arg(long, default_value_t = 0.05)]
    min_std: f64,

    /// Note conversion: "hsl-cone".
    #[arg(long, default_value_t = NoteMethod::HslCone)]
    note_method: NoteMethod,

    /// Note refinement: "trim".
    #[arg(long, default_value_t = RefineMethod::Trim)]
    refine_method: RefineMethod,

    /// Weight floor below which a note is dropped, in [0, 1].
    #[arg(long, default_value_t = 0.1)]
    min_weight: f64,

    /// Maximum simultaneous notes per chord.
    #[arg(long, default_value_t = 4)]
    max_notes: usize,

    /// Pin the random source for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (response, code) = match run(&args) {
        Ok(chords) => (ConvertResponse::Ok { chords }, ExitCode::SUCCESS),
        Err(message) => (ConvertResponse::Error { message }, ExitCode::FAILURE),
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    match rendered {
        Ok(json) => {
            println!("{json}");
            code
        }
        Err(e) => {
            eprintln!("failed to serialize response: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Decode, configure, and convert; any failure becomes the envelope
/// message.
fn run(args: &Args) -> Result<Vec<chromatone_pipeline::Chord>, String> {
    let image = image::open(&args.image)
        .map_err(|e| format!("failed to decode {}: {e}", args.image.display()))?
        .into_rgba8();
    debug!(
        width = image.width(),
        height = image.height(),
        "image decoded"
    );

    let bpm = match args.tempo {
        TempoMethod::Manual => args.bpm,
        TempoMethod::MeanKey => {
            let derived = tempo::mean_key_tempo(&image).map_err(|e| e.to_string())?;
            debug!(bpm = derived, "tempo derived from image");
            f64::from(derived)
        }
    };

    let config = PipelineConfig {
        bpm,
        duration_seconds: args.duration,
        region: args.region,
        color_choice: args.color,
        min_std: args.min_std,
        note_method: args.note_method,
        refine_method: args.refine_method,
        min_weight: args.min_weight,
        max_notes: args.max_notes,
        seed: args.seed,
    };

    // One-shot invocation: no edits to coalesce, so no debounce delay.
    let mut worker = ScoreWorker::with_debounce(std::time::Duration::ZERO);
    let receiver = worker.submit(image, config);
    receiver
        .recv()
        .map_err(|_| "conversion was cancelled before completing".to_owned())?
        .map_err(|e| e.to_string())
}
