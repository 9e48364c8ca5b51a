//! chromatone-worker: off-thread execution for score conversions.
//!
//! [`ScoreWorker`] runs the pipeline on a background thread so the
//! caller's thread is never blocked, coalesces rapid successive requests
//! through a debounce delay, and guarantees at most one live computation:
//! submitting a new request cancels interest in the previous one. A
//! cancelled computation may still run to completion, but its result is
//! discarded: the caller observes a disconnected channel, never a stale
//! score.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chromatone_pipeline::{Chord, PipelineConfig, PipelineError, RgbaImage, process};
use tracing::debug;

/// The terminal outcome of one submission.
pub type ScoreResult = Result<Vec<Chord>, PipelineError>;

/// How often a debouncing job re-checks its cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// A handle to one in-flight conversion.
///
/// Dropping the handle detaches the thread; the token is what actually
/// cancels interest in its result.
struct Job {
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Runs conversions off the caller's thread, one at a time.
///
/// Create one per caller session and reuse it. Each
/// [`submit`](Self::submit) atomically cancels-and-replaces any
/// outstanding job, so only the newest request can ever deliver a
/// result.
///
/// ```no_run
/// # use chromatone_pipeline::{PipelineConfig, RgbaImage};
/// # use chromatone_worker::ScoreWorker;
/// # fn run(image: RgbaImage) {
/// let mut worker = ScoreWorker::new();
/// let receiver = worker.submit(image, PipelineConfig::default());
/// match receiver.recv() {
///     Ok(Ok(chords)) => println!("{} chords", chords.len()),
///     Ok(Err(e)) => eprintln!("conversion failed: {e}"),
///     Err(_) => {} // superseded by a newer submission
/// }
/// # }
/// ```
pub struct ScoreWorker {
    debounce: Duration,
    job: Option<Job>,
}

impl ScoreWorker {
    /// Delay before a submitted request actually starts computing.
    /// Requests superseded within the window never compute at all.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

    /// Create a worker with the default debounce delay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_debounce(Self::DEFAULT_DEBOUNCE)
    }

    /// Create a worker with a custom debounce delay.
    #[must_use]
    pub const fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            job: None,
        }
    }

    /// Submit a conversion, cancelling any outstanding one.
    ///
    /// Returns the receiving end of a channel that will carry exactly
    /// one terminal result, unless this request is itself superseded or
    /// cancelled, in which case the channel simply disconnects without a
    /// value.
    pub fn submit(&mut self, image: RgbaImage, config: PipelineConfig) -> Receiver<ScoreResult> {
        self.cancel();

        let cancel = Arc::new(AtomicBool::new(false));
        let token = Arc::clone(&cancel);
        let debounce = self.debounce;
        let (sender, receiver) = mpsc::channel();

        let thread = thread::spawn(move || {
            if sleep_unless_cancelled(&token, debounce) {
                debug!("request superseded during debounce");
                return;
            }

            debug!(
                width = image.width(),
                height = image.height(),
                "conversion started"
            );
            let outcome = process(&image, &config);

            if token.load(Ordering::Acquire) {
                debug!("stale result discarded");
                return;
            }
            // The receiver may already be gone; that is just another
            // form of lost interest.
            if sender.send(outcome).is_err() {
                debug!("result delivered to a dropped receiver");
            }
        });

        self.job = Some(Job { cancel, thread });
        receiver
    }

    /// Cancel interest in the outstanding conversion, if any.
    ///
    /// The stale thread may still run to completion, but it will never
    /// deliver a result. This does not block on the thread.
    pub fn cancel(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel.store(true, Ordering::Release);
            // Dropping the handle detaches the thread rather than
            // joining it.
            drop(job.thread);
            debug!("outstanding conversion cancelled");
        }
    }

    /// Whether a submission is currently outstanding (debouncing or
    /// computing).
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.job
            .as_ref()
            .is_some_and(|job| !job.thread.is_finished())
    }
}

impl Default for ScoreWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScoreWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Sleep for `duration`, waking early if the token flips.
///
/// Returns `true` when the sleep was interrupted by cancellation.
fn sleep_unless_cancelled(token: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if token.load(Ordering::Acquire) {
            return true;
        }
        let Some(remaining) = deadline.checked_duration_since(Instant::now()).filter(|r| !r.is_zero())
        else {
            return token.load(Ordering::Acquire);
        };
        thread::sleep(remaining.min(CANCEL_POLL));
    }
}
