//! Capture session: camera → sampled frames → frame sink
//!
//! `Idle → Streaming → Idle`. While streaming, a ticker grabs one frame per
//! interval, encodes it as a JPEG data URI and submits it. At most one
//! submission is in flight; ticks that land while one is pending are dropped
//! and counted.

use async_trait::async_trait;
use facereg_common::RecognizedFace;
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, ClientError};
use crate::frame::encode_data_uri;

/// Default sampling interval
pub const FRAME_INTERVAL: Duration = Duration::from_millis(500);

/// A capture device that can be opened for streaming
pub trait Camera {
    /// Acquire the device; the returned source releases it when dropped
    fn open(&mut self) -> Result<Box<dyn FrameSource>, CaptureError>;
}

/// An open capture device
pub trait FrameSource: Send {
    fn grab(&mut self) -> Result<DynamicImage, CaptureError>;
}

/// Where sampled frames go; resolves once the frame's result is known
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn submit(&self, frame: String) -> Result<Vec<RecognizedFace>, ClientError>;
}

/// Outcome of one submitted frame
pub type Recognition = Result<Vec<RecognizedFace>, ClientError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Streaming,
}

/// Per-session counters
#[derive(Debug, Default)]
pub struct CaptureStats {
    submitted: AtomicU64,
    dropped: AtomicU64,
    failed_grabs: AtomicU64,
}

impl CaptureStats {
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Ticks skipped because a submission was still pending
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn failed_grabs(&self) -> u64 {
        self.failed_grabs.load(Ordering::Relaxed)
    }
}

struct Ticker {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct CaptureSession {
    sink: Arc<dyn FrameSink>,
    results: mpsc::Sender<Recognition>,
    interval: Duration,
    stats: Arc<CaptureStats>,
    ticker: Option<Ticker>,
}

impl CaptureSession {
    /// Results of each submission are delivered on `results`
    pub fn new(sink: Arc<dyn FrameSink>, results: mpsc::Sender<Recognition>) -> Self {
        Self {
            sink,
            results,
            interval: FRAME_INTERVAL,
            stats: Arc::new(CaptureStats::default()),
            ticker: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> CaptureState {
        match self.ticker {
            Some(_) => CaptureState::Streaming,
            None => CaptureState::Idle,
        }
    }

    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }

    /// Open the camera and start sampling
    ///
    /// On failure the session stays `Idle`; the error is meant to be shown to
    /// the user, not treated as fatal.
    pub fn start(&mut self, camera: &mut dyn Camera) -> Result<(), CaptureError> {
        if self.ticker.is_some() {
            return Err(CaptureError::AlreadyStreaming);
        }

        let source = camera.open()?;
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_ticker(
            source,
            Arc::clone(&self.sink),
            self.results.clone(),
            self.interval,
            Arc::clone(&self.stats),
            shutdown.clone(),
        ));

        self.ticker = Some(Ticker { shutdown, handle });
        info!(interval_ms = self.interval.as_millis() as u64, "Capture started");
        Ok(())
    }

    /// Stop sampling and wait for the camera to be released
    pub async fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.shutdown.cancel();
            if let Err(e) = ticker.handle.await {
                warn!("Capture ticker ended abnormally: {}", e);
            }
            info!(
                submitted = self.stats.submitted(),
                dropped = self.stats.dropped(),
                "Capture stopped"
            );
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.shutdown.cancel();
        }
    }
}

/// Clears the in-flight flag when a submission finishes or is cancelled
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn run_ticker(
    mut source: Box<dyn FrameSource>,
    sink: Arc<dyn FrameSink>,
    results: mpsc::Sender<Recognition>,
    interval: Duration,
    stats: Arc<CaptureStats>,
    shutdown: CancellationToken,
) {
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut ticks = tokio::time::interval(interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticks.tick() => {}
        }

        if in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            stats.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("Frame dropped, previous submission pending");
            continue;
        }
        let guard = InFlight(Arc::clone(&in_flight));

        // Grabbing reads and decodes files; encoding is CPU bound
        let grabbed = tokio::task::spawn_blocking(move || {
            let frame = source.grab().and_then(|image| {
                encode_data_uri(&image).map_err(|e| CaptureError::Frame(e.to_string()))
            });
            (source, frame)
        })
        .await;
        let frame = match grabbed {
            Ok((returned, frame)) => {
                source = returned;
                frame
            }
            Err(e) => {
                warn!("Frame grab panicked, releasing camera: {}", e);
                break;
            }
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                stats.failed_grabs.fetch_add(1, Ordering::Relaxed);
                warn!("Skipping frame: {}", e);
                continue;
            }
        };

        stats.submitted.fetch_add(1, Ordering::Relaxed);
        let sink = Arc::clone(&sink);
        let results = results.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                _ = shutdown.cancelled() => {}
                outcome = sink.submit(frame) => {
                    let _ = results.send(outcome).await;
                }
            }
        });
    }

    // The device is released when the source drops, at the latest here
    debug!("Capture ticker exited");
}
