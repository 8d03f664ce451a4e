//! Two-phase render pipeline shared between the render thread and the
//! display loop.
//!
//! The render thread runs the producer's preview pass, then its final pass,
//! and persists whatever the final pass delivers. The display thread reads the
//! [`ProgressiveBuffer`] every frame and may finalize early from the preview.
//!
//! Early finalize ends the session: it moves the pipeline to
//! [`PipelineState::Done`], so the render thread skips the final pass if it has
//! not started it yet, and a final image that arrives later is discarded
//! without touching the artifacts. Exactly one [`FinalResult`] is ever
//! persisted per session.

mod bridge;
mod gate;

use crate::raytracer::color::DisplayColor;
use crate::raytracer::error::{Error, Result};
use crate::raytracer::exporter::Exporter;
use crate::raytracer::framebuffer::{FinalResult, ProgressiveBuffer};
use crate::raytracer::renderloop::Producer;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

pub use bridge::InputBridge;
pub use gate::CancellationGate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    NotStarted = 0,
    PreviewRunning = 1,
    PreviewStoppedOrFinished = 2,
    FinalRunning = 3,
    Done = 4,
    Failed = 5,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PipelineState::NotStarted,
            1 => PipelineState::PreviewRunning,
            2 => PipelineState::PreviewStoppedOrFinished,
            3 => PipelineState::FinalRunning,
            4 => PipelineState::Done,
            _ => PipelineState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineState::NotStarted => "waiting",
            PipelineState::PreviewRunning => "preview",
            PipelineState::PreviewStoppedOrFinished => "preview finished",
            PipelineState::FinalRunning => "final pass",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

/// Forward-only state machine. Every transition is a compare-exchange, so
/// no state is ever re-entered.
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(PipelineState::NotStarted as u8))
    }

    fn load(&self) -> PipelineState {
        PipelineState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn advance(&self, from: PipelineState, to: PipelineState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves a started, unfinished pipeline to `to`. Returns the state it
    /// left, or `None` if another caller got there first.
    fn finish(&self, to: PipelineState) -> Option<PipelineState> {
        let mut current = self.load();
        loop {
            if current == PipelineState::NotStarted || current.is_terminal() {
                return None;
            }
            match self.0.compare_exchange(
                current as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => current = PipelineState::from_u8(actual),
            }
        }
    }
}

/// Outcome of writing the artifacts of a finalized session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SaveStatus {
    Pending = 0,
    Saved = 1,
    Failed = 2,
}

impl SaveStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SaveStatus::Pending,
            1 => SaveStatus::Saved,
            _ => SaveStatus::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalizeSource {
    /// The user accepted the preview.
    Early,
    /// The producer's final pass completed.
    FinalPass,
}

/// One file written when the pipeline finalizes.
pub struct ArtifactTarget {
    exporter: Box<dyn Exporter + Send + Sync>,
    path: PathBuf,
}

impl ArtifactTarget {
    pub fn new(exporter: impl Exporter + Send + Sync + 'static, path: impl Into<PathBuf>) -> Self {
        Self {
            exporter: Box::new(exporter),
            path: path.into(),
        }
    }
}

struct Shared {
    width: usize,
    height: usize,
    samples_per_pixel: AtomicU32,
    state: StateCell,
    buffer: Arc<ProgressiveBuffer>,
    // Set once the first preview pixel reaches the buffer.
    has_pixels: AtomicBool,
    save_status: AtomicU8,
    gate: CancellationGate,
    result: OnceLock<Arc<FinalResult>>,
    targets: Vec<ArtifactTarget>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct RenderOrchestrator {
    shared: Arc<Shared>,
}

impl RenderOrchestrator {
    pub fn new(width: usize, height: usize, targets: Vec<ArtifactTarget>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self {
            shared: Arc::new(Shared {
                width,
                height,
                samples_per_pixel: AtomicU32::new(0),
                state: StateCell::new(),
                buffer: Arc::new(ProgressiveBuffer::new(width, height)),
                has_pixels: AtomicBool::new(false),
                save_status: AtomicU8::new(SaveStatus::Pending as u8),
                gate: CancellationGate::new(),
                result: OnceLock::new(),
                targets,
                worker: Mutex::new(None),
            }),
        })
    }

    pub fn buffer(&self) -> &Arc<ProgressiveBuffer> {
        &self.shared.buffer
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state.load()
    }

    pub fn final_result(&self) -> Option<Arc<FinalResult>> {
        self.shared.result.get().cloned()
    }

    pub fn save_status(&self) -> SaveStatus {
        SaveStatus::from_u8(self.shared.save_status.load(Ordering::Acquire))
    }

    /// Whether early finalize currently has a preview to take.
    pub fn can_finalize_early(&self) -> bool {
        !self.state().is_terminal()
            && self.shared.has_pixels.load(Ordering::Acquire)
            && self.shared.gate.is_installed()
    }

    /// Spawns the render thread and returns immediately.
    pub fn start<P>(&self, producer: P) -> Result<()>
    where
        P: Producer + Send + 'static,
    {
        let (width, height) = (producer.width(), producer.height());
        if width != self.shared.width || height != self.shared.height {
            return Err(Error::InvalidDimensions { width, height });
        }

        if !self
            .shared
            .state
            .advance(PipelineState::NotStarted, PipelineState::PreviewRunning)
        {
            return Err(Error::AlreadyStarted);
        }
        // The gate cannot be installed before the thread below exists, so no
        // finalize can observe the spp before this store.
        let spp = producer.samples_per_pixel();
        self.shared.samples_per_pixel.store(spp, Ordering::Release);

        info!("Rendering {width}x{height} image with spp = {spp}");
        let orchestrator = self.clone();
        let spawned = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || orchestrator.run(producer));

        match spawned {
            Ok(handle) => {
                *self.shared.worker.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.state.finish(PipelineState::Failed);
                Err(e.into())
            }
        }
    }

    /// Waits for the render thread to exit. Not for use from the display loop.
    pub fn join(&self) {
        let handle = self.shared.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Display-side resize notification. The render buffer keeps the
    /// session's dimensions; the window scales it.
    pub fn on_resize(&self, width: usize, height: usize) {
        debug!(
            width,
            height,
            buffer_width = self.shared.width,
            buffer_height = self.shared.height,
            "window resized"
        );
    }

    /// Stops the preview and persists its working buffer as the final image.
    ///
    /// Returns `Ok(true)` if this call persisted the image, `Ok(false)` if it
    /// was ignored because no preview pixel exists yet or the pipeline has
    /// already finished. An ignored request leaves the preview running.
    pub fn finalize_now(&self) -> Result<bool> {
        let state = self.state();
        if state == PipelineState::NotStarted || state.is_terminal() {
            debug!(?state, "finalize request ignored");
            return Ok(false);
        }
        if !self.shared.has_pixels.load(Ordering::Acquire) {
            info!("finalize requested before the first preview pixel; ignoring");
            return Ok(false);
        }

        let Some(working) = self.shared.gate.request_stop() else {
            info!("finalize requested before the preview registered; ignoring");
            return Ok(false);
        };

        let result = FinalResult::new(
            self.shared.height,
            self.shared.width,
            self.shared.samples_per_pixel.load(Ordering::Acquire),
            working.to_vec(),
        )?;
        self.finalize(result, FinalizeSource::Early)
    }

    fn run<P: Producer>(&self, producer: P) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(&producer)));
        let err = match outcome {
            Ok(Ok(())) => {
                debug!("render thread finished");
                return;
            }
            Ok(Err(e)) => e,
            Err(payload) => Error::ProducerPanicked(panic_message(payload.as_ref())),
        };

        match self.shared.state.finish(PipelineState::Failed) {
            Some(during) => error!(state = ?during, "render failed: {err}"),
            None => error!("render failed after the pipeline finished: {err}"),
        }
    }

    fn run_pipeline<P: Producer>(&self, producer: &P) -> Result<()> {
        let shared = &self.shared;
        let on_pixel = |row: usize, col: usize, color: DisplayColor| {
            if shared.buffer.set_pixel(row, col, color) && !shared.has_pixels.load(Ordering::Relaxed) {
                shared.has_pixels.store(true, Ordering::Release);
            }
        };

        producer.evolving_render(&on_pixel, &mut |working, stop| shared.gate.install(stop, working))?;

        if !shared
            .state
            .advance(PipelineState::PreviewRunning, PipelineState::PreviewStoppedOrFinished)
            || !shared
                .state
                .advance(PipelineState::PreviewStoppedOrFinished, PipelineState::FinalRunning)
        {
            info!(state = ?self.state(), "skipping final pass");
            return Ok(());
        }

        info!("starting final pass");
        let mut delivered: Option<Result<bool>> = None;
        producer.final_render(&on_pixel, &mut |pixels| {
            if delivered.is_some() {
                warn!("final pass delivered more than one image; ignoring");
                return;
            }
            delivered = Some(
                FinalResult::new(
                    shared.height,
                    shared.width,
                    shared.samples_per_pixel.load(Ordering::Acquire),
                    pixels,
                )
                .and_then(|result| self.finalize(result, FinalizeSource::FinalPass)),
            );
        })?;

        match delivered {
            Some(outcome) => outcome.map(|_| ()),
            None => Err(Error::Producer(
                "final pass returned without delivering an image".to_string(),
            )),
        }
    }

    fn finalize(&self, result: FinalResult, source: FinalizeSource) -> Result<bool> {
        // Freeze before the state flips, so Done never sees a pending write.
        // Both finalize paths end the session, so freezing for the loser is harmless.
        self.shared.buffer.freeze();
        let Some(previous) = self.shared.state.finish(PipelineState::Done) else {
            debug!(?source, "pipeline already finished; discarding result");
            return Ok(false);
        };

        let result = Arc::new(result);
        let _ = self.shared.result.set(Arc::clone(&result));
        info!(?source, from = ?previous, "render finalized");

        let exported = self.export(&result);
        let status = if exported.is_ok() {
            SaveStatus::Saved
        } else {
            SaveStatus::Failed
        };
        self.shared.save_status.store(status as u8, Ordering::Release);
        exported.map(|()| true)
    }

    fn export(&self, result: &FinalResult) -> Result<()> {
        for target in &self.shared.targets {
            target.exporter.export(result, &target.path)?;
            info!("Saved {}", target.path.display());
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
