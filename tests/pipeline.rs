use parking_lot::Mutex;
use progressive_tracer::raytracer::color::{DisplayColor, Radiance};
use progressive_tracer::raytracer::exporter::{read_radiance_file, Exporter, RadianceExporter};
use progressive_tracer::raytracer::framebuffer::{FinalResult, ProgressiveBuffer, RadianceBuffer};
use progressive_tracer::raytracer::orchestrator::{ArtifactTarget, PipelineState, RenderOrchestrator};
use progressive_tracer::raytracer::renderloop::{PixelSink, Producer, StopAction, StopSignal};
use progressive_tracer::raytracer::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const PREVIEW_DISPLAY: DisplayColor = DisplayColor::new(10, 10, 10, 255);
const FINAL_DISPLAY: DisplayColor = DisplayColor::new(200, 200, 200, 255);
const LATE_DISPLAY: DisplayColor = DisplayColor::new(1, 2, 3, 255);
const PREVIEW_RADIANCE: f64 = 0.04;
const FINAL_RADIANCE: f64 = 0.5;

#[derive(Clone, Default)]
struct CountingExporter {
    writes: Arc<AtomicUsize>,
}

impl Exporter for CountingExporter {
    fn export(&self, _result: &FinalResult, _path: &Path) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Pause {
    reached: Sender<()>,
    resume: Mutex<Receiver<()>>,
}

impl Pause {
    fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (reached_tx, reached_rx) = channel();
        let (resume_tx, resume_rx) = channel();
        let pause = Pause {
            reached: reached_tx,
            resume: Mutex::new(resume_rx),
        };
        (pause, reached_rx, resume_tx)
    }

    fn wait(&self) {
        let _ = self.reached.send(());
        let _ = self.resume.lock().recv();
    }
}

/// Stand-in for the scene: paints flat colors and can be slowed down or
/// paused at a chosen preview pixel.
struct FlatProducer {
    width: usize,
    height: usize,
    preview_rounds: usize,
    pixel_delay: Duration,
    pause_at: Option<(usize, Pause)>,
    pause_before_final: Option<Pause>,
    written_at_final: Option<(Arc<ProgressiveBuffer>, Arc<AtomicUsize>)>,
}

impl FlatProducer {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            preview_rounds: 1,
            pixel_delay: Duration::ZERO,
            pause_at: None,
            pause_before_final: None,
            written_at_final: None,
        }
    }

    /// Pauses the preview before it paints step `pixel`.
    fn pause_at(mut self, pixel: usize) -> (Self, Receiver<()>, Sender<()>) {
        let (pause, reached, resume) = Pause::new();
        self.pause_at = Some((pixel, pause));
        (self, reached, resume)
    }

    /// Pauses at the top of the final pass.
    fn pause_before_final(mut self) -> (Self, Receiver<()>, Sender<()>) {
        let (pause, reached, resume) = Pause::new();
        self.pause_before_final = Some(pause);
        (self, reached, resume)
    }

    fn delay(&self) {
        if !self.pixel_delay.is_zero() {
            thread::sleep(self.pixel_delay);
        }
    }
}

impl Producer for FlatProducer {
    fn height(&self) -> usize {
        self.height
    }

    fn width(&self) -> usize {
        self.width
    }

    fn samples_per_pixel(&self) -> u32 {
        4
    }

    fn evolving_render(
        &self,
        on_pixel: PixelSink<'_>,
        on_start: &mut dyn FnMut(Arc<RadianceBuffer>, StopAction),
    ) -> Result<()> {
        let working = Arc::new(RadianceBuffer::new(self.width, self.height));
        let stop = StopSignal::new();
        on_start(Arc::clone(&working), stop.action());

        let pixels = self.width * self.height;
        for step in 0..pixels * self.preview_rounds {
            if let Some((at, pause)) = &self.pause_at {
                if *at == step {
                    pause.wait();
                }
            }
            if stop.is_stopped() {
                return Ok(());
            }
            let idx = step % pixels;
            let (row, col) = (idx / self.width, idx % self.width);
            working.set_pixel(row, col, Radiance::splat(PREVIEW_RADIANCE));
            on_pixel(row, col, PREVIEW_DISPLAY);
            self.delay();
        }
        Ok(())
    }

    fn final_render(
        &self,
        on_pixel: PixelSink<'_>,
        on_complete: &mut dyn FnMut(Vec<Radiance>),
    ) -> Result<()> {
        if let Some((buffer, written)) = &self.written_at_final {
            written.store(buffer.written_count(), Ordering::SeqCst);
        }
        if let Some(pause) = &self.pause_before_final {
            pause.wait();
        }

        for idx in 0..self.width * self.height {
            on_pixel(idx / self.width, idx % self.width, FINAL_DISPLAY);
            self.delay();
        }
        on_complete(vec![Radiance::splat(FINAL_RADIANCE); self.width * self.height]);

        // Anything after completion must not reach the display.
        for idx in 0..self.width * self.height {
            on_pixel(idx / self.width, idx % self.width, LATE_DISPLAY);
        }
        Ok(())
    }
}

struct Session {
    _dir: TempDir,
    path: PathBuf,
    writes: Arc<AtomicUsize>,
    orchestrator: RenderOrchestrator,
}

fn session(width: usize, height: usize) -> Session {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.pf3");
    let counter = CountingExporter::default();
    let writes = Arc::clone(&counter.writes);
    let orchestrator = RenderOrchestrator::new(
        width,
        height,
        vec![
            ArtifactTarget::new(RadianceExporter, path.clone()),
            ArtifactTarget::new(counter, "counted"),
        ],
    )
    .unwrap();

    Session {
        _dir: dir,
        path,
        writes,
        orchestrator,
    }
}

#[test]
fn two_by_two_natural_completion() {
    let session = session(2, 2);
    let written_before_final = Arc::new(AtomicUsize::new(0));
    let mut producer = FlatProducer::new(2, 2);
    producer.written_at_final = Some((
        Arc::clone(session.orchestrator.buffer()),
        Arc::clone(&written_before_final),
    ));

    session.orchestrator.start(producer).unwrap();
    session.orchestrator.join();

    assert_eq!(session.orchestrator.state(), PipelineState::Done);
    assert_eq!(written_before_final.load(Ordering::SeqCst), 4);
    assert_eq!(session.writes.load(Ordering::SeqCst), 1);

    let artifact = read_radiance_file(&session.path).unwrap();
    assert_eq!(artifact.height(), 2);
    assert_eq!(artifact.width(), 2);
    assert_eq!(artifact.samples_per_pixel(), 4);
    assert_eq!(artifact.pixels().len(), 4);
    for pixel in artifact.pixels() {
        assert!((*pixel - Radiance::splat(0.5)).abs().max_element() < 1e-12);
    }

    let buffer = session.orchestrator.buffer();
    assert!(buffer.is_frozen());
    assert!(buffer.snapshot().iter().all(|&c| c == FINAL_DISPLAY));
}

#[test]
fn early_finalize_after_first_pixel() {
    let session = session(2, 2);
    let (producer, reached, resume) = FlatProducer::new(2, 2).pause_at(1);

    session.orchestrator.start(producer).unwrap();
    reached.recv().unwrap();
    assert!(session.orchestrator.finalize_now().unwrap());
    resume.send(()).unwrap();
    session.orchestrator.join();

    assert_eq!(session.orchestrator.state(), PipelineState::Done);
    assert_eq!(session.writes.load(Ordering::SeqCst), 1);

    let artifact = read_radiance_file(&session.path).unwrap();
    assert_eq!(artifact.pixel(0, 0), Radiance::splat(PREVIEW_RADIANCE));
    assert_eq!(artifact.pixel(0, 1), Radiance::ZERO);
    assert_eq!(artifact.pixel(1, 0), Radiance::ZERO);
    assert_eq!(artifact.pixel(1, 1), Radiance::ZERO);

    let buffer = session.orchestrator.buffer();
    assert_eq!(buffer.get_pixel(0, 0), PREVIEW_DISPLAY);
    assert_eq!(buffer.get_pixel(1, 1), DisplayColor::BLACK);
}

#[test]
fn finalize_before_preview_registers_is_harmless() {
    let session = session(2, 2);
    assert!(!session.orchestrator.finalize_now().unwrap());

    session.orchestrator.start(FlatProducer::new(2, 2)).unwrap();
    session.orchestrator.join();

    assert_eq!(session.writes.load(Ordering::SeqCst), 1);
    let artifact = read_radiance_file(&session.path).unwrap();
    assert!(artifact.pixels().iter().all(|&p| p == Radiance::splat(FINAL_RADIANCE)));
}

#[test]
fn early_finalize_during_final_pass_keeps_preview() {
    let session = session(2, 2);
    let (producer, reached, resume) = FlatProducer::new(2, 2).pause_before_final();

    session.orchestrator.start(producer).unwrap();
    reached.recv().unwrap();
    assert_eq!(session.orchestrator.state(), PipelineState::FinalRunning);
    assert!(session.orchestrator.finalize_now().unwrap());
    resume.send(()).unwrap();
    session.orchestrator.join();

    assert_eq!(session.orchestrator.state(), PipelineState::Done);
    assert_eq!(session.writes.load(Ordering::SeqCst), 1);

    let artifact = read_radiance_file(&session.path).unwrap();
    assert!(artifact.pixels().iter().all(|&p| p == Radiance::splat(PREVIEW_RADIANCE)));

    // The final pass kept painting after the freeze; none of it shows.
    let snapshot = session.orchestrator.buffer().snapshot();
    assert!(snapshot.iter().all(|&c| c == PREVIEW_DISPLAY));
}

#[test]
fn early_finalize_races_natural_completion() {
    let mut rng = StdRng::seed_from_u64(0x5EED_F1A1);
    let mut early_wins = 0;

    for run in 0..100 {
        let session = session(4, 4);
        let mut producer = FlatProducer::new(4, 4);
        producer.preview_rounds = 2;
        producer.pixel_delay = Duration::from_micros(rng.gen_range(0..40));
        let finalize_delay = Duration::from_micros(rng.gen_range(0..3000));

        // Every tenth run pins the outcome: 0 lets the final pass win, 3 stops
        // mid-preview and 7 stops while the final pass is running.
        let (producer, paused) = match run % 10 {
            3 => {
                let (producer, reached, resume) = producer.pause_at(5);
                (producer, Some((reached, resume)))
            }
            7 => {
                let (producer, reached, resume) = producer.pause_before_final();
                (producer, Some((reached, resume)))
            }
            _ => (producer, None),
        };

        let orchestrator = &session.orchestrator;
        orchestrator.start(producer).unwrap();

        let early = match paused {
            Some((reached, resume)) => {
                reached.recv().unwrap();
                let early = orchestrator.finalize_now().unwrap();
                assert!(early, "run {run}: pinned early finalize was ignored");
                resume.send(()).unwrap();
                early
            }
            None => {
                while !orchestrator.can_finalize_early() && !orchestrator.state().is_terminal() {
                    thread::yield_now();
                }
                if run % 10 == 0 {
                    while !orchestrator.state().is_terminal() {
                        thread::yield_now();
                    }
                } else {
                    thread::sleep(finalize_delay);
                }
                orchestrator.finalize_now().unwrap()
            }
        };
        let frozen = orchestrator.buffer().snapshot();
        orchestrator.join();

        assert_eq!(orchestrator.state(), PipelineState::Done, "run {run}");
        assert_eq!(session.writes.load(Ordering::SeqCst), 1, "run {run}");

        let artifact = read_radiance_file(&session.path).unwrap();
        assert_eq!(
            orchestrator.final_result().as_deref(),
            Some(&artifact),
            "run {run}"
        );

        if early {
            early_wins += 1;
            assert!(
                artifact
                    .pixels()
                    .iter()
                    .all(|&p| p == Radiance::splat(PREVIEW_RADIANCE) || p == Radiance::ZERO),
                "run {run}: final pass leaked into an early result"
            );
            assert_eq!(orchestrator.buffer().snapshot(), frozen, "run {run}");
        } else {
            assert!(
                artifact.pixels().iter().all(|&p| p == Radiance::splat(FINAL_RADIANCE)),
                "run {run}"
            );
        }
        assert!(
            !orchestrator.buffer().snapshot().contains(&LATE_DISPLAY),
            "run {run}: write landed after completion"
        );
    }

    assert!(early_wins >= 20);
    assert!(early_wins <= 90);
}
