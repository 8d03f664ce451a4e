use crate::raytracer::error::Result;
use crate::raytracer::exporter::{PngExporter, RadianceExporter, ToneMap, WindowExporter};
use crate::raytracer::orchestrator::{
    ArtifactTarget, InputBridge, PipelineState, RenderOrchestrator, SaveStatus,
};
use crate::raytracer::renderer::PathTracer;
use crate::raytracer::renderloop::{ParallelProducer, ProducerConfig};
use crate::raytracer::scene::SphereScene;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub window_scale: usize,
    pub preview_spp: u32,
    pub spp: u32,
    pub output: PathBuf,
    pub png_output: Option<PathBuf>,
    pub tonemap: ToneMap,
    pub exposure: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            window_scale: 3,
            preview_spp: 16,
            spp: 64,
            output: PathBuf::from("result.pf3"),
            png_output: None,
            tonemap: ToneMap::Aces,
            exposure: 1.0,
        }
    }
}

impl RenderConfig {
    fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            width: self.width,
            height: self.height,
            preview_spp: self.preview_spp,
            spp: self.spp,
            tonemap: self.tonemap,
            exposure: self.exposure,
        }
    }

    fn artifact_targets(&self) -> Vec<ArtifactTarget> {
        let mut targets = vec![ArtifactTarget::new(RadianceExporter, self.output.clone())];
        if let Some(png) = &self.png_output {
            let exporter = PngExporter::with_tonemap(self.tonemap).with_exposure(self.exposure);
            targets.push(ArtifactTarget::new(exporter, png.clone()));
        }
        targets
    }
}

pub struct App {
    pub config: RenderConfig,
    pub orchestrator: RenderOrchestrator,
    pub bridge: InputBridge,
    pub window: WindowExporter,
    render_start: Instant,
}

impl App {
    /// Opens the window and starts rendering in the background.
    pub fn new(config: RenderConfig) -> Result<Self> {
        let orchestrator =
            RenderOrchestrator::new(config.width, config.height, config.artifact_targets())?;
        let window = WindowExporter::new(
            "Ray Tracer",
            config.width * config.window_scale.max(1),
            config.height * config.window_scale.max(1),
        )?
        .with_display(config.tonemap, config.exposure);

        let scene = SphereScene::demo(config.width as f32 / config.height as f32);
        let camera = scene.camera.clone();
        let producer =
            ParallelProducer::new(scene, camera, PathTracer::<8>::new(), config.producer_config())?;
        orchestrator.start(producer)?;

        Ok(Self {
            bridge: InputBridge::new(orchestrator.clone()),
            config,
            orchestrator,
            window,
            render_start: Instant::now(),
        })
    }

    /// Runs the display loop until the user closes the window.
    pub fn run(&mut self) -> Result<()> {
        loop {
            for event in self.window.poll_events() {
                if let Err(e) = self.bridge.dispatch(event) {
                    error!("{:?} failed: {e}", event);
                }
            }
            if self.bridge.close_requested() {
                break;
            }

            if let Some((width, height)) = self.window.poll_resize() {
                self.orchestrator.on_resize(width, height);
            }

            self.present()?;
            self.update_title();
        }

        if self.orchestrator.state() != PipelineState::Done {
            info!("closed before the render finished; nothing saved");
        } else if self.orchestrator.save_status() == SaveStatus::Failed {
            warn!("render finished but {} could not be saved", self.config.output.display());
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        match self.orchestrator.final_result() {
            Some(result) => {
                let view = result.tonemapped(self.window.tonemap(), self.window.exposure());
                self.window.update(&view)
            }
            None => self.window.update(&**self.orchestrator.buffer()),
        }
    }

    fn update_title(&mut self) {
        let state = self.orchestrator.state();
        let elapsed = self.render_start.elapsed().as_secs_f32();
        let hint = if self.orchestrator.can_finalize_early() {
            " - Enter: finish now"
        } else {
            ""
        };
        let title = match (state, self.orchestrator.save_status()) {
            (PipelineState::Done, SaveStatus::Saved) => {
                format!("Ray Tracer - done - saved {}", self.config.output.display())
            }
            (PipelineState::Done, SaveStatus::Failed) => "Ray Tracer - done - save failed".to_string(),
            (PipelineState::Done, SaveStatus::Pending) => "Ray Tracer - done - saving".to_string(),
            _ => format!("Ray Tracer - {} - {:.1}s{}", state.label(), elapsed, hint),
        };
        self.window.set_title(&title);
    }
}
