use super::RenderOrchestrator;
use crate::raytracer::error::Result;
use crate::raytracer::input::InputEvent;
use tracing::info;

/// Forwards display input to the render pipeline.
pub struct InputBridge {
    orchestrator: RenderOrchestrator,
    close_requested: bool,
}

impl InputBridge {
    pub fn new(orchestrator: RenderOrchestrator) -> Self {
        Self {
            orchestrator,
            close_requested: false,
        }
    }

    pub fn dispatch(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::Close => {
                if !self.close_requested {
                    info!("close requested");
                }
                self.close_requested = true;
            }
            InputEvent::FinalizeNow => {
                if self.orchestrator.finalize_now()? {
                    info!("preview accepted as final image");
                }
            }
        }
        Ok(())
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}
