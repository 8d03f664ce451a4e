use crate::raytracer::framebuffer::RadianceBuffer;
use crate::raytracer::renderloop::StopAction;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

struct Installed {
    stop: Option<StopAction>,
    working: Arc<RadianceBuffer>,
}

/// Single-use handle that lets the display side cut the preview pass short.
///
/// The producer installs its stop action and working buffer when the preview
/// starts. The lock is only held to swap the slot; the stop action itself runs
/// outside it and never waits for the producer.
#[derive(Default)]
pub struct CancellationGate {
    slot: Mutex<Option<Installed>>,
}

impl CancellationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previously installed gate.
    pub fn install(&self, stop: StopAction, working: Arc<RadianceBuffer>) {
        let replaced = self
            .slot
            .lock()
            .replace(Installed {
                stop: Some(stop),
                working,
            })
            .is_some();
        debug!(replaced, "cancellation gate installed");
    }

    pub fn is_installed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Signals the producer to stop and hands back its working buffer.
    /// Returns `None` before installation and on every call after the first.
    pub fn request_stop(&self) -> Option<Arc<RadianceBuffer>> {
        let (stop, working) = {
            let mut slot = self.slot.lock();
            let installed = slot.as_mut()?;
            (installed.stop.take()?, Arc::clone(&installed.working))
        };
        stop();
        debug!("preview stop requested");
        Some(working)
    }
}
