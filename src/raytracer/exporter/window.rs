use super::ToneMap;
use crate::raytracer::error::Result;
use crate::raytracer::framebuffer::FramebufferView;
use crate::raytracer::input::{InputEvent, InputHandler, KeyLatch};
use minifb::{Key, Window, WindowOptions};
use tracing::info;

pub struct WindowExporter {
    window: Window,
    buffer: Vec<u32>,
    buffer_width: usize,
    buffer_height: usize,
    input_handler: InputHandler,
    tonemap: ToneMap,
    tonemap_key: KeyLatch,
    exposure: f32,
    size: (usize, usize),
}

impl WindowExporter {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(60);

        Ok(Self {
            window,
            buffer: Vec::new(),
            buffer_width: 0,
            buffer_height: 0,
            input_handler: InputHandler::new(),
            tonemap: ToneMap::Aces,
            tonemap_key: KeyLatch::default(),
            exposure: 1.0,
            size: (width, height),
        })
    }

    pub fn with_display(mut self, tonemap: ToneMap, exposure: f32) -> Self {
        self.tonemap = tonemap;
        self.exposure = exposure;
        self
    }

    fn ensure_buffer_size(&mut self, width: usize, height: usize) {
        if self.buffer_width != width || self.buffer_height != height {
            self.buffer.resize(width * height, 0);
            self.buffer_width = width;
            self.buffer_height = height;
        }
    }

    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        self.handle_tonemap_toggle();
        self.handle_exposure();
        self.input_handler.poll(&self.window)
    }

    /// Returns the new window size when it changed since the last call.
    pub fn poll_resize(&mut self) -> Option<(usize, usize)> {
        let size = self.window.get_size();
        if size != self.size {
            self.size = size;
            Some(size)
        } else {
            None
        }
    }

    fn handle_tonemap_toggle(&mut self) {
        if self.tonemap_key.pressed(self.window.is_key_down(Key::T)) {
            self.tonemap = self.tonemap.next();
            info!("Tonemapping: {}", self.tonemap.label());
        }
    }

    fn handle_exposure(&mut self) {
        if self.window.is_key_down(Key::LeftBracket) {
            self.exposure *= 0.98;
        }
        if self.window.is_key_down(Key::RightBracket) {
            self.exposure *= 1.02;
        }
        self.exposure = self.exposure.clamp(0.1, 10.0);
    }

    /// Copies the view into the window's pixel buffer and presents it.
    pub fn update<F: FramebufferView>(&mut self, framebuffer: &F) -> Result<()> {
        let width = framebuffer.width();
        let height = framebuffer.height();
        self.ensure_buffer_size(width, height);

        for row in 0..height {
            for col in 0..width {
                self.buffer[row * width + col] = framebuffer.get_pixel(row, col).to_0rgb();
            }
        }

        self.window.update_with_buffer(&self.buffer, width, height)?;
        Ok(())
    }

    pub fn tonemap(&self) -> ToneMap {
        self.tonemap
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }
}
