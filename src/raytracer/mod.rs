pub mod app;
pub mod camera;
pub mod color;
pub mod error;
pub mod exporter;
pub mod framebuffer;
pub mod input;
pub mod material;
pub mod orchestrator;
pub mod ray;
pub mod renderer;
pub mod renderloop;
pub mod scene;
pub mod shape;
pub mod sky;

pub use app::{App, RenderConfig};
pub use error::{Error, Result};
