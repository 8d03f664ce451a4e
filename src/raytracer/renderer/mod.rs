mod pathtracer;
pub mod sampling;
mod unshaded;

use crate::raytracer::material::Material;
use crate::raytracer::ray::{HitData, Ray};
use glam::Vec3;
use sampling::Rng;

pub use pathtracer::PathTracer;
pub use unshaded::UnshadedRenderer;

pub trait SceneAccess {
    fn hit(&self, ray: &Ray) -> Option<HitData>;
    fn get_material(&self, material_id: u32) -> &Material;
    fn sample_sky(&self, direction: Vec3) -> Vec3;
}

pub trait Renderer {
    fn render<S: SceneAccess>(&self, ray: &Ray, scene: &S, rng: &mut Rng) -> Vec3;
}
