use super::sampling::Rng;
use super::{Renderer, SceneAccess};
use crate::raytracer::ray::Ray;
use glam::Vec3;

/// Single-hit headlight shading. Used for the first preview pass.
pub struct UnshadedRenderer;

impl Renderer for UnshadedRenderer {
    fn render<S: SceneAccess>(&self, ray: &Ray, scene: &S, _rng: &mut Rng) -> Vec3 {
        if let Some(hit) = scene.hit(ray) {
            let material = scene.get_material(hit.material_id);
            let n_dot_l = hit.normal.dot(-ray.direction).max(0.0);
            material.base_color * (0.2 + 0.8 * n_dot_l) + material.emissive
        } else {
            scene.sample_sky(ray.direction) * 0.5
        }
    }
}
