use super::sampling::{build_basis, clamp_radiance, sample_cosine_hemisphere, to_world, Rng};
use super::{Renderer, SceneAccess};
use crate::raytracer::ray::Ray;
use glam::Vec3;

/// Unidirectional path tracer over Lambertian surfaces with Russian roulette
/// after the third bounce.
pub struct PathTracer<const MAX_BOUNCES: u32>;

impl<const MAX_BOUNCES: u32> PathTracer<MAX_BOUNCES> {
    pub fn new() -> Self {
        Self
    }
}

impl<const MAX_BOUNCES: u32> Default for PathTracer<MAX_BOUNCES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX_BOUNCES: u32> Renderer for PathTracer<MAX_BOUNCES> {
    fn render<S: SceneAccess>(&self, ray: &Ray, scene: &S, rng: &mut Rng) -> Vec3 {
        let mut radiance = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        let mut ray = *ray;

        for bounce in 0..MAX_BOUNCES {
            let Some(hit) = scene.hit(&ray) else {
                radiance += throughput * scene.sample_sky(ray.direction);
                break;
            };

            let material = scene.get_material(hit.material_id);
            radiance += throughput * material.emissive;

            let (t, b, n) = build_basis(hit.normal);
            let local = sample_cosine_hemisphere(rng.next(), rng.next());
            // cosine pdf cancels the Lambert cosine and 1/pi
            throughput *= material.base_color;

            if bounce >= 3 {
                let survive = throughput.max_element().min(0.95);
                if rng.next() >= survive {
                    break;
                }
                throughput /= survive;
            }

            ray = Ray::new(ray.at(hit.t), to_world(local, t, b, n).normalize());
        }

        clamp_radiance(radiance)
    }
}
