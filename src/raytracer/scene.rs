use crate::raytracer::camera::Camera;
use crate::raytracer::material::Material;
use crate::raytracer::ray::{HitData, Ray};
use crate::raytracer::renderer::SceneAccess;
use crate::raytracer::shape::{Shape, Sphere};
use crate::raytracer::sky::{GradientSky, Sky};
use glam::Vec3;

pub struct Scene<P: Shape, S: Sky> {
    pub shapes: Vec<P>,
    pub materials: Vec<Material>,
    pub camera: Camera,
    pub sky: S,
}

impl<P: Shape, S: Sky> Scene<P, S> {
    pub fn new(shapes: Vec<P>, mut materials: Vec<Material>, camera: Camera, sky: S) -> Self {
        if materials.is_empty() {
            materials.push(Material::default());
        }
        Scene {
            shapes,
            materials,
            camera,
            sky,
        }
    }
}

pub type SphereScene = Scene<Sphere, GradientSky>;

impl SphereScene {
    /// Three spheres on a large ground sphere with a small emitter overhead.
    pub fn demo(aspect_ratio: f32) -> Self {
        let materials = vec![
            Material::diffuse(Vec3::new(0.5, 0.5, 0.5)),
            Material::diffuse(Vec3::new(0.8, 0.3, 0.3)),
            Material::diffuse(Vec3::new(0.3, 0.8, 0.4)),
            Material::diffuse(Vec3::new(0.3, 0.4, 0.8)),
            Material::emissive(Vec3::splat(6.0)),
        ];
        let shapes = vec![
            Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, 0),
            Sphere::new(Vec3::new(-2.1, 1.0, 0.0), 1.0, 1),
            Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, 2),
            Sphere::new(Vec3::new(2.1, 1.0, 0.0), 1.0, 3),
            Sphere::new(Vec3::new(0.0, 4.0, 1.5), 0.6, 4),
        ];
        let camera = Camera::new(Vec3::new(0.0, 2.0, 7.0), Vec3::new(0.0, 0.8, 0.0), 45.0, aspect_ratio);

        Scene::new(shapes, materials, camera, GradientSky::default())
    }
}

impl<P: Shape, S: Sky> SceneAccess for Scene<P, S> {
    fn hit(&self, ray: &Ray) -> Option<HitData> {
        let mut closest = *ray;
        let mut best = None;
        for shape in &self.shapes {
            if let Some(hit) = shape.hit(&closest) {
                closest.t_max = hit.t;
                best = Some(hit);
            }
        }
        best
    }

    fn get_material(&self, material_id: u32) -> &Material {
        &self.materials[material_id as usize]
    }

    fn sample_sky(&self, direction: Vec3) -> Vec3 {
        self.sky.sample(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_hit_wins() {
        let scene = SphereScene::demo(16.0 / 9.0);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 10.0), Vec3::NEG_Z);
        let hit = scene.hit(&ray).unwrap();
        assert_eq!(hit.material_id, 2);
        assert!((hit.t - 9.0).abs() < 1e-3);
    }

    #[test]
    fn upward_ray_sees_sky() {
        let scene = SphereScene::demo(1.0);
        let ray = Ray::new(Vec3::new(5.0, 1.0, 0.0), Vec3::Y);
        assert!(scene.hit(&ray).is_none());
        assert!((scene.sample_sky(Vec3::Y) - scene.sky.zenith).length() < 1e-5);
    }
}
