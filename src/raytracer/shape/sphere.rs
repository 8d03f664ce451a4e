use super::Shape;
use crate::raytracer::ray::{HitData, Ray};
use glam::Vec3;

#[derive(Clone, Copy)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material_id: u32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material_id: u32) -> Self {
        Self {
            center,
            radius,
            material_id,
        }
    }
}

impl Shape for Sphere {
    fn hit(&self, ray: &Ray) -> Option<HitData> {
        let oc = ray.origin - self.center;
        let half_b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = half_b * half_b - c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let mut t = -half_b - sqrt_d;
        if t < ray.t_min || t > ray.t_max {
            t = -half_b + sqrt_d;
            if t < ray.t_min || t > ray.t_max {
                return None;
            }
        }

        let mut normal = (ray.at(t) - self.center) / self.radius;
        if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }

        Some(HitData {
            t,
            material_id: self.material_id,
            normal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_from_outside() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 3);
        let hit = sphere.hit(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::Z).length() < 1e-4);
        assert_eq!(hit.material_id, 3);
    }

    #[test]
    fn miss() {
        let sphere = Sphere::new(Vec3::new(0.0, 5.0, -5.0), 1.0, 0);
        assert!(sphere.hit(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)).is_none());
    }
}
