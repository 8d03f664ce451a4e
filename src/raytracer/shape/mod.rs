mod sphere;

use crate::raytracer::ray::{HitData, Ray};

pub use sphere::Sphere;

pub trait Shape: Clone {
    fn hit(&self, ray: &Ray) -> Option<HitData>;
}
