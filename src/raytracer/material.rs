use glam::Vec3;

#[derive(Clone, Copy)]
pub struct Material {
    pub base_color: Vec3,
    pub emissive: Vec3,
}

impl Material {
    pub fn diffuse(base_color: Vec3) -> Self {
        Self {
            base_color,
            emissive: Vec3::ZERO,
        }
    }

    pub fn emissive(emissive: Vec3) -> Self {
        Self {
            base_color: Vec3::ZERO,
            emissive,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Vec3::splat(0.8))
    }
}
