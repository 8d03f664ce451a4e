use glam::Vec3;
use std::f32::consts::PI;

pub const MAX_SAMPLE_VALUE: f32 = 10.0;

/// xorshift64* generator. Cheap enough to create one per pixel sample.
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E3779B97F4A7C15) | 1,
        }
    }

    /// Deterministic stream for one sample of one pixel.
    pub fn for_sample(row: usize, col: usize, sample_index: u32) -> Self {
        let mut h = (row as u64).wrapping_mul(0x9E3779B97F4A7C15);
        h ^= (col as u64).wrapping_mul(0xC2B2AE3D27D4EB4F);
        h ^= (sample_index as u64).wrapping_mul(0x165667B19E3779F9);
        h ^= h >> 33;
        h = h.wrapping_mul(0xFF51AFD7ED558CCD);
        h ^= h >> 33;
        Self::new(h)
    }

    /// Uniform in `[0, 1)`.
    pub fn next(&mut self) -> f32 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        let result = self.state.wrapping_mul(0x2545F4914F6CDD1D);
        (result >> 40) as f32 / (1u64 << 24) as f32
    }
}

pub fn sample_cosine_hemisphere(u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt())
}

pub fn build_basis(n: Vec3) -> (Vec3, Vec3, Vec3) {
    let up = if n.y.abs() < 0.999 { Vec3::Y } else { Vec3::X };
    let t = up.cross(n).normalize();
    let b = n.cross(t);
    (t, b, n)
}

pub fn to_world(local: Vec3, t: Vec3, b: Vec3, n: Vec3) -> Vec3 {
    t * local.x + b * local.y + n * local.z
}

pub fn clamp_radiance(radiance: Vec3) -> Vec3 {
    if !radiance.is_finite() {
        return Vec3::ZERO;
    }

    let max_component = radiance.max_element();
    if max_component > MAX_SAMPLE_VALUE {
        radiance * (MAX_SAMPLE_VALUE / max_component)
    } else {
        radiance
    }
}
