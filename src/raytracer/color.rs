use crate::raytracer::exporter::{linear_to_srgb_u8, ToneMap};
use glam::DVec3;

/// Full-precision, unbounded linear color used for the persisted image.
pub type Radiance = DVec3;

/// 8-bit RGBA color ready for presentation. Lossy; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl DisplayColor {
    pub const BLACK: DisplayColor = DisplayColor::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_radiance(color: Radiance, tonemap: ToneMap, exposure: f32) -> Self {
        let mapped = tonemap.apply_with_exposure(color.as_vec3(), exposure);
        let [r, g, b] = linear_to_srgb_u8(mapped);
        Self::new(r, g, b, 255)
    }

    pub const fn pack(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }

    pub const fn unpack(packed: u32) -> Self {
        Self {
            a: (packed >> 24) as u8,
            r: (packed >> 16) as u8,
            g: (packed >> 8) as u8,
            b: packed as u8,
        }
    }

    /// `0RGB` layout expected by minifb.
    pub const fn to_0rgb(self) -> u32 {
        self.pack() & 0x00FF_FFFF
    }
}

impl Default for DisplayColor {
    fn default() -> Self {
        Self::BLACK
    }
}
