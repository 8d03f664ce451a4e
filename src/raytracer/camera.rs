use crate::raytracer::ray::Ray;
use glam::{Mat4, Vec3, Vec4};

#[derive(Clone)]
pub struct Camera {
    pub position: Vec3,
    yaw: f32,
    pitch: f32,
    pub fov: f32,
    pub aspect_ratio: f32,
    inv_vp_matrix: Mat4,
}

impl Camera {
    pub fn new(position: Vec3, look_at: Vec3, fov: f32, aspect_ratio: f32) -> Self {
        let dir = (look_at - position).normalize();
        let yaw = dir.x.atan2(-dir.z);
        let pitch = dir.y.asin();

        let mut camera = Camera {
            position,
            yaw,
            pitch,
            fov,
            aspect_ratio,
            inv_vp_matrix: Mat4::IDENTITY,
        };
        camera.update_matrix();
        camera
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
    }

    pub fn update_matrix(&mut self) {
        let look_at = self.position + self.forward();
        let vp_matrix = Mat4::perspective_rh(self.fov.to_radians(), self.aspect_ratio, 0.1, 1000.0)
            * Mat4::look_at_rh(self.position, look_at, Vec3::Y);
        self.inv_vp_matrix = vp_matrix.inverse();
    }

    /// `u` runs left to right and `v` top to bottom, both in `[0, 1]`.
    pub fn generate_ray(&self, u: f32, v: f32) -> Ray {
        let ndc_x = 2.0 * u - 1.0;
        let ndc_y = 1.0 - 2.0 * v;
        let near_point = self.inv_vp_matrix * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
        let far_point = self.inv_vp_matrix * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near_point = near_point.truncate() / near_point.w;
        let far_point = far_point.truncate() / far_point.w;

        Ray::new(near_point, (far_point - near_point).normalize())
    }
}
