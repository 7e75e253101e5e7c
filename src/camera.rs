use crate::{DefaultRng, Ray};
use glam::Vec3;
use rand::Rng;
use rand_distr::UnitDisc;
use std::f32::consts::PI;

/// Thin lens camera. An aperture of zero gives a pinhole camera.
#[derive(Debug)]
pub struct Camera {
    origin: Vec3,
    lower_left_corner: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    lens_radius: f32,
}

impl Camera {
    pub fn new(
        origin: Vec3,
        target: Vec3,
        up: Vec3,
        vfov: f32,
        aspect: f32,
        aperture: f32,
    ) -> Self {
        let lens_radius = aperture / 2.0;
        let focus_dist = (origin - target).length();
        let theta = vfov * PI / 180.0;
        let half_height = f32::tan(theta / 2.0);
        let half_width = aspect * half_height;
        let w = (origin - target).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);
        let lower_left_corner =
            origin - half_width * focus_dist * u - half_height * focus_dist * v - focus_dist * w;
        let horizontal = 2.0 * half_width * focus_dist * u;
        let vertical = 2.0 * half_height * focus_dist * v;

        Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius,
        }
    }

    /// Ray through the image plane at `(s, t)`, both in `[0, 1]` from the lower left
    pub fn ray(&self, s: f32, t: f32, rng: &mut DefaultRng) -> Ray {
        let [x, y]: [f32; 2] = rng.sample(UnitDisc);
        let offset = self.lens_radius * (self.u * x + self.v * y);

        Ray::new(
            self.origin + offset,
            self.lower_left_corner + s * self.horizontal + t * self.vertical - self.origin - offset,
        )
    }
}
