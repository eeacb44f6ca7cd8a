use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use starfolio_common::Ray;

/// Perspective camera looking from `position` at `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    #[serde(skip)]
    aspect: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(2.0, 2.0, 2.0),
            target: Vec3::new(0.0, 0.75, 0.0),
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            aspect: 1.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Non-finite or non-positive aspects are ignored.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn forward(&self) -> Vec3 {
        let dir = (self.target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO { Vec3::NEG_Z } else { dir }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray from the eye through a point in normalized device
    /// coordinates (x right, y up, both in [-1, 1]).
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(self.position, far - self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_portfolio_framing() {
        let cam = PerspectiveCamera::default();
        assert_eq!(cam.position, Vec3::splat(2.0));
        assert_eq!(cam.fov_degrees, 75.0);
        let vp = cam.view_projection();
        assert!(!vp.is_nan());
    }

    #[test]
    fn centre_ray_points_at_target() {
        let mut cam = PerspectiveCamera::default();
        cam.set_aspect(16.0 / 9.0);
        let ray = cam.ray_from_ndc(Vec2::ZERO);
        assert!(ray.direction.abs_diff_eq(cam.forward(), 1e-4));
    }

    #[test]
    fn corner_ray_leans_the_right_way() {
        let mut cam = PerspectiveCamera {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            ..PerspectiveCamera::default()
        };
        cam.set_aspect(2.0);
        let ray = cam.ray_from_ndc(Vec2::new(1.0, 1.0));
        assert!(ray.direction.x > 0.0);
        assert!(ray.direction.y > 0.0);
        assert!(ray.direction.x > ray.direction.y);
    }

    #[test]
    fn bad_aspect_is_ignored() {
        let mut cam = PerspectiveCamera::default();
        cam.set_aspect(1.5);
        cam.set_aspect(f32::NAN);
        cam.set_aspect(0.0);
        assert_eq!(cam.aspect(), 1.5);
    }
}
