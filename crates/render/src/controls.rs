use crate::camera::PerspectiveCamera;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

const EPS: f32 = 1e-6;

/// Damped orbit around a target point.
///
/// Input accumulates into a pending spherical delta; each [`update`] applies
/// `damping` of it and lets the rest decay, so motion eases out after the
/// pointer stops.
///
/// [`update`]: OrbitControls::update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitControls {
    pub target: Vec3,
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar angle limits measured from +Y.
    pub min_polar: f32,
    pub max_polar: f32,
    #[serde(skip)]
    delta_theta: f32,
    #[serde(skip)]
    delta_phi: f32,
    #[serde(skip)]
    pending_scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 0.75, 0.0),
            damping: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.5,
            max_distance: 60.0,
            min_polar: 0.01,
            max_polar: PI - 0.01,
            delta_theta: 0.0,
            delta_phi: 0.0,
            pending_scale: 1.0,
        }
    }
}

impl OrbitControls {
    /// Drag by a pixel delta; a drag across the full viewport height is one
    /// full turn.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let h = viewport_height.max(1.0);
        self.delta_theta -= TAU * dx / h * self.rotate_speed;
        self.delta_phi -= TAU * dy / h * self.rotate_speed;
    }

    /// Positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        if steps.is_finite() {
            self.pending_scale *= 0.95f32.powf(steps * self.zoom_speed);
        }
    }

    pub fn is_settled(&self) -> bool {
        self.delta_theta.abs() < EPS && self.delta_phi.abs() < EPS && (self.pending_scale - 1.0).abs() < EPS
    }

    /// Apply one frame of damped motion to `camera`. Returns whether the
    /// camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius < EPS {
            camera.target = self.target;
            return false;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta += self.delta_theta * self.damping;
        phi = (phi + self.delta_phi * self.damping).clamp(self.min_polar, self.max_polar);
        let radius = (radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let next = self.target + radius * Vec3::new(sin_phi * theta.sin(), phi.cos(), sin_phi * theta.cos());
        let moved = next.distance_squared(camera.position) > EPS * EPS;
        camera.position = next;
        camera.target = self.target;

        self.delta_theta *= 1.0 - self.damping;
        self.delta_phi *= 1.0 - self.damping;
        self.pending_scale = 1.0;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_controls_keep_the_camera_still() {
        let mut controls = OrbitControls::default();
        let mut cam = PerspectiveCamera::default();
        let before = cam.position;
        assert!(!controls.update(&mut cam));
        assert!(cam.position.abs_diff_eq(before, 1e-5));
    }

    #[test]
    fn drag_eases_out() {
        let mut controls = OrbitControls::default();
        let mut cam = PerspectiveCamera::default();
        controls.rotate(100.0, 0.0, 800.0);

        let mut steps = Vec::new();
        for _ in 0..60 {
            let before = cam.position;
            controls.update(&mut cam);
            steps.push(cam.position.distance(before));
        }
        assert!(steps[0] > 0.0);
        assert!(steps.windows(2).all(|w| w[1] <= w[0] + 1e-6));
        let radius = (cam.position - controls.target).length();
        let start = (PerspectiveCamera::default().position - controls.target).length();
        assert!((radius - start).abs() < 1e-4);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut controls = OrbitControls {
            min_distance: 1.0,
            ..OrbitControls::default()
        };
        let mut cam = PerspectiveCamera::default();
        controls.zoom(500.0);
        controls.update(&mut cam);
        assert!(((cam.position - controls.target).length() - 1.0).abs() < 1e-4);
        assert!(controls.is_settled());
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut controls = OrbitControls::default();
        let mut cam = PerspectiveCamera::default();
        controls.rotate(0.0, 10_000.0, 100.0);
        for _ in 0..200 {
            controls.update(&mut cam);
        }
        let offset = cam.position - controls.target;
        let phi = (offset.y / offset.length()).acos();
        assert!(phi >= controls.min_polar - 1e-4);
    }
}
