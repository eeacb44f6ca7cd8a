use crate::bounds::Aabb;
use glam::{Mat4, Vec3};

/// A half-line `origin + t * direction`, `t >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The ray expressed in another frame. The direction is not renormalized,
    /// so `t` values stay comparable across frames.
    pub fn transformed(&self, m: &Mat4) -> Ray {
        Ray {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
        }
    }

    /// Slab test. Returns the entry distance, or 0 when the origin is inside.
    pub fn intersect_aabb(&self, b: &Aabb) -> Option<f32> {
        if b.is_empty() {
            return None;
        }
        let inv = self.direction.recip();
        let t0 = (b.min - self.origin) * inv;
        let t1 = (b.max - self.origin) * inv;
        let near = t0.min(t1);
        let far = t0.max(t1);
        // NaN from 0 * inf on a parallel axis must not poison the result
        let t_enter = [near.x, near.y, near.z]
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(f32::NEG_INFINITY, f32::max);
        let t_exit = [far.x, far.y, far.z]
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(f32::INFINITY, f32::min);
        if t_exit < 0.0 || t_enter > t_exit {
            return None;
        }
        Some(t_enter.max(0.0))
    }

    /// Möller–Trumbore, double sided.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        const EPS: f32 = 1e-7;
        let e1 = b - a;
        let e2 = c - a;
        let p = self.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_box_in_front() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let t = ray.intersect_aabb(&b).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn ray_misses_box_behind() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(ray.intersect_aabb(&b).is_none());
    }

    #[test]
    fn axis_parallel_ray_outside_slab_misses() {
        let ray = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(ray.intersect_aabb(&b).is_none());
    }

    #[test]
    fn triangle_hit_and_miss() {
        let a = Vec3::new(-1.0, -1.0, 0.0);
        let b = Vec3::new(1.0, -1.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        let hit = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z);
        assert!((hit.intersect_triangle(a, b, c).unwrap() - 2.0).abs() < 1e-5);
        let miss = Ray::new(Vec3::new(2.0, 2.0, 2.0), Vec3::NEG_Z);
        assert!(miss.intersect_triangle(a, b, c).is_none());
    }

    #[test]
    fn transformed_ray_keeps_parameterisation() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Z);
        let m = Mat4::from_scale(Vec3::splat(0.5));
        let local = ray.transformed(&m);
        let p = local.at(2.0);
        assert_eq!(m.transform_point3(ray.at(2.0)), p);
    }
}
