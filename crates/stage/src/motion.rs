use glam::{Quat, Vec3};
use starfolio_common::{NodeId, Transform};
use starfolio_scene::{NodeTree, SceneError};

/// A procedural transform as a function of elapsed seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Constant angular velocity in radians per second.
    Spin { axis: Vec3, rate: f32 },
    /// Sinusoidal swing about a local axis.
    Oscillation {
        axis: Vec3,
        amplitude: f32,
        frequency: f32,
        phase: f32,
    },
    /// Elliptical path in the XZ plane at a fixed height.
    Orbit {
        center: Vec3,
        radius_x: f32,
        radius_z: f32,
        height: f32,
        speed: f32,
        phase: f32,
    },
}

impl Motion {
    /// Write the driven component of `out` for time `t`. Rotations compose
    /// onto `base`; orbits replace the position only.
    pub fn apply(&self, base: &Transform, t: f32, out: &mut Transform) {
        match *self {
            Motion::Spin { axis, rate } => {
                out.rotation = base.rotation * Quat::from_axis_angle(axis, rate * t);
            }
            Motion::Oscillation {
                axis,
                amplitude,
                frequency,
                phase,
            } => {
                let angle = amplitude * (frequency * t + phase).sin();
                out.rotation = base.rotation * Quat::from_axis_angle(axis, angle);
            }
            Motion::Orbit {
                center,
                radius_x,
                radius_z,
                height,
                speed,
                phase,
            } => {
                let a = speed * t + phase;
                out.position = center + Vec3::new(radius_x * a.cos(), height, radius_z * a.sin());
            }
        }
    }

    fn normalized(self) -> Self {
        let fix = |axis: Vec3| {
            let n = axis.normalize_or_zero();
            if n == Vec3::ZERO { Vec3::Y } else { n }
        };
        match self {
            Motion::Spin { axis, rate } => Motion::Spin { axis: fix(axis), rate },
            Motion::Oscillation {
                axis,
                amplitude,
                frequency,
                phase,
            } => Motion::Oscillation {
                axis: fix(axis),
                amplitude,
                frequency,
                phase,
            },
            orbit => orbit,
        }
    }
}

#[derive(Debug, Clone)]
struct Scheduled {
    node: NodeId,
    base: Transform,
    motion: Motion,
}

/// Fixed set of motions, each captured against its node's transform at the
/// time it was added.
#[derive(Debug, Clone, Default)]
pub struct MotionPlan {
    entries: Vec<Scheduled>,
}

impl MotionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tree: &NodeTree, node: NodeId, motion: Motion) -> Result<(), SceneError> {
        let base = tree.get(node).ok_or(SceneError::UnknownNode(node))?.transform;
        self.entries.push(Scheduled {
            node,
            base,
            motion: motion.normalized(),
        });
        Ok(())
    }

    /// Set every driven transform for `elapsed`. Calling this twice with the
    /// same time gives the same result.
    pub fn apply(&self, tree: &mut NodeTree, elapsed: f32) {
        for entry in &self.entries {
            if let Some(node) = tree.get_mut(entry.node) {
                entry.motion.apply(&entry.base, elapsed, &mut node.transform);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfolio_scene::SceneNode;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn tree_with(name: &str, transform: Transform) -> (NodeTree, NodeId) {
        let mut tree = NodeTree::default();
        let id = tree
            .add(tree.root(), SceneNode::group(name).with_transform(transform))
            .unwrap();
        (tree, id)
    }

    #[test]
    fn spin_is_a_function_of_time_not_frames() {
        let (mut a, id) = tree_with("ring", Transform::IDENTITY);
        let (mut b, _) = tree_with("ring", Transform::IDENTITY);
        let mut plan = MotionPlan::new();
        plan.add(&a, id, Motion::Spin { axis: Vec3::Y, rate: 0.5 }).unwrap();

        for i in 0..=100 {
            plan.apply(&mut a, i as f32 * 0.01);
        }
        plan.apply(&mut b, 1.0);
        let ra = a.get(id).unwrap().transform.rotation;
        let rb = b.get(id).unwrap().transform.rotation;
        assert!(ra.angle_between(rb) < 1e-5);
        assert!((ra.angle_between(Quat::IDENTITY) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn spin_composes_onto_base_rotation() {
        let base = Transform::IDENTITY.with_euler(FRAC_PI_2, 0.0, 0.0);
        let (mut tree, id) = tree_with("decor", base);
        let mut plan = MotionPlan::new();
        plan.add(&tree, id, Motion::Spin { axis: Vec3::Y, rate: -1.0 }).unwrap();
        plan.apply(&mut tree, 0.0);
        assert!(tree.get(id).unwrap().transform.rotation.angle_between(base.rotation) < 1e-6);
    }

    #[test]
    fn oscillation_stays_within_amplitude() {
        let (mut tree, id) = tree_with("accent", Transform::IDENTITY);
        let mut plan = MotionPlan::new();
        plan.add(
            &tree,
            id,
            Motion::Oscillation {
                axis: Vec3::X * 3.0,
                amplitude: 0.4,
                frequency: 2.0,
                phase: 0.0,
            },
        )
        .unwrap();
        for i in 0..200 {
            plan.apply(&mut tree, i as f32 * 0.037);
            let angle = tree.get(id).unwrap().transform.rotation.angle_between(Quat::IDENTITY);
            assert!(angle <= 0.4 + 1e-4);
        }
    }

    #[test]
    fn orbit_and_oscillation_share_a_node() {
        let (mut tree, id) = tree_with("accent", Transform::IDENTITY);
        let mut plan = MotionPlan::new();
        let orbit = Motion::Orbit {
            center: Vec3::ZERO,
            radius_x: 2.0,
            radius_z: 1.0,
            height: 0.5,
            speed: 1.0,
            phase: 0.0,
        };
        plan.add(&tree, id, orbit).unwrap();
        plan.add(
            &tree,
            id,
            Motion::Oscillation {
                axis: Vec3::X,
                amplitude: 0.3,
                frequency: 1.0,
                phase: 0.0,
            },
        )
        .unwrap();
        plan.apply(&mut tree, PI / 2.0);
        let t = tree.get(id).unwrap().transform;
        assert!(t.position.abs_diff_eq(Vec3::new(0.0, 0.5, 1.0), 1e-5));
        assert!(t.rotation.angle_between(Quat::IDENTITY) > 0.1);
    }

    #[test]
    fn unknown_node_is_rejected_and_missing_node_skipped() {
        let (mut tree, id) = tree_with("ring", Transform::IDENTITY);
        let mut plan = MotionPlan::new();
        assert!(plan.add(&tree, NodeId(99), Motion::Spin { axis: Vec3::Y, rate: 1.0 }).is_err());
        plan.add(&tree, id, Motion::Spin { axis: Vec3::ZERO, rate: 1.0 }).unwrap();
        plan.apply(&mut tree, 1.0);
        assert_eq!(plan.len(), 1);
        let axis = tree.get(id).unwrap().transform.rotation.to_axis_angle().0;
        assert!(axis.abs_diff_eq(Vec3::Y, 1e-4));
    }
}
