use crate::clip::AnimationClip;
use starfolio_common::NodeId;
use starfolio_scene::NodeTree;

/// Largest delta a single frame may contribute, in seconds. Longer gaps
/// (suspended window, debugger pause) play back as one capped step.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Clamp a raw frame delta into `[0, MAX_FRAME_DELTA]`; non-finite becomes 0.
pub fn sanitize_delta(dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DELTA)
    } else {
        0.0
    }
}

/// Clip index 1 when present, else 0, else nothing.
pub fn select_clip(clips: &[AnimationClip]) -> Option<usize> {
    match clips.len() {
        0 => None,
        1 => Some(0),
        _ => Some(1),
    }
}

/// A model root playing one clip.
#[derive(Debug, Clone)]
pub struct AnimationBinding {
    root: NodeId,
    clip: AnimationClip,
    /// Resolved node per track, `None` when the target name was not found.
    targets: Vec<Option<NodeId>>,
    cursor: f32,
}

impl AnimationBinding {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Accumulated playback time in seconds.
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn resolved_tracks(&self) -> usize {
        self.targets.iter().filter(|t| t.is_some()).count()
    }
}

/// Owns every binding and advances them once per frame.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    bindings: Vec<AnimationBinding>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the preferred clip of a freshly attached model and start it.
    /// Returns the binding index, or `None` when the model has no clips.
    pub fn bind(
        &mut self,
        tree: &NodeTree,
        root: NodeId,
        mut clips: Vec<AnimationClip>,
    ) -> Option<usize> {
        let Some(index) = select_clip(&clips) else {
            tracing::debug!(%root, "no clips, model stays static");
            return None;
        };
        let clip = clips.swap_remove(index);
        let targets: Vec<Option<NodeId>> = clip
            .tracks
            .iter()
            .map(|track| {
                // The root carries the model's placement; tracks never drive it.
                let found = tree
                    .descendants(root)
                    .into_iter()
                    .skip(1)
                    .find(|&id| tree.get(id).is_some_and(|n| n.name == track.target));
                if found.is_none() {
                    tracing::debug!(track = %track.target, clip = %clip.name, "track target missing");
                }
                found
            })
            .collect();

        tracing::info!(%root, clip = %clip.name, duration = clip.duration, "animation bound");
        self.bindings.push(AnimationBinding {
            root,
            clip,
            targets,
            cursor: 0.0,
        });
        Some(self.bindings.len() - 1)
    }

    /// Advance every binding by `dt` and write the sampled pose.
    pub fn advance(&mut self, tree: &mut NodeTree, dt: f32) {
        let dt = sanitize_delta(dt);
        for binding in &mut self.bindings {
            binding.cursor += dt;
            let t = binding.clip.local_time(binding.cursor);
            for (track, target) in binding.clip.tracks.iter().zip(&binding.targets) {
                let Some(node) = target.and_then(|id| tree.get_mut(id)) else {
                    continue;
                };
                track.apply(t, &mut node.transform);
            }
        }
    }

    pub fn bindings(&self) -> &[AnimationBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
