use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use starfolio_common::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopMode {
    #[default]
    Repeat,
    Once,
}

/// Keyframe values, one per entry of [`Track::times`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl TrackValues {
    fn len(&self) -> usize {
        match self {
            Self::Translation(v) | Self::Scale(v) => v.len(),
            Self::Rotation(v) => v.len(),
        }
    }
}

/// Linearly interpolated keyframes driving one property of a named node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Node name, resolved inside the model subtree when bound.
    pub target: String,
    /// Ascending keyframe times in seconds.
    pub times: Vec<f32>,
    pub values: TrackValues,
}

impl Track {
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Write the value at local time `t` into `transform`.
    pub fn apply(&self, t: f32, transform: &mut Transform) {
        let n = self.times.len().min(self.values.len());
        if n == 0 {
            return;
        }
        let (a, b, f) = self.keys_around(t, n);
        match &self.values {
            TrackValues::Translation(v) => transform.position = v[a].lerp(v[b], f),
            TrackValues::Rotation(v) => transform.rotation = v[a].slerp(v[b], f),
            TrackValues::Scale(v) => transform.scale = v[a].lerp(v[b], f),
        }
    }

    fn keys_around(&self, t: f32, n: usize) -> (usize, usize, f32) {
        let times = &self.times[..n];
        if t <= times[0] {
            return (0, 0, 0.0);
        }
        if t >= times[n - 1] {
            return (n - 1, n - 1, 0.0);
        }
        let b = times.partition_point(|&k| k <= t);
        let a = b - 1;
        let span = times[b] - times[a];
        let f = if span > 0.0 { (t - times[a]) / span } else { 0.0 };
        (a, b, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
    pub loop_mode: LoopMode,
}

impl AnimationClip {
    /// Duration is taken from the latest keyframe.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::end_time).fold(0.0, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
            loop_mode: LoopMode::Repeat,
        }
    }

    /// Map an ever-growing playback cursor onto clip time.
    pub fn local_time(&self, cursor: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        match self.loop_mode {
            LoopMode::Repeat => cursor.rem_euclid(self.duration),
            LoopMode::Once => cursor.min(self.duration),
        }
    }
}
