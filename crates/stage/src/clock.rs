use starfolio_animation::sanitize_delta;

/// Timing for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the session clock started.
    pub elapsed: f32,
    /// Sanitized seconds since the previous tick.
    pub delta: f32,
    /// Ticks before this one.
    pub frame: u64,
}

/// Turns host timestamps into [`FrameTime`]s. Elapsed time never runs
/// backwards and the delta is capped.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `now` is seconds on any monotonic-ish host clock.
    pub fn tick(&mut self, now: f64) -> FrameTime {
        let raw = match self.last {
            Some(last) if now.is_finite() => now - last,
            _ => 0.0,
        };
        let elapsed = match self.last {
            Some(last) if !(now.is_finite() && now >= last) => last,
            _ if now.is_finite() => now,
            _ => 0.0,
        };
        self.last = Some(elapsed);
        let time = FrameTime {
            elapsed: elapsed as f32,
            delta: sanitize_delta(raw as f32),
            frame: self.frames,
        };
        self.frames += 1;
        time
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
