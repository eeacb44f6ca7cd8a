use crate::session::{FrameInput, FrameReport, Session};
use starfolio_input::{Action, Navigator};
use starfolio_render::Renderer;

/// Totals reported when a [`FrameLoop`] stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShutdownReport {
    pub frames: u64,
    pub elapsed: f32,
    pub attached: usize,
    pub failed: usize,
}

/// Drives a [`Session`] and hands each updated frame to a [`Renderer`].
///
/// One tick: advance the clock, update the session with the queued actions,
/// propagate any resize to the renderer, then render.
pub struct FrameLoop<R: Renderer> {
    session: Session,
    renderer: R,
}

impl<R: Renderer> FrameLoop<R> {
    pub fn new(mut renderer: R, session: Session) -> Self {
        renderer.resize(session.surface());
        Self { session, renderer }
    }

    pub fn tick(&mut self, now: f64, actions: Vec<Action>, navigator: &mut dyn Navigator) -> (FrameReport, R::Output) {
        let time = self.session.clock_tick(now);
        let report = self.session.update(FrameInput { time, actions }, navigator);
        if let Some(size) = report.resized {
            self.renderer.resize(size);
        }
        let output = self.renderer.render(&self.session.frame_view());
        (report, output)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn shutdown(self) -> ShutdownReport {
        let loads = self.session.loads();
        let report = ShutdownReport {
            frames: self.session.frames(),
            elapsed: self.session.last_time().elapsed,
            attached: loads.attached(),
            failed: loads.failed(),
        };
        tracing::info!(
            frames = report.frames,
            elapsed = report.elapsed,
            attached = report.attached,
            failed = report.failed,
            "frame loop stopped"
        );
        report
    }
}

impl<R: Renderer + std::fmt::Debug> std::fmt::Debug for FrameLoop<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("session", &self.session)
            .field("renderer", &self.renderer)
            .finish()
    }
}
