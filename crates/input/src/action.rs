/// A window-independent input action. The desktop app maps winit events to
/// these; the session consumes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Pointer moved to a position in logical pixels.
    PointerMoved { x: f32, y: f32 },
    /// Primary button released without dragging.
    Click,
    /// Viewport changed to a logical size at a device pixel ratio.
    Resize {
        width: u32,
        height: u32,
        pixel_ratio: f32,
    },
    /// Orbit drag by a logical pixel delta.
    Orbit { dx: f32, dy: f32 },
    /// Scroll steps; positive zooms in.
    Zoom(f32),
}
