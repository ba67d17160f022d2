use crate::canvas::Canvas;

pub mod ripple;
pub mod spiral;
pub mod starfield;
pub mod trail;

/// Pointer input, already translated into the surface's logical pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Leave,
    Click { x: f32, y: f32 },
    TouchStart { touches: Vec<(f32, f32)> },
}

pub trait Effect {
    fn name(&self) -> &'static str;
    /// Called with the new logical size of the surface. Effects that seed
    /// particles from the surface size regenerate them here.
    fn resize(&mut self, width: f32, height: f32);
    /// Advances one display tick of `dt` seconds.
    fn update(&mut self, dt: f32);
    fn draw(&self, canvas: &mut Canvas);
    fn handle_event(&mut self, _event: &PointerEvent) {}
}

/// Millisecond clock advanced by the tick delta; time-based effects read
/// spawn ages from it instead of the wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
    now_ms: f64,
}

impl Clock {
    pub fn now(&self) -> f64 {
        self.now_ms
    }

    pub fn advance(&mut self, dt: f32) {
        self.now_ms += dt as f64 * 1000.0;
    }
}
