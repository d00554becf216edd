use anyhow::Result;

use crate::render::Renderer;

use super::ctx::InitCtx;

/// Application contract driven by [`crate::window::Runtime`].
pub trait App {
    /// Called once after the window and renderer exist, before the first
    /// frame. Build the scene here; an error aborts the run.
    fn init(&mut self, ctx: &InitCtx, renderer: &mut Renderer<'_>) -> Result<()>;

    /// Called at the fixed logical tick rate with the tick length in seconds.
    fn update(&mut self, dt_sec: f64) {
        let _ = dt_sec;
    }

    /// Called once when the event loop is shutting down.
    fn quit(&mut self) {}
}
