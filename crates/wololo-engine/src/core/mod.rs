//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and the application that
//! builds a scene and advances its own state on fixed ticks.

mod app;
mod ctx;

pub use app::App;
pub use ctx::InitCtx;
