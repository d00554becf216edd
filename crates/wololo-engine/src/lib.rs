//! Wololo engine crate.
//!
//! A constructive-solid-geometry scene arena plus a Vulkan renderer that draws
//! it with one full-screen "ubershader" pass, and the window runtime that
//! drives both.

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
