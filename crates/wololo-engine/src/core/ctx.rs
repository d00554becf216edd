/// Startup parameters handed to [`super::App::init`].
#[derive(Debug, Clone, PartialEq)]
pub struct InitCtx {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Length of one logical update tick.
    pub target_frame_time_sec: f64,
}
