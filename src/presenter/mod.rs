//! Turning render states into something a viewer can see.
//!
//! Real overlays (boxes, progress rings, banners) belong to the video
//! pipeline. The crate ships a text presenter for terminals and logs.

mod text;

pub use text::TextPresenter;

use crate::session::RenderState;

/// Consumer of per-tick render output.
pub trait Presenter {
    /// Called once per tick with the session's render state.
    fn present(&mut self, render: &RenderState);
}

/// Presenter that discards everything.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _render: &RenderState) {}
}
