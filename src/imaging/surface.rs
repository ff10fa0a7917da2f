use std::sync::{Arc, Mutex, MutexGuard};

use hosting::Rect;
use tracing::debug;

use crate::imaging::Frame;

/// Where the viewer puts its output
///
/// Accepts a placement and a decoded frame; nothing else is assumed about the
/// windowing system behind it.
pub trait RenderSurface: Send + Sync {
    fn place(&mut self, area: Rect);
    fn show(&mut self);
    fn hide(&mut self);
    fn raise(&mut self);
    fn display(&mut self, frame: &Frame);
    fn clear(&mut self);
}

/// What a [`HeadlessSurface`] currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub placement: Option<Rect>,
    pub visible: bool,
    pub raised: usize,
    /// Dimensions of the displayed frame
    pub frame: Option<(u32, u32)>,
    pub frames_displayed: usize,
}

/// Surface without a window; records what would be shown
///
/// Clones share state, so a clone kept outside the viewer observes it.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceSnapshot>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RenderSurface for HeadlessSurface {
    fn place(&mut self, area: Rect) {
        debug!("Surface placed at {}", area);
        self.lock().placement = Some(area);
    }

    fn show(&mut self) {
        self.lock().visible = true;
    }

    fn hide(&mut self) {
        self.lock().visible = false;
    }

    fn raise(&mut self) {
        self.lock().raised += 1;
    }

    fn display(&mut self, frame: &Frame) {
        let mut state = self.lock();
        state.frame = Some((frame.width(), frame.height()));
        state.frames_displayed += 1;
    }

    fn clear(&mut self) {
        self.lock().frame = None;
    }
}
