use std::fmt;
use std::sync::Arc;

use url::Url;

/// Decoded RGBA8 pixels for one photo.
#[derive(Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Preload scheduler -> gallery.
#[derive(Debug, Clone)]
pub enum PreloadEvent {
    Loaded {
        index: usize,
        image: Arc<LoadedImage>,
        /// Set only for the first fetch of a gallery's lifetime.
        priority: bool,
    },
    /// Every attempt for this photo failed.
    Unavailable { index: usize },
}

/// Viewer intent forwarded by the host page's click handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavIntent {
    Forward,
    Backward,
    Step(i64),
}

impl NavIntent {
    pub fn delta(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
            Self::Step(delta) => delta,
        }
    }
}

/// How a gallery event loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryExit {
    /// The viewer stepped past the last photo.
    Redirected(Url),
    Cancelled,
}
