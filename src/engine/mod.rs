//! Navigation and playback engine.
//!
//! The engine decides which image is shown next. It owns a shuffled,
//! self-replenishing [`pool::ImagePool`], a bounded [`history::History`] with a
//! movable cursor, and a one-shot [`scheduler::PlaybackScheduler`]. The
//! [`navigation::NavigationController`] ties them together for the viewer.
//!
//! Nothing in here touches the filesystem, decodes pixels or owns a window;
//! those concerns are injected through [`navigation::Renderer`] and
//! [`scheduler::TimerBackend`].

pub mod history;
pub mod navigation;
pub mod pool;
pub mod scheduler;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use history::History;
pub use navigation::{NavigationController, PlaybackSettings, PlaybackState, Renderer};
pub use pool::ImagePool;
pub use scheduler::{ManualTimer, PlaybackScheduler, Tick, TimerBackend, TokioTimer};

/// Opaque, immutable handle to one displayable image.
///
/// Cloning is cheap; the path is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef(Arc<Path>);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::from(path.into()))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for ImageRef {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&str> for ImageRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl AsRef<Path> for ImageRef {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}
