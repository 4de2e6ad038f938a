use thiserror::Error;

/// Library error type for slideshow playback operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The candidate set handed to playback contained no images.
    #[error("no images available to play")]
    EmptyPool,

    /// History was configured with a capacity of zero.
    #[error("history capacity must be greater than zero")]
    InvalidCapacity,

    /// The playback interval was zero.
    #[error("playback interval must be greater than zero")]
    InvalidInterval,

    /// Nothing has been pushed into history yet.
    #[error("history is empty")]
    EmptyHistory,

    /// The history cursor already sits on the oldest retained entry.
    #[error("no previous history entry")]
    NoPreviousEntry,

    /// The history cursor already sits on the newest entry.
    #[error("no next history entry")]
    NoNextEntry,

    /// Navigation was requested while playback is stopped.
    #[error("slideshow is not playing")]
    NotPlaying,

    /// The configured image directory is missing or not a directory.
    #[error("invalid image directory: {0}")]
    BadDir(String),
}
