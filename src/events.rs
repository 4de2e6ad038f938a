use std::path::PathBuf;

use crate::engine::Tick;

/// Request to decode an image; `seq` increases with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPhoto {
    pub path: PathBuf,
    pub seq: u64,
}

/// Decoded RGBA8 pixels, orientation already applied.
#[derive(Debug)]
pub struct PreparedImageCpu {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub struct PhotoLoaded(pub PreparedImageCpu);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPhoto(pub PathBuf);

/// Everything that gets funneled into the window event loop.
#[derive(Debug)]
pub enum ViewerEvent {
    Tick(Tick),
    Loaded(PhotoLoaded),
    Invalid(InvalidPhoto),
    Shutdown,
}
