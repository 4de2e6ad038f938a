use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::engine::PlaybackSettings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Where images come from and how the window looks.
    pub screen: ScreenOptions,
    /// Pacing and navigation behaviour.
    pub slideshow: SlideshowOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScreenOptions {
    /// Root directory scanned for images.
    pub image_path: PathBuf,
    /// Hide the mouse cursor over the slideshow window.
    pub hide_cursor: bool,
    /// Accepted file extensions, case-insensitive, with or without a dot.
    pub extensions: Vec<String>,
    /// Descend into subdirectories of `image-path`.
    pub recursive: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SlideshowOptions {
    /// Time an image stays on screen before advancing.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// When disabled, only the current image is remembered and `prev` does nothing.
    pub enable_history: bool,
    /// Number of shown images remembered for back/forward navigation.
    pub history_length: usize,
    pub fullscreen: bool,
    /// Keep the window above all others.
    pub topmost: bool,
    /// Optional deterministic seed for the image shuffle.
    pub shuffle_seed: Option<u64>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.screen.image_path.as_os_str().is_empty(),
            "screen.image-path must not be empty"
        );
        ensure!(
            !self.normalized_extensions().is_empty(),
            "screen.extensions must list at least one extension"
        );
        ensure!(
            !self.slideshow.interval.is_zero(),
            "slideshow.interval must be greater than zero"
        );
        ensure!(
            self.slideshow.history_length > 0,
            "slideshow.history-length must be greater than zero"
        );
        Ok(self)
    }

    /// Extensions normalized to lowercase without a leading dot.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.screen
            .extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            interval: self.slideshow.interval,
            history_length: self.slideshow.effective_history_length(),
            shuffle_seed: self.slideshow.shuffle_seed,
        }
    }
}

impl ScreenOptions {
    fn default_image_path() -> PathBuf {
        PathBuf::from("/media/bildschirm")
    }

    fn default_extensions() -> Vec<String> {
        ["png", "jpg", "jpeg"].into_iter().map(String::from).collect()
    }
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            image_path: Self::default_image_path(),
            hide_cursor: true,
            extensions: Self::default_extensions(),
            recursive: true,
        }
    }
}

impl SlideshowOptions {
    const fn default_interval() -> Duration {
        Duration::from_secs(30)
    }

    const fn default_history_length() -> usize {
        256
    }

    pub const fn effective_history_length(&self) -> usize {
        if self.enable_history {
            self.history_length
        } else {
            1
        }
    }
}

impl Default for SlideshowOptions {
    fn default() -> Self {
        Self {
            interval: Self::default_interval(),
            enable_history: true,
            history_length: Self::default_history_length(),
            fullscreen: true,
            topmost: true,
            shuffle_seed: None,
        }
    }
}
