//! Directory scanning for the slideshow's candidate images.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::engine::ImageRef;
use crate::error::Error;

/// Return `true` if `path` has one of `exts` (lowercase, without dot).
#[must_use]
pub fn is_supported_image<S: AsRef<str>>(path: &Path, exts: &[S]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e.as_ref() == ext)
        })
}

/// List every image below `root` whose extension is in `exts`.
///
/// The result is sorted; callers shuffle it themselves.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory.
pub fn list_images<S: AsRef<str>>(
    root: &Path,
    exts: &[S],
    recursive: bool,
) -> Result<Vec<ImageRef>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.to_string_lossy().into_owned()));
    }

    let mut wd = WalkDir::new(root).follow_links(true);
    if !recursive {
        wd = wd.max_depth(1);
    }

    let mut out: Vec<PathBuf> = wd
        .into_iter()
        // Dot-files and dot-directories *below* the root are skipped.
        .filter_entry(|e| !is_hidden(e))
        .flatten()
        .filter(|e| e.file_type().is_file() && is_supported_image(e.path(), exts))
        .map(|e| normalize(e.path()))
        .collect();
    out.sort();
    debug!(root = %root.display(), found = out.len(), "image scan complete");

    Ok(out.into_iter().map(ImageRef::from).collect())
}

fn is_hidden(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

// Lexical cleanup only (drops `.` components); symlinks are left alone.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
