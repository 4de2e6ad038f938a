use crate::engine::{ImageRef, Renderer};
use crate::events::{InvalidPhoto, LoadPhoto, PhotoLoaded, PreparedImageCpu};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio::select;
use tokio::sync::mpsc::{Sender, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Engine-facing renderer: hands each image to the loader task and returns
/// immediately. Decoding and presentation happen off the engine's call path.
pub struct LoaderHandoff {
    to_loader: UnboundedSender<LoadPhoto>,
    seq: u64,
}

impl LoaderHandoff {
    pub fn new(to_loader: UnboundedSender<LoadPhoto>) -> Self {
        Self { to_loader, seq: 0 }
    }
}

impl Renderer for LoaderHandoff {
    fn display(&mut self, image: &ImageRef) -> Result<()> {
        self.seq += 1;
        self.to_loader
            .send(LoadPhoto {
                path: image.path().to_path_buf(),
                seq: self.seq,
            })
            .context("loader task is gone")
    }
}

// Decodes an image to RGBA8 and applies EXIF orientation if available.
// Orientation handling is best-effort; if metadata is missing, the original
// orientation is preserved.
fn decode_rgba8_apply_exif(path: &Path) -> Result<image::RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()? // sniff based on content/extension
        .decode()?;

    let mut img = img.to_rgba8();

    let orientation: u16 = read_orientation(path).unwrap_or(1);
    match orientation {
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            // transpose
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            // transverse
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }

    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}

/// Decodes requested images, newest request wins:
/// - Requests queued behind a newer one are skipped.
/// - A decode that finishes after a newer request was accepted is dropped.
/// - Undecodable files are reported as `InvalidPhoto`.
pub async fn run(
    mut load_rx: UnboundedReceiver<LoadPhoto>,
    to_viewer: Sender<PhotoLoaded>,
    invalid_tx: Sender<InvalidPhoto>,
    cancel: CancellationToken,
    max_in_flight: usize,
) -> Result<()> {
    let mut tasks: JoinSet<(PathBuf, u64, Option<image::RgbaImage>)> = JoinSet::new();
    let mut latest: u64 = 0;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            Some(request) = load_rx.recv(), if tasks.len() < max_in_flight => {
                let LoadPhoto { path, seq } = newest_pending(request, &mut load_rx);
                latest = latest.max(seq);
                tasks.spawn(async move {
                    let p = path.clone();
                    let res = tokio::task::spawn_blocking(move || decode_rgba8_apply_exif(&p)).await;
                    (path, seq, res.ok().and_then(|r| r.ok()))
                });
            }

            Some(join_res) = tasks.join_next() => {
                let Ok((path, seq, maybe_img)) = join_res else {
                    continue;
                };
                if seq < latest {
                    debug!(seq, latest, "superseded decode dropped: {}", path.display());
                    continue;
                }
                match maybe_img {
                    Some(rgba8) => {
                        debug!("loaded (rgba8): {}", path.display());
                        let (width, height) = rgba8.dimensions();
                        let prepared = PreparedImageCpu { path, width, height, pixels: rgba8.into_raw() };
                        if to_viewer.send(PhotoLoaded(prepared)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        debug!("invalid photo {}", path.display());
                        let _ = invalid_tx.send(InvalidPhoto(path)).await;
                    }
                }
            }

            else => break,
        }
    }
    Ok(())
}

fn newest_pending(mut request: LoadPhoto, load_rx: &mut UnboundedReceiver<LoadPhoto>) -> LoadPhoto {
    while let Ok(newer) = load_rx.try_recv() {
        debug!(seq = request.seq, "skipping queued load: {}", request.path.display());
        request = newer;
    }
    request
}
