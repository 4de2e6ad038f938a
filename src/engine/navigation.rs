use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::history::History;
use super::pool::ImagePool;
use super::scheduler::{PlaybackScheduler, Tick, TimerBackend};
use super::ImageRef;
use crate::error::Error;

/// Presents an image. Called synchronously from the engine.
///
/// A failure is logged and otherwise ignored: the navigation still counts as
/// having happened, so history and pool never depend on the outcome.
pub trait Renderer {
    fn display(&mut self, image: &ImageRef) -> anyhow::Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn display(&mut self, image: &ImageRef) -> anyhow::Result<()> {
        (**self).display(image)
    }
}

/// Validated playback parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// How long an image stays up before the timer advances.
    pub interval: Duration,
    /// Maximum number of history entries kept for `prev`/`next` traversal.
    pub history_length: usize,
    /// Fixed seed for the pool shuffle; `None` seeds from the OS.
    pub shuffle_seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

#[derive(Debug)]
struct Session {
    pool: ImagePool,
    history: History,
}

/// Façade driving pool, history and timer on behalf of the viewer.
///
/// All methods are expected to be called from one serialized event loop;
/// timer ticks come back through [`NavigationController::on_tick`].
pub struct NavigationController<R, B> {
    renderer: R,
    scheduler: PlaybackScheduler<B>,
    history_length: usize,
    shuffle_seed: Option<u64>,
    session: Option<Session>,
}

impl<R, B> NavigationController<R, B>
where
    R: Renderer,
    B: TimerBackend,
{
    /// # Errors
    /// Returns [`Error::InvalidCapacity`] or [`Error::InvalidInterval`] for
    /// unusable settings.
    pub fn new(settings: PlaybackSettings, renderer: R, backend: B) -> Result<Self, Error> {
        if settings.history_length == 0 {
            return Err(Error::InvalidCapacity);
        }
        let scheduler = PlaybackScheduler::new(settings.interval, backend)?;
        Ok(Self {
            renderer,
            scheduler,
            history_length: settings.history_length,
            shuffle_seed: settings.shuffle_seed,
            session: None,
        })
    }

    /// Begin playback over `files` and show the first image.
    ///
    /// Calling this while already playing restarts with the new file list.
    ///
    /// # Errors
    /// Returns [`Error::EmptyPool`] if `files` is empty. Nothing is armed and
    /// the previous state is left untouched in that case.
    pub fn start(&mut self, files: Vec<ImageRef>) -> Result<ImageRef, Error> {
        let rng = match self.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let pool = ImagePool::new(files, rng)?;
        let history = History::new(self.history_length)?;

        if self.session.is_some() {
            info!("restarting playback with a new image set");
            self.scheduler.cancel();
        }
        info!(
            images = pool.len(),
            history = self.history_length,
            "playback started"
        );
        self.session = Some(Session { pool, history });
        self.advance()
    }

    /// Show the next image: forward through history if possible, otherwise
    /// a fresh draw from the pool.
    ///
    /// # Errors
    /// Returns [`Error::NotPlaying`] while stopped.
    pub fn next(&mut self) -> Result<ImageRef, Error> {
        self.advance()
    }

    /// Step back through history. `Ok(None)` means the oldest entry is
    /// already on screen; nothing changes in that case.
    ///
    /// # Errors
    /// Returns [`Error::NotPlaying`] while stopped.
    pub fn prev(&mut self) -> Result<Option<ImageRef>, Error> {
        let session = self.session.as_mut().ok_or(Error::NotPlaying)?;
        if !session.history.has_previous() {
            debug!("already at oldest history entry");
            return Ok(None);
        }
        let image = session.history.move_back()?.clone();
        self.show(&image);
        self.scheduler.arm();
        Ok(Some(image))
    }

    /// Stop playback, cancel the timer and drop pool and history.
    pub fn stop(&mut self) {
        self.scheduler.cancel();
        if self.session.take().is_some() {
            info!("playback stopped");
        }
    }

    /// Handle a tick delivered by the timer backend.
    ///
    /// Returns `Ok(None)` for ticks that were superseded or cancelled.
    ///
    /// # Errors
    /// Returns [`Error::NotPlaying`] if a live tick arrives while stopped.
    pub fn on_tick(&mut self, tick: Tick) -> Result<Option<ImageRef>, Error> {
        if !self.scheduler.claim(tick) {
            debug!(tick = tick.sequence(), "ignoring stale timer tick");
            return Ok(None);
        }
        self.advance().map(Some)
    }

    fn advance(&mut self) -> Result<ImageRef, Error> {
        let session = self.session.as_mut().ok_or(Error::NotPlaying)?;
        let image = if session.history.has_next() {
            session.history.move_forward()?.clone()
        } else {
            let image = session.pool.draw();
            session.history.push(image.clone());
            image
        };
        self.show(&image);
        self.scheduler.arm();
        Ok(image)
    }

    fn show(&mut self, image: &ImageRef) {
        debug!(path = %image, "displaying");
        if let Err(err) = self.renderer.display(image) {
            warn!(path = %image, error = ?err, "renderer failed to display image");
        }
    }

    /// Image currently on screen.
    ///
    /// # Errors
    /// Returns [`Error::NotPlaying`] while stopped.
    pub fn current_image(&self) -> Result<&ImageRef, Error> {
        self.session
            .as_ref()
            .ok_or(Error::NotPlaying)?
            .history
            .current()
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        if self.session.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    /// History of the running session, if any.
    #[must_use]
    pub fn history(&self) -> Option<&History> {
        self.session.as_ref().map(|s| &s.history)
    }

    /// Pool of the running session, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&ImagePool> {
        self.session.as_ref().map(|s| &s.pool)
    }

    pub fn scheduler(&self) -> &PlaybackScheduler<B> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut PlaybackScheduler<B> {
        &mut self.scheduler
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
