//! Slideshow window.
//!
//! The winit event loop is the single thread the engine runs on. Key presses,
//! timer ticks (forwarded by [`TokioTimer`]) and decoded frames (forwarded from
//! the loader task) all arrive here as events, so navigation calls never
//! overlap. Frames are blitted with `softbuffer`: black background, image
//! centered and shrunk to fit when it is larger than the window.

use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbaImage;
use image::imageops::FilterType;
use softbuffer::{Context as SoftContext, Surface};
use tokio::runtime::Runtime;
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowId, WindowLevel};

use crate::config::Configuration;
use crate::engine::{ImageRef, NavigationController, Renderer, TimerBackend, TokioTimer};
use crate::events::{InvalidPhoto, PhotoLoaded, ViewerEvent};
use crate::tasks::loader::{self, LoaderHandoff};

const LOADER_MAX_IN_FLIGHT: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    pub fullscreen: bool,
    pub topmost: bool,
    pub hide_cursor: bool,
}

impl From<&Configuration> for WindowOptions {
    fn from(cfg: &Configuration) -> Self {
        Self {
            fullscreen: cfg.slideshow.fullscreen,
            topmost: cfg.slideshow.topmost,
            hide_cursor: cfg.screen.hide_cursor,
        }
    }
}

/// What a key press asks the slideshow to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Next,
    Previous,
    Quit,
}

#[must_use]
pub fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::ArrowRight) => Some(KeyAction::Next),
        Key::Named(NamedKey::ArrowLeft) => Some(KeyAction::Previous),
        Key::Named(NamedKey::Escape) => Some(KeyAction::Quit),
        Key::Character(c) if c.as_str().eq_ignore_ascii_case("q") => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Size of `src` once shrunk to fit `bounds`, keeping the aspect ratio.
/// Images that already fit are left alone.
#[must_use]
pub fn fit_within(src: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = src;
    let (bw, bh) = bounds;
    if sw == 0 || sh == 0 || (sw <= bw && sh <= bh) {
        return src;
    }
    let (sw, sh, bw, bh) = (u64::from(sw), u64::from(sh), u64::from(bw), u64::from(bh));
    let (w, h) = if sw * bh > sh * bw {
        (bw, (sh * bw / sw).max(1))
    } else {
        ((sw * bh / sh).max(1), bh)
    };
    // both sides are bounded by the u32 window size
    (w as u32, h as u32)
}

/// Run the slideshow over `files` until the window closes or the user quits.
pub fn run(cfg: &Configuration, files: Vec<ImageRef>, runtime: &Runtime) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    let proxy = event_loop.create_proxy();
    let cancel = CancellationToken::new();

    // Engine -> Loader -> Viewer
    let (load_tx, load_rx) = mpsc::unbounded_channel();
    let (loaded_tx, mut loaded_rx) = mpsc::channel::<PhotoLoaded>(2);
    let (invalid_tx, mut invalid_rx) = mpsc::channel::<InvalidPhoto>(16);

    runtime.spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(err) =
                loader::run(load_rx, loaded_tx, invalid_tx, cancel, LOADER_MAX_IN_FLIGHT).await
            {
                error!("loader task failed: {err:?}");
            }
        }
    });

    // Bridge loader output into the event loop
    runtime.spawn({
        let proxy = proxy.clone();
        let cancel = cancel.clone();
        async move {
            loop {
                let event = select! {
                    _ = cancel.cancelled() => break,
                    Some(loaded) = loaded_rx.recv() => ViewerEvent::Loaded(loaded),
                    Some(invalid) = invalid_rx.recv() => ViewerEvent::Invalid(invalid),
                    else => break,
                };
                if proxy.send_event(event).is_err() {
                    break;
                }
            }
        }
    });

    runtime.spawn({
        let proxy = proxy.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            let _ = proxy.send_event(ViewerEvent::Shutdown);
        }
    });

    let timer = TokioTimer::new(runtime.handle().clone(), {
        let proxy = proxy.clone();
        move |tick| {
            let _ = proxy.send_event(ViewerEvent::Tick(tick));
        }
    });
    let mut controller =
        NavigationController::new(cfg.playback_settings(), LoaderHandoff::new(load_tx), timer)?;
    let first = controller.start(files)?;
    debug!(path = %first, "first image requested");

    let mut app = ViewerApp::new(WindowOptions::from(cfg), controller);
    let result = event_loop.run_app(&mut app);

    app.controller.stop();
    cancel.cancel();
    result.context("event loop terminated abnormally")
}

type WindowHandle = Arc<Window>;

struct ViewerApp<R, B> {
    options: WindowOptions,
    controller: NavigationController<R, B>,
    window: Option<WindowHandle>,
    // kept alive for the surface
    _context: Option<SoftContext<WindowHandle>>,
    surface: Option<Surface<WindowHandle, WindowHandle>>,
    frame: Option<RgbaImage>,
    scaled: Option<RgbaImage>,
    needs_redraw: bool,
}

impl<R, B> ViewerApp<R, B>
where
    R: Renderer,
    B: TimerBackend,
{
    fn new(options: WindowOptions, controller: NavigationController<R, B>) -> Self {
        Self {
            options,
            controller,
            window: None,
            _context: None,
            surface: None,
            frame: None,
            scaled: None,
            needs_redraw: true,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }

        let level = if self.options.topmost {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        let fullscreen = self
            .options
            .fullscreen
            .then_some(Fullscreen::Borderless(None));
        let attrs = Window::default_attributes()
            .with_title("slideshow")
            .with_window_level(level)
            .with_fullscreen(fullscreen);
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        window.set_cursor_visible(!self.options.hide_cursor);
        let window = WindowHandle::new(window);

        let context = SoftContext::new(window.clone())
            .map_err(|err| anyhow::anyhow!("failed to create softbuffer context: {err}"))?;
        let surface = Surface::new(&context, window.clone())
            .map_err(|err| anyhow::anyhow!("failed to create softbuffer surface: {err}"))?;

        self._context = Some(context);
        self.surface = Some(surface);
        self.handle_resize(window.inner_size());
        if let Ok(current) = self.controller.current_image() {
            window.set_title(&current.to_string());
        }
        self.window = Some(window);
        self.needs_redraw = true;
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let (Some(width), Some(height)) = (
            NonZeroU32::new(size.width.max(1)),
            NonZeroU32::new(size.height.max(1)),
        ) else {
            return;
        };
        if let Err(err) = surface.resize(width, height) {
            warn!("failed to resize surface: {err}");
        }
        self.scaled = None;
        self.needs_redraw = true;
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, action: KeyAction) {
        match action {
            KeyAction::Next => {
                if let Err(err) = self.controller.next() {
                    warn!("next failed: {err}");
                }
            }
            KeyAction::Previous => match self.controller.prev() {
                Ok(Some(_)) => {}
                Ok(None) => debug!("no earlier image in history"),
                Err(err) => warn!("prev failed: {err}"),
            },
            KeyAction::Quit => self.shutdown(event_loop),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.controller.stop();
        event_loop.exit();
    }

    fn set_frame(&mut self, loaded: PhotoLoaded) {
        let PhotoLoaded(photo) = loaded;
        if let Some(window) = self.window.as_ref() {
            window.set_title(&photo.path.display().to_string());
        }
        self.frame = RgbaImage::from_raw(photo.width, photo.height, photo.pixels);
        if self.frame.is_none() {
            warn!(path = %photo.path.display(), "decoded buffer does not match its dimensions");
        }
        self.scaled = None;
        self.needs_redraw = true;
    }

    fn render(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        if let Some(frame) = self.frame.as_ref() {
            let target = fit_within(frame.dimensions(), (width, height));
            let stale = self
                .scaled
                .as_ref()
                .is_none_or(|scaled| scaled.dimensions() != target);
            if stale {
                self.scaled = Some(if target == frame.dimensions() {
                    frame.clone()
                } else {
                    image::imageops::resize(frame, target.0, target.1, FilterType::Lanczos3)
                });
            }
        }

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match surface.buffer_mut() {
            Ok(mut buffer) => {
                buffer.fill(0);
                if let Some(image) = self.scaled.as_ref() {
                    blit_centered(&mut buffer, width, height, image);
                }
                if let Err(err) = buffer.present() {
                    warn!("failed to present frame: {err}");
                }
            }
            Err(err) => warn!("failed to acquire frame buffer: {err}"),
        }
    }
}

/// Copy `image` into the center of a `0x00RRGGBB` buffer, composited on black.
fn blit_centered(buffer: &mut [u32], width: u32, height: u32, image: &RgbaImage) {
    let (iw, ih) = image.dimensions();
    let x0 = width.saturating_sub(iw) / 2;
    let y0 = height.saturating_sub(ih) / 2;
    for (x, y, px) in image.enumerate_pixels() {
        let (bx, by) = (x0 + x, y0 + y);
        if bx >= width || by >= height {
            continue;
        }
        let [r, g, b, a] = px.0;
        let a = u32::from(a);
        let r = u32::from(r) * a / 255;
        let g = u32::from(g) * a / 255;
        let b = u32::from(b) * a / 255;
        if let Some(slot) = buffer.get_mut((by * width + bx) as usize) {
            *slot = (r << 16) | (g << 8) | b;
        }
    }
}

impl<R, B> ApplicationHandler<ViewerEvent> for ViewerApp<R, B>
where
    R: Renderer,
    B: TimerBackend,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.ensure_window(event_loop) {
            error!("{err:?}");
            self.shutdown(event_loop);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => self.shutdown(event_loop),
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::RedrawRequested => self.render(),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let Some(action) = key_action(&event.logical_key) {
                    self.handle_key(event_loop, action);
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Tick(tick) => {
                if let Err(err) = self.controller.on_tick(tick) {
                    debug!("tick ignored: {err}");
                }
            }
            ViewerEvent::Loaded(loaded) => self.set_frame(loaded),
            ViewerEvent::Invalid(InvalidPhoto(path)) => {
                warn!(path = %path.display(), "could not decode image");
                self.frame = None;
                self.scaled = None;
                self.needs_redraw = true;
            }
            ViewerEvent::Shutdown => self.shutdown(event_loop),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.needs_redraw {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
            self.needs_redraw = false;
        }
    }
}
