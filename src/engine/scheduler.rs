//! One-shot playback timer.
//!
//! [`PlaybackScheduler`] keeps at most one pending fire. Every [`arm`] issues a
//! fresh [`Tick`] token and cancels the previous one; when a tick comes back
//! from the backend it is only honoured if it is still the pending token
//! ([`claim`]). A tick that was already in flight when it got superseded is
//! therefore dropped instead of advancing the show twice.
//!
//! Fires never repeat on their own. Whoever consumes a tick re-arms, exactly
//! like manual navigation does.
//!
//! [`arm`]: PlaybackScheduler::arm
//! [`claim`]: PlaybackScheduler::claim

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::Error;

/// Token identifying a single arm of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick(u64);

impl Tick {
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

/// Scheduling capability the engine is driven by.
///
/// Implementations deliver `tick` back to the engine's event loop once
/// `after` has elapsed, unless cancelled first.
pub trait TimerBackend {
    fn schedule(&mut self, tick: Tick, after: Duration);
    fn cancel(&mut self, tick: Tick);
}

#[derive(Debug)]
pub struct PlaybackScheduler<B> {
    interval: Duration,
    backend: B,
    pending: Option<Tick>,
    issued: u64,
}

impl<B: TimerBackend> PlaybackScheduler<B> {
    /// # Errors
    /// Returns [`Error::InvalidInterval`] if `interval` is zero.
    pub fn new(interval: Duration, backend: B) -> Result<Self, Error> {
        if interval.is_zero() {
            return Err(Error::InvalidInterval);
        }
        Ok(Self {
            interval,
            backend,
            pending: None,
            issued: 0,
        })
    }

    /// Cancel whatever is pending and schedule a single fire after the
    /// configured interval.
    pub fn arm(&mut self) -> Tick {
        self.cancel();
        self.issued += 1;
        let tick = Tick(self.issued);
        trace!(tick = tick.0, interval = ?self.interval, "timer armed");
        self.backend.schedule(tick, self.interval);
        self.pending = Some(tick);
        tick
    }

    /// Cancel the pending fire, if any.
    pub fn cancel(&mut self) {
        if let Some(tick) = self.pending.take() {
            trace!(tick = tick.0, "timer cancelled");
            self.backend.cancel(tick);
        }
    }

    /// Accept a delivered tick. Returns `false` for stale or cancelled ticks.
    pub fn claim(&mut self, tick: Tick) -> bool {
        if self.pending == Some(tick) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn pending(&self) -> Option<Tick> {
        self.pending
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Timer driven by a `tokio` runtime.
///
/// Each schedule spawns one sleeping task; cancellation goes through a
/// [`CancellationToken`]. Expired ticks are handed to a clone of `deliver`,
/// which is expected to forward them into the thread that owns the engine.
pub struct TokioTimer<F> {
    runtime: Handle,
    deliver: F,
    pending: Option<CancellationToken>,
}

impl<F> TokioTimer<F>
where
    F: Fn(Tick) + Clone + Send + 'static,
{
    pub fn new(runtime: Handle, deliver: F) -> Self {
        Self {
            runtime,
            deliver,
            pending: None,
        }
    }
}

impl<F> TimerBackend for TokioTimer<F>
where
    F: Fn(Tick) + Clone + Send + 'static,
{
    fn schedule(&mut self, tick: Tick, after: Duration) {
        if let Some(previous) = self.pending.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        let deliver = self.deliver.clone();
        let token = cancel.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep(after) => deliver(tick),
            }
        });
        self.pending = Some(cancel);
    }

    fn cancel(&mut self, _tick: Tick) {
        if let Some(cancel) = self.pending.take() {
            cancel.cancel();
        }
    }
}

impl<F> Drop for TokioTimer<F> {
    fn drop(&mut self) {
        if let Some(cancel) = self.pending.take() {
            cancel.cancel();
        }
    }
}

/// Fake clock: nothing fires until [`ManualTimer::fire`] is called.
#[derive(Debug, Default)]
pub struct ManualTimer {
    pending: Option<(Tick, Duration)>,
    scheduled: Vec<Tick>,
    cancelled: Vec<Tick>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the pending timer expire, returning the tick it would deliver.
    pub fn fire(&mut self) -> Option<Tick> {
        self.pending.take().map(|(tick, _)| tick)
    }

    #[must_use]
    pub fn pending(&self) -> Option<Tick> {
        self.pending.map(|(tick, _)| tick)
    }

    #[must_use]
    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.map(|(_, after)| after)
    }

    /// Every tick ever scheduled, oldest first.
    #[must_use]
    pub fn scheduled(&self) -> &[Tick] {
        &self.scheduled
    }

    #[must_use]
    pub fn cancelled(&self) -> &[Tick] {
        &self.cancelled
    }
}

impl TimerBackend for ManualTimer {
    fn schedule(&mut self, tick: Tick, after: Duration) {
        self.pending = Some((tick, after));
        self.scheduled.push(tick);
    }

    fn cancel(&mut self, tick: Tick) {
        if self.pending.is_some_and(|(pending, _)| pending == tick) {
            self.pending = None;
        }
        self.cancelled.push(tick);
    }
}
