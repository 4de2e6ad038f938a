use std::collections::BTreeSet;
use std::time::Duration;

use rust_slideshow::engine::{
    ImageRef, ManualTimer, NavigationController, PlaybackSettings, PlaybackState, Renderer,
    TokioTimer,
};
use rust_slideshow::error::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

#[derive(Default)]
struct Recorder {
    shown: Vec<ImageRef>,
}

impl Renderer for Recorder {
    fn display(&mut self, image: &ImageRef) -> anyhow::Result<()> {
        self.shown.push(image.clone());
        Ok(())
    }
}

struct Broken {
    attempts: usize,
}

impl Renderer for Broken {
    fn display(&mut self, image: &ImageRef) -> anyhow::Result<()> {
        self.attempts += 1;
        anyhow::bail!("cannot open {image}")
    }
}

fn settings(history_length: usize) -> PlaybackSettings {
    PlaybackSettings {
        interval: Duration::from_secs(30),
        history_length,
        shuffle_seed: Some(0x51_1DE5),
    }
}

fn files(names: &[&str]) -> Vec<ImageRef> {
    names.iter().map(|n| ImageRef::from(*n)).collect()
}

fn controller(history_length: usize) -> NavigationController<Recorder, ManualTimer> {
    NavigationController::new(settings(history_length), Recorder::default(), ManualTimer::new())
        .expect("valid settings")
}

fn history_of(nav: &NavigationController<Recorder, ManualTimer>) -> Vec<ImageRef> {
    nav.history().expect("playing").iter().cloned().collect()
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let err = NavigationController::new(settings(0), Recorder::default(), ManualTimer::new())
        .err()
        .expect("zero history must fail");
    assert_eq!(err, Error::InvalidCapacity);

    let zero_interval = PlaybackSettings {
        interval: Duration::ZERO,
        ..settings(4)
    };
    let err = NavigationController::new(zero_interval, Recorder::default(), ManualTimer::new())
        .err()
        .expect("zero interval must fail");
    assert_eq!(err, Error::InvalidInterval);
}

#[test]
fn start_with_no_images_fails_and_touches_nothing() {
    let mut nav = controller(4);
    assert_eq!(nav.start(Vec::new()).unwrap_err(), Error::EmptyPool);

    assert_eq!(nav.state(), PlaybackState::Stopped);
    assert!(!nav.scheduler().is_armed());
    assert!(nav.scheduler().backend().scheduled().is_empty());
    assert!(nav.renderer().shown.is_empty());
}

#[test]
fn start_shows_first_image_and_arms_timer() {
    let mut nav = controller(4);
    let first = nav.start(files(&["a", "b", "c"])).unwrap();

    assert_eq!(nav.state(), PlaybackState::Playing);
    assert_eq!(nav.current_image().unwrap(), &first);
    assert_eq!(nav.renderer().shown, vec![first]);
    assert!(nav.scheduler().is_armed());
    assert_eq!(
        nav.scheduler().backend().pending_delay(),
        Some(Duration::from_secs(30))
    );
}

#[test]
fn navigation_while_stopped_is_an_error() {
    let mut nav = controller(4);
    assert_eq!(nav.next().unwrap_err(), Error::NotPlaying);
    assert_eq!(nav.prev().unwrap_err(), Error::NotPlaying);
    assert_eq!(nav.current_image().unwrap_err(), Error::NotPlaying);
    assert!(nav.renderer().shown.is_empty());
}

#[test]
fn capacity_three_history_walkthrough() {
    let mut nav = controller(3);
    nav.start(files(&["a", "b", "c", "d", "e"])).unwrap();
    for _ in 0..3 {
        nav.next().unwrap();
    }
    let shown = nav.renderer().shown.clone();
    assert_eq!(shown.len(), 4);
    assert_eq!(history_of(&nav), shown[1..].to_vec());
    assert_eq!(nav.current_image().unwrap(), &shown[3]);

    assert_eq!(nav.prev().unwrap(), Some(shown[2].clone()));
    assert_eq!(nav.prev().unwrap(), Some(shown[1].clone()));
    assert_eq!(nav.prev().unwrap(), None);
    assert_eq!(nav.current_image().unwrap(), &shown[1]);
    assert_eq!(nav.next().unwrap(), shown[2]);
}

#[test]
fn prev_at_oldest_changes_nothing() {
    let mut nav = controller(4);
    nav.start(files(&["a", "b"])).unwrap();
    let pending = nav.scheduler().pending();
    let history = history_of(&nav);
    let displays = nav.renderer().shown.len();

    assert_eq!(nav.prev().unwrap(), None);

    assert_eq!(nav.scheduler().pending(), pending);
    assert_eq!(history_of(&nav), history);
    assert_eq!(nav.history().unwrap().cursor(), 0);
    assert_eq!(nav.renderer().shown.len(), displays);
}

#[test]
fn next_inside_history_does_not_draw_from_pool() {
    let mut nav = controller(8);
    nav.start(files(&["a", "b", "c", "d"])).unwrap();
    nav.next().unwrap();
    nav.next().unwrap();
    let remaining = nav.pool().unwrap().remaining();
    let history = history_of(&nav);

    nav.prev().unwrap();
    nav.prev().unwrap();
    nav.next().unwrap();
    nav.next().unwrap();

    assert_eq!(nav.pool().unwrap().remaining(), remaining);
    assert_eq!(history_of(&nav), history);

    nav.next().unwrap();
    assert_eq!(nav.pool().unwrap().remaining(), remaining - 1);
    assert_eq!(nav.history().unwrap().len(), history.len() + 1);
}

#[test]
fn prev_then_next_round_trip() {
    let mut nav = controller(16);
    nav.start(files(&["a", "b", "c", "d", "e", "f"])).unwrap();
    for _ in 0..5 {
        nav.next().unwrap();
    }
    let start = nav.current_image().unwrap().clone();

    let back: Vec<_> = (0..4).map(|_| nav.prev().unwrap().unwrap()).collect();
    let forward: Vec<_> = (0..4).map(|_| nav.next().unwrap()).collect();

    assert_eq!(nav.current_image().unwrap(), &start);
    let mut expected = back[..3].to_vec();
    expected.reverse();
    expected.push(start);
    assert_eq!(forward, expected);
}

#[test]
fn every_navigation_rearms_the_timer() {
    let mut nav = controller(8);
    nav.start(files(&["a", "b", "c"])).unwrap();
    let after_start = nav.scheduler().pending().unwrap();

    nav.next().unwrap();
    let after_next = nav.scheduler().pending().unwrap();
    nav.prev().unwrap();
    let after_prev = nav.scheduler().pending().unwrap();

    assert!(after_start < after_next && after_next < after_prev);
    assert_eq!(
        nav.scheduler().backend().cancelled(),
        &[after_start, after_next]
    );
}

#[test]
fn timer_tick_advances_and_rearms() {
    let mut nav = controller(8);
    nav.start(files(&["a", "b", "c"])).unwrap();

    let tick = nav.scheduler_mut().backend_mut().fire().unwrap();
    let shown = nav.on_tick(tick).unwrap().expect("live tick advances");

    assert_eq!(nav.current_image().unwrap(), &shown);
    assert_eq!(nav.renderer().shown.len(), 2);
    assert!(nav.scheduler().is_armed());
}

#[test]
fn superseded_tick_is_ignored() {
    let mut nav = controller(8);
    nav.start(files(&["a", "b", "c"])).unwrap();
    let stale = nav.scheduler().pending().unwrap();

    nav.next().unwrap();
    let displays = nav.renderer().shown.len();
    let current = nav.current_image().unwrap().clone();

    assert_eq!(nav.on_tick(stale).unwrap(), None);
    assert_eq!(nav.renderer().shown.len(), displays);
    assert_eq!(nav.current_image().unwrap(), &current);

    let live = nav.scheduler_mut().backend_mut().fire().unwrap();
    assert!(nav.on_tick(live).unwrap().is_some());
}

#[test]
fn tick_after_stop_is_ignored() {
    let mut nav = controller(8);
    nav.start(files(&["a", "b"])).unwrap();
    let tick = nav.scheduler().pending().unwrap();

    nav.stop();
    assert_eq!(nav.state(), PlaybackState::Stopped);
    assert!(!nav.scheduler().is_armed());
    assert!(nav.history().is_none());
    assert!(nav.pool().is_none());

    assert_eq!(nav.on_tick(tick).unwrap(), None);
    assert_eq!(nav.renderer().shown.len(), 1);

    nav.stop();
    assert_eq!(nav.state(), PlaybackState::Stopped);
}

#[test]
fn single_image_pool_keeps_refreshing() {
    let mut nav = controller(4);
    let only = ImageRef::from("/photos/only.jpg");
    nav.start(vec![only.clone()]).unwrap();
    for _ in 0..5 {
        assert_eq!(nav.next().unwrap(), only);
    }
    assert_eq!(nav.renderer().shown, vec![only; 6]);
}

#[test]
fn timer_driven_playback_covers_pool_every_cycle() {
    let names = ["a", "b", "c", "d", "e"];
    let set: BTreeSet<_> = files(&names).into_iter().collect();
    let mut nav = controller(64);
    nav.start(files(&names)).unwrap();
    for _ in 0..(names.len() * 3 - 1) {
        let tick = nav.scheduler_mut().backend_mut().fire().unwrap();
        nav.on_tick(tick).unwrap();
    }

    for chunk in nav.renderer().shown.chunks(names.len()) {
        let seen: BTreeSet<_> = chunk.iter().cloned().collect();
        assert_eq!(seen, set);
    }
}

#[test]
fn renderer_failure_still_records_navigation() {
    let mut nav = NavigationController::new(settings(4), Broken { attempts: 0 }, ManualTimer::new())
        .unwrap();
    let first = nav.start(files(&["a", "b"])).unwrap();
    let second = nav.next().unwrap();

    assert_eq!(nav.renderer().attempts, 2);
    assert_eq!(nav.current_image().unwrap(), &second);
    let history: Vec<_> = nav.history().unwrap().iter().cloned().collect();
    assert_eq!(history, vec![first, second]);
    assert!(nav.scheduler().is_armed());
}

#[test]
fn restart_replaces_pool_and_history() {
    let mut nav = controller(4);
    nav.start(files(&["a", "b"])).unwrap();
    nav.next().unwrap();
    let old_tick = nav.scheduler().pending().unwrap();

    let first = nav.start(files(&["x"])).unwrap();
    assert_eq!(first, ImageRef::from("x"));
    assert_eq!(history_of(&nav), vec![ImageRef::from("x")]);
    assert_eq!(nav.on_tick(old_tick).unwrap(), None);
}

#[test]
fn start_after_stop_rebuilds_pool_and_history() {
    let mut nav = controller(4);
    nav.start(files(&["a", "b", "c"])).unwrap();
    nav.next().unwrap();
    let old_tick = nav.scheduler().pending().unwrap();

    nav.stop();
    assert_eq!(nav.state(), PlaybackState::Stopped);

    let first = nav.start(files(&["x", "y"])).unwrap();
    assert_eq!(nav.state(), PlaybackState::Playing);
    assert_eq!(history_of(&nav), vec![first.clone()]);
    assert_eq!(nav.history().unwrap().cursor(), 0);
    assert_eq!(nav.pool().unwrap().len(), 2);
    assert!(["x", "y"].map(ImageRef::from).contains(&first));

    let fresh = nav.scheduler().pending().expect("restart arms the timer");
    assert!(fresh > old_tick);
    assert_eq!(nav.scheduler().backend().pending(), Some(fresh));
    assert_eq!(nav.on_tick(old_tick).unwrap(), None);
    assert_eq!(nav.current_image().unwrap(), &first);
    assert_eq!(nav.scheduler().pending(), Some(fresh));
}

#[test]
fn failed_restart_keeps_running_session() {
    let mut nav = controller(4);
    let first = nav.start(files(&["a"])).unwrap();
    let pending = nav.scheduler().pending();

    assert_eq!(nav.start(Vec::new()).unwrap_err(), Error::EmptyPool);
    assert_eq!(nav.state(), PlaybackState::Playing);
    assert_eq!(nav.current_image().unwrap(), &first);
    assert_eq!(nav.scheduler().pending(), pending);
}

#[test]
fn disabled_history_makes_prev_a_noop() {
    let mut nav = controller(1);
    nav.start(files(&["a", "b", "c"])).unwrap();
    nav.next().unwrap();
    assert_eq!(nav.prev().unwrap(), None);
    assert_eq!(nav.history().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_timer_drives_playback() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let timer = TokioTimer::new(Handle::current(), move |tick| {
        let _ = tx.send(tick);
    });
    let settings = PlaybackSettings {
        interval: Duration::from_millis(30),
        history_length: 8,
        shuffle_seed: Some(3),
    };
    let mut nav = NavigationController::new(settings, Recorder::default(), timer).unwrap();
    nav.start(files(&["a", "b", "c"])).unwrap();

    for _ in 0..3 {
        let tick = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout waiting for tick")
            .expect("timer channel closed");
        assert!(nav.on_tick(tick).unwrap().is_some());
    }
    assert_eq!(nav.renderer().shown.len(), 4);

    nav.stop();
    let none = tokio::time::timeout(Duration::from_millis(150), rx.recv()).await;
    assert!(none.is_err(), "stopped playback must not tick");
}
