use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::unbounded;
use image::{Rgb, RgbImage};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use rust_led_sign::driver::MockSign;
use rust_led_sign::frame::{FrameContent, QueuedFrame};
use rust_led_sign::reshape::Topology;
use rust_led_sign::tasks::playback::{self, PlaybackShared};
use rust_led_sign::tasks::producer::{self, FrameSource, LoopPolicy};

fn queued(tag: u8, duration_ms: u64) -> QueuedFrame {
    QueuedFrame {
        content: FrameContent::Image(RgbImage::from_pixel(8, 8, Rgb([tag, 0, 0]))),
        bright: None,
        duration_ms,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn playback_drains_queued_frames() {
    let (tx, rx) = unbounded();
    let mock = MockSign::new();
    let shared = PlaybackShared::new(Topology::Plain);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(playback::run(
        rx,
        Box::new(mock.clone()),
        shared.clone(),
        cancel.clone(),
    ));

    for n in 0..3 {
        tx.send(queued(n, 10)).unwrap();
    }
    sleep(Duration::from_millis(500)).await;
    assert_eq!(mock.frames_shown(), 3);
    assert!(shared.last_frame().is_some());

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stopped_playback_shows_nothing() {
    let (tx, rx) = unbounded();
    let mock = MockSign::new();
    let shared = PlaybackShared::new(Topology::Plain);
    shared.running.store(false, Ordering::SeqCst);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(playback::run(
        rx,
        Box::new(mock.clone()),
        shared.clone(),
        cancel.clone(),
    ));

    tx.send(queued(1, 10)).unwrap();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.frames_shown(), 0);

    // Frames stay queued while stopped and play once restarted.
    shared.running.store(true, Ordering::SeqCst);
    sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.frames_shown(), 1);

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn held_frame_pins_until_epoch_moves() {
    let (tx, rx) = unbounded();
    let mock = MockSign::new();
    let shared = PlaybackShared::new(Topology::Plain);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(playback::run(
        rx,
        Box::new(mock.clone()),
        shared.clone(),
        cancel.clone(),
    ));

    // A zero-duration frame is shown once and never auto-advances.
    tx.send(queued(1, 0)).unwrap();
    tx.send(queued(2, 10)).unwrap();
    sleep(Duration::from_millis(400)).await;
    assert_eq!(mock.frames_shown(), 1);

    // Reconfiguration bumps the epoch, releasing the hold.
    shared.epoch.fetch_add(1, Ordering::SeqCst);
    sleep(Duration::from_millis(400)).await;
    assert_eq!(mock.frames_shown(), 2);

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn producer_caps_the_queue_at_target_depth() {
    let (tx, rx) = unbounded();
    let source = FrameSource::sequence(vec![queued(1, 10), queued(2, 10)], LoopPolicy::Loop);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(producer::run(source, tx, 20, cancel.clone()));

    sleep(Duration::from_millis(300)).await;
    assert_eq!(rx.len(), 20);

    // Nobody consuming: depth never grows past the target.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(rx.len(), 20);

    // Consuming makes room; the producer tops the queue back up.
    for _ in 0..5 {
        rx.recv_timeout(Duration::from_millis(100)).unwrap();
    }
    sleep(Duration::from_millis(300)).await;
    assert_eq!(rx.len(), 20);

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn once_producer_stops_after_one_pass() {
    let (tx, rx) = unbounded();
    let source = FrameSource::sequence(
        vec![queued(1, 10), queued(2, 10), queued(3, 10)],
        LoopPolicy::Once,
    );
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(producer::run(source, tx, 20, cancel.clone()));

    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert_eq!(rx.len(), 3);
}
