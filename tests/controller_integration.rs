use std::io::Cursor;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Rgb, RgbImage};
use tokio::time::sleep;

use rust_led_sign::config::SignSettings;
use rust_led_sign::controller::SignController;
use rust_led_sign::driver::MockSign;
use rust_led_sign::frame::{Frame, FrameSequence};
use rust_led_sign::transition::{Transition, TransitionOptions};

fn sequence(durations_ms: &[u64]) -> FrameSequence {
    durations_ms
        .iter()
        .enumerate()
        .map(|(n, &ms)| Frame::new(RgbImage::from_pixel(32, 32, Rgb([n as u8 * 50, 0, 0])), ms))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequences_play_and_loop() {
    let mock = MockSign::new();
    let mut controller =
        SignController::new(SignSettings::default(), Box::new(mock.clone())).unwrap();

    controller.set_frames(sequence(&[20, 20, 20])).await.unwrap();
    sleep(Duration::from_millis(600)).await;
    // Looping: more frames shown than the sequence holds.
    assert!(mock.frames_shown() > 3, "shown {}", mock.frames_shown());

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_freezes_playback_and_start_resumes() {
    let mock = MockSign::new();
    let mut controller =
        SignController::new(SignSettings::default(), Box::new(mock.clone())).unwrap();
    controller.set_frames(sequence(&[20, 20])).await.unwrap();
    sleep(Duration::from_millis(300)).await;

    controller.stop();
    sleep(Duration::from_millis(200)).await;
    let frozen = mock.frames_shown();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.frames_shown(), frozen);

    controller.start();
    sleep(Duration::from_millis(300)).await;
    assert!(mock.frames_shown() > frozen);

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn held_image_survives_until_reconfigured() {
    let mock = MockSign::new();
    let mut controller =
        SignController::new(SignSettings::default(), Box::new(mock.clone())).unwrap();

    controller
        .set_image(RgbImage::from_pixel(32, 32, Rgb([0, 200, 0])))
        .await
        .unwrap();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.frames_shown(), 1);
    sleep(Duration::from_millis(300)).await;
    // Held forever: no auto-advance, no re-show.
    assert_eq!(mock.frames_shown(), 1);

    // A new sequence replaces the held frame.
    controller.set_frames(sequence(&[20, 20])).await.unwrap();
    sleep(Duration::from_millis(300)).await;
    assert!(mock.frames_shown() > 1);

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn screenshot_encodes_png_for_stills_and_gif_for_sequences() {
    let mock = MockSign::new();
    let mut controller =
        SignController::new(SignSettings::default(), Box::new(mock.clone())).unwrap();

    controller
        .set_image(RgbImage::from_pixel(32, 32, Rgb([10, 20, 30])))
        .await
        .unwrap();
    let png = controller.screenshot().unwrap();
    assert_eq!(&png[..4], b"\x89PNG");

    controller.set_frames(sequence(&[20, 20, 20])).await.unwrap();
    let gif = controller.screenshot().unwrap();
    assert_eq!(&gif[..4], b"GIF8");

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn back_and_forth_export_mirrors_the_interior() {
    let mock = MockSign::new();
    let settings = SignSettings {
        back_and_forth: true,
        ..SignSettings::default()
    };
    let mut controller = SignController::new(settings, Box::new(mock.clone())).unwrap();

    controller.set_frames(sequence(&[20, 20, 20])).await.unwrap();
    let gif = controller.screenshot().unwrap();
    let decoded = GifDecoder::new(Cursor::new(gif))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    // Three frames plus the mirrored interior: 1 2 3 2.
    assert_eq!(decoded.len(), 4);

    controller.shutdown().await;
}

fn gif_bytes(frame_count: u8, duration_ms: u64) -> Vec<u8> {
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba, RgbaImage};

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        for n in 0..frame_count {
            let image = RgbaImage::from_pixel(8, 8, Rgba([n * 80, 0, 0, 255]));
            let delay = Delay::from_saturating_duration(Duration::from_millis(duration_ms));
            encoder
                .encode_frame(image::Frame::from_parts(image, 0, 0, delay))
                .unwrap();
        }
    }
    bytes
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gif_bytes_drive_file_mode() {
    let bytes = gif_bytes(3, 30);
    let mock = MockSign::new();
    let settings = SignSettings {
        mode: rust_led_sign::config::Mode::File,
        ..SignSettings::default()
    };
    let mut controller = SignController::new(settings, Box::new(mock.clone())).unwrap();
    controller.set_source_bytes(bytes).await.unwrap();
    sleep(Duration::from_millis(500)).await;
    assert!(mock.frames_shown() > 3);

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_stop_and_show_are_idempotent() {
    let mock = MockSign::new();
    let settings = SignSettings {
        mode: rust_led_sign::config::Mode::File,
        ..SignSettings::default()
    };
    let mut controller = SignController::new(settings, Box::new(mock.clone())).unwrap();
    controller.set_source_bytes(gif_bytes(2, 30)).await.unwrap();
    let first = controller.screenshot().unwrap();

    // Re-rendering unchanged settings yields the same content, and the
    // second install leaves nothing stale behind.
    controller.show().await.unwrap();
    controller.show().await.unwrap();
    assert_eq!(controller.screenshot().unwrap(), first);
    sleep(Duration::from_millis(400)).await;
    assert!(mock.frames_shown() > 2);

    // stop() twice behaves like stop() once.
    controller.stop();
    controller.stop();
    sleep(Duration::from_millis(200)).await;
    let frozen = mock.frames_shown();
    let held = mock.last_frame();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.frames_shown(), frozen);
    match (held, mock.last_frame()) {
        (Some(rust_led_sign::reshape::OutputFrame::Panel(a)),
         Some(rust_led_sign::reshape::OutputFrame::Panel(b))) => assert_eq!(a, b),
        other => panic!("expected matching panel frames, got {other:?}"),
    }

    controller.start();
    sleep(Duration::from_millis(300)).await;
    assert!(mock.frames_shown() > frozen);

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transition_bridges_old_and_new_content() {
    let mock = MockSign::new();
    let settings = SignSettings {
        transition: TransitionOptions {
            kind: Transition::Fade,
            duration_ms: 80,
            max_frames: 4,
        },
        ..SignSettings::default()
    };
    let mut controller = SignController::new(settings, Box::new(mock.clone())).unwrap();

    // Nothing displayed yet: the first install has no transition.
    controller
        .set_image(RgbImage::from_pixel(32, 32, Rgb([255, 0, 0])))
        .await
        .unwrap();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.frames_shown(), 1);

    // Replacing content bridges with max-frames - 1 intermediates.
    controller
        .set_image(RgbImage::from_pixel(32, 32, Rgb([0, 255, 0])))
        .await
        .unwrap();
    sleep(Duration::from_millis(500)).await;
    assert_eq!(mock.frames_shown(), 5);

    // Exports never include transition frames.
    let png = controller.screenshot().unwrap();
    assert_eq!(&png[..4], b"\x89PNG");

    controller.shutdown().await;
}
