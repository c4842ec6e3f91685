//! Central coordinator. Owns the playback task for the life of the process
//! and swaps producer tasks whenever the content changes. Reconfiguration is
//! synchronous from the caller's view: by the time a `show` or settings call
//! returns, the old producer is gone and the queue holds only new content.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use image::{ImageFormat, RgbImage};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Mode, SignSettings};
use crate::disc::RingLayout;
use crate::driver::SignDriver;
use crate::error::Error;
use crate::export;
use crate::filter;
use crate::frame::{BrightnessMask, Frame, FrameContent, FrameSequence, QueuedFrame};
use crate::generators::{
    AnimatedFileGenerator, FileGenerator, Generator, PatternGenerator, TextGenerator,
};
use crate::reshape::Topology;
use crate::tasks::playback::{self, PlaybackShared};
use crate::tasks::producer::{self, FrameSource, LoopPolicy};
use crate::transform::TransformOptions;
use crate::transition;

pub struct SignController {
    settings: SignSettings,
    transform: TransformOptions,
    mask: Option<BrightnessMask>,

    queue_tx: Sender<QueuedFrame>,
    queue_rx: Receiver<QueuedFrame>,
    shared: Arc<PlaybackShared>,
    playback_cancel: CancellationToken,
    playback_handle: Option<JoinHandle<()>>,
    producer_cancel: Option<CancellationToken>,
    producer_handle: Option<JoinHandle<()>>,

    text_gen: Option<TextGenerator>,
    /// Last explicitly installed image; doubles as the base for effects.
    image: Option<RgbImage>,
    source_bytes: Option<Vec<u8>>,
    /// Full-brightness twins of the last installed sequence, for export.
    export_frames: Vec<(RgbImage, u64)>,
}

impl SignController {
    /// Spawns the playback task. Must be called on a tokio runtime.
    pub fn new(settings: SignSettings, driver: Box<dyn SignDriver>) -> Result<Self> {
        settings.validate()?;
        let topology = settings.topology()?;
        let transform = settings.transform_options();
        let (queue_tx, queue_rx) = unbounded();
        let shared = PlaybackShared::new(topology);
        let playback_cancel = CancellationToken::new();
        let playback_handle = tokio::spawn(playback::run(
            queue_rx.clone(),
            driver,
            Arc::clone(&shared),
            playback_cancel.clone(),
        ));
        info!(
            rows = settings.rows,
            cols = settings.cols,
            mode = ?settings.mode,
            "sign controller started"
        );
        Ok(Self {
            settings,
            transform,
            mask: None,
            queue_tx,
            queue_rx,
            shared,
            playback_cancel,
            playback_handle: Some(playback_handle),
            producer_cancel: None,
            producer_handle: None,
            text_gen: None,
            image: None,
            source_bytes: None,
            export_frames: Vec::new(),
        })
    }

    pub fn settings(&self) -> &SignSettings {
        &self.settings
    }

    pub fn shared(&self) -> Arc<PlaybackShared> {
        Arc::clone(&self.shared)
    }

    /// Selects the generator for the configured mode, renders it, and
    /// installs the result.
    pub async fn show(&mut self) -> Result<()> {
        let Some(generator) = self.mode_generator()? else {
            return Ok(());
        };
        if generator.is_streaming() {
            self.export_frames.clear();
            self.install(Vec::new(), FrameSource::streaming(generator))
                .await;
            return Ok(());
        }
        let mut frames = generator.render();
        filter::apply(self.settings.filter, &mut frames);
        self.install_sequence(frames, self.settings.loop_policy())
            .await
    }

    /// Installs an explicit pre-built sequence, bypassing mode dispatch.
    pub async fn set_frames(&mut self, frames: FrameSequence) -> Result<()> {
        self.install_sequence(frames, self.settings.loop_policy())
            .await
    }

    /// Installs a still image and remembers it as the base for effect modes.
    pub async fn set_image(&mut self, image: RgbImage) -> Result<()> {
        self.image = Some(image.clone());
        self.install_sequence(vec![Frame::held(image)], LoopPolicy::Once)
            .await
    }

    /// Stores raw asset bytes; re-renders immediately when the current mode
    /// consumes them.
    pub async fn set_source_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.source_bytes = Some(bytes);
        if self.settings.mode == Mode::File {
            return self.show().await;
        }
        Ok(())
    }

    /// Applies or clears the per-pixel brightness mask, then re-renders.
    pub async fn set_brightness_mask(&mut self, mask: Option<BrightnessMask>) -> Result<()> {
        self.mask = mask;
        self.show().await
    }

    /// Halts playback; the frame currently on the sign stays up and the queue
    /// keeps its contents.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        debug!("playback stopped");
    }

    pub fn start(&self) {
        self.shared.running.store(true, Ordering::SeqCst);
        debug!("playback started");
    }

    /// Replaces the settings wholesale and re-renders the configured mode.
    pub async fn update_settings(&mut self, settings: SignSettings) -> Result<()> {
        settings.validate()?;
        let topology = settings.topology()?;
        self.transform = settings.transform_options();
        self.settings = settings;
        self.text_gen = None;
        match self.shared.topology.lock() {
            Ok(mut current) => *current = topology,
            Err(_) => return Err(Error::Invalid("topology lock poisoned".into()).into()),
        }
        self.show().await
    }

    /// Encodes what the sign is showing at full brightness: a looping GIF for
    /// multi-frame content, a PNG otherwise.
    pub fn screenshot(&self) -> Result<Vec<u8>, Error> {
        if self.export_frames.len() > 1 {
            return export::encode_gif(&self.export_frames);
        }
        if let Some((image, _)) = self.export_frames.first() {
            return export::encode_png(image);
        }
        if let Some(frame) = self.shared.last_frame() {
            if let Some(bright) = frame.bright {
                return export::encode_png(&bright);
            }
            if let FrameContent::Image(image) = frame.content {
                return export::encode_png(&image);
            }
        }
        export::encode_png(&RgbImage::new(self.settings.cols, self.settings.rows))
    }

    /// Tears down both tasks. The controller is unusable afterwards.
    pub async fn shutdown(&mut self) {
        if let Some(cancel) = self.producer_cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.producer_handle.take() {
            let _ = handle.await;
        }
        self.playback_cancel.cancel();
        if let Some(handle) = self.playback_handle.take() {
            let _ = handle.await;
        }
        info!("sign controller shut down");
    }

    /// One `Generator` per content-mode change. `None` means the mode has
    /// nothing to show yet (file mode before any bytes arrive).
    fn mode_generator(&mut self) -> Result<Option<Generator>> {
        let generator = match self.settings.mode {
            Mode::Text => Generator::Text(self.text_generator()?),
            Mode::File => match &self.source_bytes {
                Some(bytes) => {
                    if image::guess_format(bytes).is_ok_and(|f| f == ImageFormat::Gif) {
                        Generator::AnimatedFile(AnimatedFileGenerator::new(
                            bytes.clone(),
                            self.settings.file,
                        ))
                    } else {
                        Generator::File(FileGenerator::new(bytes.clone(), self.settings.file))
                    }
                }
                None => {
                    warn!("file mode selected with no source bytes");
                    return Ok(None);
                }
            },
            Mode::Waving => Generator::Waving {
                base: self.effect_base()?,
                options: self.settings.animation,
            },
            Mode::Glitch => Generator::Glitch {
                base: self.effect_base()?,
                options: self.settings.animation,
            },
            Mode::Rainbow => Generator::Rainbow {
                base: self.effect_base()?,
                options: self.settings.animation,
            },
            Mode::Pattern => {
                let layout = match self.settings.topology()? {
                    Topology::Disc { layout, .. } => layout,
                    _ => RingLayout::stock(),
                };
                Generator::Pattern(PatternGenerator::new(layout))
            }
        };
        Ok(Some(generator))
    }

    /// Effects animate the installed image when one exists, otherwise the
    /// rendered text.
    fn effect_base(&mut self) -> Result<RgbImage> {
        match &self.image {
            Some(image) => Ok(image.clone()),
            None => Ok(self.text_generator()?.rasterize()),
        }
    }

    /// Cached text generator, restyled in place when only the style changed
    /// (the font reloads only if the font selection itself changed).
    fn text_generator(&mut self) -> Result<TextGenerator> {
        let target = (self.transform.active_cols(), self.transform.active_rows());
        if let Some(generator) = &mut self.text_gen {
            if generator.target() == target {
                if generator.style() != &self.settings.text {
                    generator
                        .set_style(self.settings.text.clone())
                        .context("restyling text")?;
                }
                return Ok(generator.clone());
            }
        }
        let generator = TextGenerator::new(self.settings.text.clone(), target.0, target.1)
            .context("loading text font")?;
        self.text_gen = Some(generator.clone());
        Ok(generator)
    }

    /// Transforms a sequence and hands it to a fresh producer. An empty
    /// sequence leaves the current content in place.
    async fn install_sequence(&mut self, frames: FrameSequence, policy: LoopPolicy) -> Result<()> {
        if frames.is_empty() {
            warn!("empty frame sequence, keeping current content");
            return Ok(());
        }
        let mut queued = Vec::with_capacity(frames.len());
        let mut export_frames = Vec::with_capacity(frames.len());
        for frame in &frames {
            let transformed = self
                .transform
                .apply(&frame.image, self.mask.as_ref())
                .context("transforming frame")?;
            export_frames.push((transformed.bright.clone(), frame.duration_ms));
            queued.push(QueuedFrame {
                content: FrameContent::Image(transformed.image),
                bright: Some(transformed.bright),
                duration_ms: frame.duration_ms,
            });
        }
        if policy == LoopPolicy::BackAndForth && export_frames.len() > 2 {
            let interior: Vec<_> = export_frames[1..export_frames.len() - 1]
                .iter()
                .rev()
                .cloned()
                .collect();
            export_frames.extend(interior);
        }
        self.export_frames = export_frames;
        let prelude = self.transition_prelude(queued.first());
        debug!(
            frames = queued.len(),
            transition_frames = prelude.len(),
            ?policy,
            "installing frame sequence"
        );
        self.install(prelude, FrameSource::sequence(queued, policy))
            .await;
        Ok(())
    }

    /// Bridge frames from whatever the sign last displayed to the incoming
    /// sequence, enqueued once ahead of it. Exports never include them.
    fn transition_prelude(&self, next: Option<&QueuedFrame>) -> Vec<QueuedFrame> {
        let Some(QueuedFrame {
            content: FrameContent::Image(next),
            ..
        }) = next
        else {
            return Vec::new();
        };
        let Some(prev) = self.shared.last_frame() else {
            return Vec::new();
        };
        let FrameContent::Image(prev) = prev.content else {
            return Vec::new();
        };
        transition::frames(&prev, next, &self.settings.transition)
            .into_iter()
            .map(|frame| QueuedFrame {
                content: FrameContent::Image(frame.image),
                bright: None,
                duration_ms: frame.duration_ms,
            })
            .collect()
    }

    /// Producer swap: cancel and await the old producer, drain the queue,
    /// advance the epoch so a held frame is released, enqueue the one-shot
    /// transition prelude, then spawn the new producer.
    async fn install(&mut self, prelude: Vec<QueuedFrame>, source: FrameSource) {
        if let Some(cancel) = self.producer_cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.producer_handle.take() {
            if let Err(err) = handle.await {
                warn!("producer task panicked: {err}");
            }
        }
        while self.queue_rx.try_recv().is_ok() {}
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);
        for frame in prelude {
            if self.queue_tx.send(frame).is_err() {
                break;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(producer::run(
            source,
            self.queue_tx.clone(),
            self.settings.queue_target_depth,
            cancel.clone(),
        ));
        self.producer_cancel = Some(cancel);
        self.producer_handle = Some(handle);
    }
}
