//! Producer task: walks a frame source and keeps the playback queue topped up
//! to its target depth.

use crossbeam_channel::Sender;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::frame::{FrameContent, QueuedFrame};
use crate::generators::Generator;

/// How long the producer waits before re-checking queue depth.
const REARM: Duration = Duration::from_millis(100);

/// Sequence traversal order once the end is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPolicy {
    #[default]
    Loop,
    BackAndForth,
    Once,
}

/// Where queued frames come from: a pre-rendered sequence walked under a loop
/// policy, or a streaming generator asked for one frame at a time.
pub enum FrameSource {
    Sequence {
        frames: Vec<QueuedFrame>,
        pos: usize,
        direction: isize,
        policy: LoopPolicy,
        exhausted: bool,
    },
    Streaming(Generator),
}

impl FrameSource {
    pub fn sequence(frames: Vec<QueuedFrame>, policy: LoopPolicy) -> Self {
        let exhausted = frames.is_empty();
        Self::Sequence {
            frames,
            pos: 0,
            direction: 1,
            policy,
            exhausted,
        }
    }

    pub fn streaming(generator: Generator) -> Self {
        Self::Streaming(generator)
    }

    /// Next frame to enqueue. `None` means the source is spent: an empty or
    /// `Once`-exhausted sequence, or a sequence that just emitted a frame
    /// held forever (nothing after it would ever be shown).
    pub fn next(&mut self) -> Option<QueuedFrame> {
        match self {
            FrameSource::Streaming(generator) => {
                let (elements, duration_ms) = generator.next_raw()?;
                Some(QueuedFrame {
                    content: FrameContent::Elements(elements),
                    bright: None,
                    duration_ms,
                })
            }
            FrameSource::Sequence {
                frames,
                pos,
                direction,
                policy,
                exhausted,
            } => {
                if *exhausted || frames.is_empty() {
                    return None;
                }
                let frame = frames[*pos].clone();
                if frame.duration_ms == 0 {
                    *exhausted = true;
                    return Some(frame);
                }
                if frames.len() == 1 {
                    if *policy == LoopPolicy::Once {
                        *exhausted = true;
                    }
                    return Some(frame);
                }
                match policy {
                    LoopPolicy::Loop => {
                        *pos = (*pos + 1) % frames.len();
                    }
                    LoopPolicy::Once => {
                        if *pos + 1 >= frames.len() {
                            *exhausted = true;
                        } else {
                            *pos += 1;
                        }
                    }
                    LoopPolicy::BackAndForth => {
                        if *direction > 0 && *pos + 1 >= frames.len() {
                            *direction = -1;
                        } else if *direction < 0 && *pos == 0 {
                            *direction = 1;
                        }
                        *pos = (*pos as isize + *direction) as usize;
                    }
                }
                Some(frame)
            }
        }
    }
}

/// Fills the queue to `target_depth`, then naps and re-checks. Exits when the
/// source is spent, the consumer side vanishes, or the token fires.
pub async fn run(
    mut source: FrameSource,
    queue: Sender<QueuedFrame>,
    target_depth: usize,
    cancel: CancellationToken,
) {
    loop {
        while queue.len() < target_depth {
            if cancel.is_cancelled() {
                return;
            }
            match source.next() {
                Some(frame) => {
                    if queue.send(frame).is_err() {
                        debug!("playback queue closed, producer exiting");
                        return;
                    }
                }
                None => {
                    debug!("frame source spent, producer exiting");
                    return;
                }
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(REARM) => {}
        }
    }
}
