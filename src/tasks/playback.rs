//! Playback task: pops frames from the queue on a drift-free schedule and
//! pushes them through the wiring topology to the driver.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, TryRecvError};
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::driver::SignDriver;
use crate::frame::{FrameContent, QueuedFrame};
use crate::reshape::{OutputFrame, Topology};

/// Poll interval while idle, stopped, or holding a terminal frame.
const IDLE_TICK: Duration = Duration::from_millis(50);

/// State shared between the playback task and its controller.
#[derive(Debug)]
pub struct PlaybackShared {
    /// Most recently displayed frame, kept for screenshots.
    pub held: Mutex<Option<QueuedFrame>>,
    /// When false the scheduler shows nothing new; the current frame stays up.
    pub running: AtomicBool,
    /// Bumped on every reconfiguration. A frame held forever is pinned to the
    /// epoch it was shown under and is released only when the epoch moves.
    pub epoch: AtomicU64,
    /// Current wiring topology; replaced in place on reconfiguration.
    pub topology: Mutex<Topology>,
}

impl PlaybackShared {
    pub fn new(topology: Topology) -> Arc<Self> {
        Arc::new(Self {
            held: Mutex::new(None),
            running: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
            topology: Mutex::new(topology),
        })
    }

    pub fn last_frame(&self) -> Option<QueuedFrame> {
        self.held.lock().ok().and_then(|h| h.clone())
    }
}

/// Scheduling loop. Deadlines advance by each frame's duration rather than
/// being re-anchored at wakeup, so timing error does not accumulate; a
/// deadline already in the past clamps to "now" instead of fast-forwarding.
pub async fn run(
    queue: Receiver<QueuedFrame>,
    mut driver: Box<dyn SignDriver>,
    shared: Arc<PlaybackShared>,
    cancel: CancellationToken,
) {
    let mut deadline = Instant::now();
    let mut holding_epoch: Option<u64> = None;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("playback task cancelled");
                return;
            }
            _ = sleep_until(deadline) => {}
        }
        let now = Instant::now();
        let epoch = shared.epoch.load(Ordering::SeqCst);

        if let Some(pinned) = holding_epoch {
            if pinned == epoch {
                deadline = now + IDLE_TICK;
                continue;
            }
            holding_epoch = None;
        }
        if !shared.running.load(Ordering::SeqCst) {
            deadline = now + IDLE_TICK;
            continue;
        }

        match queue.try_recv() {
            Ok(frame) => {
                let output = match &frame.content {
                    FrameContent::Image(image) => match shared.topology.lock() {
                        Ok(topology) => topology.reshape(image),
                        Err(_) => {
                            warn!("topology lock poisoned, playback exiting");
                            return;
                        }
                    },
                    FrameContent::Elements(elements) => OutputFrame::Disc(elements.clone()),
                };
                if let Err(err) = driver.show(&output) {
                    warn!("driver rejected frame: {err:#}");
                }
                let duration_ms = frame.duration_ms;
                if let Ok(mut held) = shared.held.lock() {
                    *held = Some(frame);
                }
                if duration_ms == 0 {
                    holding_epoch = Some(epoch);
                    deadline = now + IDLE_TICK;
                } else {
                    deadline += Duration::from_millis(duration_ms);
                    if deadline < now {
                        deadline = now;
                    }
                }
            }
            Err(TryRecvError::Empty) => {
                deadline = now + IDLE_TICK;
            }
            Err(TryRecvError::Disconnected) => {
                debug!("playback queue disconnected, task exiting");
                return;
            }
        }
    }
}
