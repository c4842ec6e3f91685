//! Boundary to the physical display driver. The electrical side is external;
//! this crate only ever hands a finished [`OutputFrame`] across this trait.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::reshape::OutputFrame;

pub trait SignDriver: Send {
    fn show(&mut self, frame: &OutputFrame) -> Result<()>;
}

/// In-memory stand-in for the matrix/disc hardware, used by tests and when
/// running without a display attached.
#[derive(Debug, Default)]
pub struct MockState {
    pub frames_shown: u64,
    pub last: Option<OutputFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct MockSign {
    state: Arc<Mutex<MockState>>,
}

impl MockSign {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for inspecting what the sign displayed.
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    pub fn frames_shown(&self) -> u64 {
        self.state.lock().map(|s| s.frames_shown).unwrap_or(0)
    }

    pub fn last_frame(&self) -> Option<OutputFrame> {
        self.state.lock().ok().and_then(|s| s.last.clone())
    }
}

impl SignDriver for MockSign {
    fn show(&mut self, frame: &OutputFrame) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("mock sign state poisoned"))?;
        state.frames_shown += 1;
        state.last = Some(frame.clone());
        Ok(())
    }
}
