//! Bookkeeping between autofocus triggers and the AF state reported in
//! capture results.
//!
//! Several requests can overlap (a tap while the loop's cycle is still
//! scanning) and every one of them gets its own completion. In AF auto mode
//! the reported state stays locked from the previous cycle until the new
//! trigger starts a scan, so a lock only counts once a scan has been seen
//! after the latest trigger.

use super::{CameraEvent, FocusOrigin};

// android.hardware.camera2.CameraMetadata CONTROL_AF_STATE values
pub const AF_STATE_PASSIVE_SCAN: u8 = 1;
pub const AF_STATE_ACTIVE_SCAN: u8 = 3;
pub const AF_STATE_FOCUSED_LOCKED: u8 = 4;
pub const AF_STATE_NOT_FOCUSED_LOCKED: u8 = 5;

/// Results to wait for a scan before a lock is taken as the answer. Some
/// devices lock again without ever reporting the scan.
const SCAN_GRACE_RESULTS: u32 = 30;

#[derive(Debug, Default)]
pub struct FocusTracker {
    pending: Vec<FocusOrigin>,
    scanned: bool,
    results_since_trigger: u32,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// A trigger was sent on behalf of `origin`.
    pub fn trigger(&mut self, origin: FocusOrigin) {
        if !self.pending.contains(&origin) {
            self.pending.push(origin);
        }
        self.scanned = false;
        self.results_since_trigger = 0;
    }

    /// Feed the AF state of one capture result. Returns a completion for
    /// every waiting origin once the cycle started by the last trigger ends.
    pub fn observe(&mut self, af_state: u8) -> Vec<CameraEvent> {
        if self.pending.is_empty() {
            return vec![];
        }
        self.results_since_trigger = self.results_since_trigger.saturating_add(1);
        let success = match af_state {
            AF_STATE_ACTIVE_SCAN | AF_STATE_PASSIVE_SCAN => {
                self.scanned = true;
                return vec![];
            }
            AF_STATE_FOCUSED_LOCKED => true,
            AF_STATE_NOT_FOCUSED_LOCKED => false,
            _ => return vec![],
        };
        if !self.scanned && self.results_since_trigger <= SCAN_GRACE_RESULTS {
            return vec![];
        }
        self.complete_all(success)
    }

    /// The trigger or its capture failed: every waiting origin completes
    /// unsuccessfully.
    pub fn fail(&mut self) -> Vec<CameraEvent> {
        self.complete_all(false)
    }

    /// Streaming stopped; nothing will complete.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.scanned = false;
    }

    fn complete_all(&mut self, success: bool) -> Vec<CameraEvent> {
        self.scanned = false;
        self.pending
            .drain(..)
            .map(|origin| CameraEvent::AutofocusCompleted { origin, success })
            .collect()
    }
}
