//! Self-rescheduling autofocus.
//!
//! Every completed focus cycle schedules the next request after a fixed
//! delay. The delayed request only fires while the preview is running, so
//! the loop stops by itself once a result is on screen and has to be kicked
//! again when scanning resumes. There is no cancellation: a request already
//! in flight still completes.

use crate::scanner::PreviewState;

#[derive(Debug, Default, Clone)]
pub struct AutofocusLoop {
    in_flight: bool,
    pending: bool,
}

impl AutofocusLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Start or resume the loop. Returns whether a focus request should be
    /// issued now; a cycle that is already in flight or waiting for its
    /// delay keeps the loop alive on its own.
    pub fn kick(&mut self) -> bool {
        if self.in_flight || self.pending {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// A loop cycle finished, successfully or not. Returns whether the next
    /// request should be scheduled.
    pub fn complete(&mut self) -> bool {
        if !self.in_flight {
            // completion of a request issued before the last reset
            return false;
        }
        self.in_flight = false;
        self.pending = true;
        true
    }

    /// The scheduled delay elapsed. Returns whether to request focus now.
    pub fn due(&mut self, state: PreviewState) -> bool {
        self.pending = false;
        if state != PreviewState::Previewing || self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// The preview stopped; forget the cycle in flight.
    pub fn reset(&mut self) {
        self.in_flight = false;
    }
}
