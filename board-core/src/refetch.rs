//! Refetch coalescing for the reconciliation path.
//!
//! Every remote change notification is answered with a silent full-board
//! refetch. The gate guarantees at most one refetch is in flight: a request
//! arriving mid-flight queues exactly one follow-up, and further requests
//! while one is queued are absorbed - the follow-up's authoritative snapshot
//! covers them all.

/// Coalescing gate - NO I/O, just the in-flight/queued bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefetchGate {
    /// No refetch in flight.
    #[default]
    Idle,
    /// One refetch in flight, nothing queued.
    InFlight,
    /// One refetch in flight and one follow-up queued.
    InFlightQueued,
}

/// What the caller should do with an incoming refetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchDecision {
    /// Start a refetch now.
    Start,
    /// A refetch already covers this request; do nothing.
    Coalesced,
}

/// What the caller should do when the in-flight refetch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchFollowUp {
    /// A follow-up was queued while the refetch ran; start it now.
    Start,
    /// Nothing queued; the gate is idle again.
    Done,
}

impl RefetchGate {
    /// Create an idle gate.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Register a refetch request (a remote event arrived).
    pub fn request(&mut self) -> RefetchDecision {
        match self {
            Self::Idle => {
                *self = Self::InFlight;
                RefetchDecision::Start
            }
            Self::InFlight => {
                *self = Self::InFlightQueued;
                RefetchDecision::Coalesced
            }
            Self::InFlightQueued => RefetchDecision::Coalesced,
        }
    }

    /// Register completion of the in-flight refetch (success or failure -
    /// a failed refetch leaves the store at its last known-good state and
    /// is retried by the queued follow-up or the next remote event).
    pub fn complete(&mut self) -> RefetchFollowUp {
        match self {
            Self::InFlightQueued => {
                *self = Self::InFlight;
                RefetchFollowUp::Start
            }
            _ => {
                *self = Self::Idle;
                RefetchFollowUp::Done
            }
        }
    }

    /// Whether a refetch is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Drop any in-flight/queued bookkeeping (teardown).
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }
}
