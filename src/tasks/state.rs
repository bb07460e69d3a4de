//! # Task status.
//!
//! ```text
//! Pending ──run──► OnBegin ──► Running ──(next time)──► Repeating ──run──► Running ...
//!    │                │           │                         │
//!    │ cancel         │ fail /    │ no next time /          │ cancel
//!    │                │ cancel    │ cancel / fail           │
//!    ▼                ▼           ▼                         ▼
//!  OnEnd ◄────────────┴───────────┴─────────────────────────┘
//!    │
//!    ▼
//!  OnDone ──► Done
//! ```

/// Lifecycle status of a task. Exactly one value holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Constructed, never run.
    Pending,
    /// `on_begin` is executing.
    OnBegin,
    /// The body is executing.
    Running,
    /// Requested another run and waits for it.
    Repeating,
    /// `on_end` is executing.
    OnEnd,
    /// `on_done` is executing.
    OnDone,
    /// Terminated; no hook will ever run again.
    Done,
}

impl Status {
    /// True while one of the hooks is executing.
    pub fn is_in_hook(&self) -> bool {
        matches!(
            self,
            Status::OnBegin | Status::Running | Status::OnEnd | Status::OnDone
        )
    }

    /// True once `on_end` has begun, through and including `Done`.
    pub fn is_terminating_or_done(&self) -> bool {
        matches!(self, Status::OnEnd | Status::OnDone | Status::Done)
    }
}

/// Outcome of one execution of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The task wants to run again at `at_ns` (theoretical time).
    Repeat {
        /// Requested next theoretical time.
        at_ns: i64,
    },
    /// The task terminated.
    Done,
}

/// Mutable state shared between the driver and the context handed to hooks.
#[derive(Debug)]
pub(crate) struct Cell {
    pub(crate) status: Status,
    pub(crate) cancel_requested: bool,
    pub(crate) cancelled: bool,
    pub(crate) next_ns: Option<i64>,
    pub(crate) theoretical_ns: i64,
    pub(crate) actual_ns: i64,
}

impl Cell {
    pub(crate) fn new() -> Self {
        Self {
            status: Status::Pending,
            cancel_requested: false,
            cancelled: false,
            next_ns: None,
            theoretical_ns: 0,
            actual_ns: 0,
        }
    }

    /// Enters the termination sequence. Must be called under the cell lock by whoever
    /// owns the transition.
    pub(crate) fn claim_termination(&mut self) {
        self.status = Status::OnEnd;
        self.cancelled = self.cancel_requested;
    }
}
