/// Per-call view handed to [`ProcessLogic`](super::ProcessLogic) hooks.
///
/// Carries the times of the current run and collects a stop request, which takes effect
/// once the hook returns.
#[derive(Debug)]
pub struct ProcessContext {
    theoretical_ns: i64,
    actual_ns: i64,
    stop: bool,
}

impl ProcessContext {
    pub(crate) fn new(theoretical_ns: i64, actual_ns: i64) -> Self {
        Self {
            theoretical_ns,
            actual_ns,
            stop: false,
        }
    }

    /// Theoretical time of the current run, in nanoseconds.
    pub fn theoretical_time_ns(&self) -> i64 {
        self.theoretical_ns
    }

    /// Clock time at which the current run started, in nanoseconds.
    pub fn actual_time_ns(&self) -> i64 {
        self.actual_ns
    }

    /// Asks the process to stop after this hook; `on_end` follows.
    ///
    /// Has no effect from `on_end`.
    pub fn stop(&mut self) {
        self.stop = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop
    }
}
