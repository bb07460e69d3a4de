use crate::error::TaskError;
use crate::process::ProcessContext;

/// User logic driven by a [`Process`](super::Process).
///
/// `process` returns the theoretical time of its next call, or `None` to end the process.
/// Errors end the process too; `on_end` still runs.
///
/// ## Example
/// ```rust
/// use ticktask::{ProcessContext, ProcessLogic, TaskError};
///
/// struct Heartbeat {
///     period_ns: i64,
///     beats: u64,
/// }
///
/// impl ProcessLogic for Heartbeat {
///     fn process(
///         &mut self,
///         _cx: &mut ProcessContext,
///         theoretical_ns: i64,
///         _actual_ns: i64,
///     ) -> Result<Option<i64>, TaskError> {
///         self.beats += 1;
///         Ok(Some(theoretical_ns + self.period_ns))
///     }
/// }
/// ```
pub trait ProcessLogic: Send + 'static {
    /// Called once per started cycle, before the first `process`.
    fn on_begin(&mut self, _cx: &mut ProcessContext) -> Result<(), TaskError> {
        Ok(())
    }

    fn process(
        &mut self,
        cx: &mut ProcessContext,
        theoretical_ns: i64,
        actual_ns: i64,
    ) -> Result<Option<i64>, TaskError>;

    /// Called once per cycle whose `on_begin` ran, however the cycle ended.
    fn on_end(&mut self, _cx: &mut ProcessContext) -> Result<(), TaskError> {
        Ok(())
    }
}
