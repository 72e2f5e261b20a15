use std::fmt;

/// Lifecycle of the background flush task.
///
/// Transitions only move forward: `Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    /// Periodic passes are being scheduled.
    Running,
    /// Shutdown received; the final pass is in progress.
    Draining,
    /// Final pass done. The durable store may be released.
    Stopped,
}

impl fmt::Display for FlushState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushState::Running => "running",
            FlushState::Draining => "draining",
            FlushState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Outcome of a single flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Keys written and marked clean.
    pub flushed: usize,
    /// Keys whose write failed; they stay dirty for the next pass.
    pub failed: usize,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
