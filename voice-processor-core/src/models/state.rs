/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → starting → capturing → stopping → idle
///           │            │
///           └────────────┴── device fault ──→ idle
/// ```
/// A worker thread exists whenever the state is not `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Starting,
    Capturing,
    Stopping,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether a capture worker owns (or is about to own) the device.
    pub fn has_worker(&self) -> bool {
        !self.is_idle()
    }

    /// Whether a stop request would still have an effect on the worker.
    pub fn accepts_stop(&self) -> bool {
        matches!(self, Self::Starting | Self::Capturing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Capturing => "capturing",
            Self::Stopping => "stopping",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
