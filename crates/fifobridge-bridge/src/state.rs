use std::fmt;

/// Lifecycle of the bridge loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Pipe created, loop not started.
    Idle,
    /// Waiting for a consumer and opening the transport.
    Acquiring,
    /// Forwarding records.
    Streaming,
    /// Tearing down the pipe writer and transport after a failure.
    Draining,
    /// Terminal.
    ShuttingDown,
}

impl BridgeState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: BridgeState) -> bool {
        use BridgeState::*;

        match (self, next) {
            (ShuttingDown, _) => false,
            (_, ShuttingDown) => true,
            (Idle, Acquiring)
            | (Acquiring, Streaming)
            | (Streaming, Draining)
            | (Draining, Acquiring) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BridgeState::Idle => "idle",
            BridgeState::Acquiring => "acquiring",
            BridgeState::Streaming => "streaming",
            BridgeState::Draining => "draining",
            BridgeState::ShuttingDown => "shutting-down",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
