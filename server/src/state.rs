//! Server lifecycle state.

/// Server operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Server is constructed but not yet serving.
    Starting,
    /// Server is receiving and processing datagrams.
    Running,
    /// Receive loop stopped, in-flight transfers draining.
    ShuttingDown,
    /// Server is stopped.
    Stopped,
}

impl ServerState {
    /// Check if the server is accepting new datagrams.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, ServerState::Running)
    }
}
