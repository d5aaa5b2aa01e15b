//! Hub tuning knobs.

/// Configuration for the hub actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each of the actor's three command channels.
    pub command_capacity: usize,

    /// Capacity of every client's outbound queue. A client that falls
    /// this far behind is dropped.
    pub outbound_capacity: usize,

    /// Whether a frame is also delivered back to the connection it came
    /// from.
    pub echo_to_sender: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            outbound_capacity: 64,
            echo_to_sender: true,
        }
    }
}
