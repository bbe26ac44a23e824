// Live bridge state. Owned by the interactive loop and never persisted.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct RuntimeState {
    pub last_observed: u8, // Value that caused the most recent transition
    pub channel_value: u8, // Most recent sample of the watched channel
    pub receiving: bool,   // Between a change and the next timeout
}

impl RuntimeState {
    pub fn link(&self) -> LinkState {
        if self.receiving {
            LinkState::Receiving
        } else {
            LinkState::Idle
        }
    }
}

// Receive indicator shown in the status row
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LinkState {
    Idle,      // No data, or the universe timed out
    Receiving, // Frames are arriving for the configured universe
}
