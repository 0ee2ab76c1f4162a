//! MIDI output plumbing: the Control Change message, the backend abstraction and the
//! [MidiPort] that owns the single open connection.

pub mod memory;
#[cfg(feature = "midir")]
pub mod midir_backend;
mod port;

pub use port::MidiPort;

use std::fmt;
use thiserror::Error;

/// Status nibble of a Control Change message.
const CONTROL_CHANGE: u8 = 0xB0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MidiError {
    #[error("could not initialize the MIDI client: {0}")]
    Init(String),
    #[error("no MIDI output port named \"{0}\"")]
    PortNotFound(String),
    #[error("could not connect to \"{device}\": {reason}")]
    Connect { device: String, reason: String },
    #[error("could not read port information: {0}")]
    PortInfo(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("close failed: {0}")]
    Close(String),
    #[error("{tag} {value} does not fit a Control Change")]
    InvalidMessage { tag: &'static str, value: u32 },
}

/// A MIDI Control Change message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlChange {
    channel: u8,
    control: u8,
    value: u8,
}

impl ControlChange {
    /// # Arguments
    /// * `channel` - in `[0, 15]`.
    /// * `control` - controller number, in `[0, 127]`.
    /// * `value` - in `[0, 127]`.
    pub fn new(channel: u32, control: u32, value: u32) -> Result<Self, MidiError> {
        Ok(Self {
            channel: data_byte("channel", channel, 0x0F)?,
            control: data_byte("control", control, 0x7F)?,
            value: data_byte("value", value, 0x7F)?,
        })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// The wire representation: status byte, controller number, value.
    pub fn to_bytes(&self) -> [u8; 3] {
        [CONTROL_CHANGE | self.channel, self.control, self.value]
    }
}

impl fmt::Display for ControlChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "control_change channel={} control={} value={}",
            self.channel, self.control, self.value
        )
    }
}

fn data_byte(tag: &'static str, value: u32, max: u8) -> Result<u8, MidiError> {
    u8::try_from(value)
        .ok()
        .filter(|byte| *byte <= max)
        .ok_or(MidiError::InvalidMessage { tag, value })
}

/// An open output connection.
pub trait MidiConnection: Send {
    fn send(&mut self, message: &ControlChange) -> Result<(), MidiError>;

    /// Closes the connection. The connection is gone even when an error is returned.
    fn close(self: Box<Self>) -> Result<(), MidiError>;
}

/// Access to the MIDI output ports of the host.
pub trait MidiBackend: Send + Sync {
    /// Names of the output ports available right now.
    fn port_names(&self) -> Result<Vec<String>, MidiError>;

    /// Opens the output port called `device`.
    fn open(&self, device: &str) -> Result<Box<dyn MidiConnection>, MidiError>;
}
