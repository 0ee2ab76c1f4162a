//! An in-process MIDI backend that records what it is sent.
//!
//! Handy for running the LFO without any MIDI hardware and for checking its output. Failures of
//! every operation can be switched on to exercise the error paths.

use crate::lock;
use crate::midi::{ControlChange, MidiBackend, MidiConnection, MidiError};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MemoryState {
    ports: Vec<String>,
    sent: Vec<(String, ControlChange)>,
    open_connections: usize,
    fail_sends: bool,
    fail_close: bool,
}

/// A backend whose ports are plain names and whose output is kept in memory.
///
/// Clones share the same state, so a test can keep one handle while the LFO owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new(ports: &[&str]) -> Self {
        let state = MemoryState {
            ports: ports.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Every message sent so far, through any port, in order.
    pub fn sent(&self) -> Vec<ControlChange> {
        lock(&self.state)
            .sent
            .iter()
            .map(|(_, message)| *message)
            .collect()
    }

    /// The messages sent through the port called `device`.
    pub fn sent_to(&self, device: &str) -> Vec<ControlChange> {
        lock(&self.state)
            .sent
            .iter()
            .filter(|(port, _)| port == device)
            .map(|(_, message)| *message)
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.state).sent.clear();
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> usize {
        lock(&self.state).open_connections
    }

    pub fn add_port(&self, name: &str) {
        lock(&self.state).ports.push(name.to_string());
    }

    pub fn remove_port(&self, name: &str) {
        lock(&self.state).ports.retain(|port| port != name);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        lock(&self.state).fail_sends = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        lock(&self.state).fail_close = fail;
    }
}

impl MidiBackend for MemoryBackend {
    fn port_names(&self) -> Result<Vec<String>, MidiError> {
        Ok(lock(&self.state).ports.clone())
    }

    fn open(&self, device: &str) -> Result<Box<dyn MidiConnection>, MidiError> {
        let mut state = lock(&self.state);
        if !state.ports.iter().any(|port| port == device) {
            return Err(MidiError::PortNotFound(device.to_string()));
        }
        state.open_connections += 1;

        Ok(Box::new(MemoryConnection {
            device: device.to_string(),
            state: self.state.clone(),
        }))
    }
}

struct MemoryConnection {
    device: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MidiConnection for MemoryConnection {
    fn send(&mut self, message: &ControlChange) -> Result<(), MidiError> {
        let mut state = lock(&self.state);
        if state.fail_sends {
            return Err(MidiError::Send(format!("{} refused the message", self.device)));
        }
        state.sent.push((self.device.clone(), *message));
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), MidiError> {
        let mut state = lock(&self.state);
        state.open_connections = state.open_connections.saturating_sub(1);
        if state.fail_close {
            Err(MidiError::Close(format!("{} did not close cleanly", self.device)))
        } else {
            Ok(())
        }
    }
}
