//! Real MIDI output through [midir](https://docs.rs/midir).

use crate::midi::{ControlChange, MidiBackend, MidiConnection, MidiError};
use midir::{MidiOutput, MidiOutputConnection};
use simplelog::debug;

/// Name of the output connection, shown by some hosts next to the client name.
const CONNECTION_NAME: &str = "lfo-out";

/// Opens the host MIDI output ports. A fresh client is created per call, as midir consumes
/// the client when connecting.
pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
        }
    }

    fn client(&self) -> Result<MidiOutput, MidiError> {
        MidiOutput::new(&self.client_name).map_err(|e| MidiError::Init(e.to_string()))
    }
}

impl MidiBackend for MidirBackend {
    fn port_names(&self) -> Result<Vec<String>, MidiError> {
        let client = self.client()?;
        client
            .ports()
            .iter()
            .map(|port| {
                client
                    .port_name(port)
                    .map_err(|e| MidiError::PortInfo(e.to_string()))
            })
            .collect()
    }

    fn open(&self, device: &str) -> Result<Box<dyn MidiConnection>, MidiError> {
        let client = self.client()?;

        let port = client
            .ports()
            .into_iter()
            .find(|port| client.port_name(port).map_or(false, |name| name == device))
            .ok_or_else(|| MidiError::PortNotFound(device.to_string()))?;

        debug!("Opening MIDI output <b>{}</>", device);
        let connection = client
            .connect(&port, CONNECTION_NAME)
            .map_err(|e| MidiError::Connect {
                device: device.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(MidirConnection { connection }))
    }
}

struct MidirConnection {
    connection: MidiOutputConnection,
}

impl MidiConnection for MidirConnection {
    fn send(&mut self, message: &ControlChange) -> Result<(), MidiError> {
        self.connection
            .send(&message.to_bytes())
            .map_err(|e| MidiError::Send(e.to_string()))
    }

    fn close(self: Box<Self>) -> Result<(), MidiError> {
        self.connection.close();
        Ok(())
    }
}
