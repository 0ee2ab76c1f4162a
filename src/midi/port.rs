use crate::lock;
use crate::midi::{ControlChange, MidiBackend, MidiConnection, MidiError};
use simplelog::{debug, error};
use std::sync::{Arc, Mutex};

struct ActiveConnection {
    device: String,
    handle: Box<dyn MidiConnection>,
}

/// Holds at most one open output connection.
///
/// Opening, closing and sending all go through the same lock, so the connection is never swapped
/// while a message is in flight. A port with nothing open silently drops what it is sent.
pub struct MidiPort {
    backend: Arc<dyn MidiBackend>,
    connection: Mutex<Option<ActiveConnection>>,
}

impl MidiPort {
    pub fn new(backend: Arc<dyn MidiBackend>) -> Self {
        Self {
            backend,
            connection: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &dyn MidiBackend {
        self.backend.as_ref()
    }

    /// Closes the current connection, if any, and opens `device`.
    ///
    /// On failure the port is left with nothing open. A failure closing the previous connection
    /// is logged and does not prevent opening the new one.
    pub fn open(&self, device: &str) -> Result<(), MidiError> {
        let mut connection = lock(&self.connection);

        if let Some(previous) = connection.take() {
            debug!("Closing {} before opening {}", previous.device, device);
            if let Err(e) = previous.handle.close() {
                error!(
                    "<b>Error while disconnecting from <red>{}</><b>: {}</>",
                    previous.device,
                    e
                );
            }
        }

        let handle = self.backend.open(device)?;
        *connection = Some(ActiveConnection {
            device: device.to_string(),
            handle,
        });
        Ok(())
    }

    /// Closes the current connection. Closing a port with nothing open does nothing.
    ///
    /// The port counts as closed afterwards, even when an error is returned.
    pub fn close(&self) -> Result<(), MidiError> {
        match lock(&self.connection).take() {
            Some(previous) => previous.handle.close(),
            None => Ok(()),
        }
    }

    /// Sends a message through the open connection. Nothing happens with no open connection.
    pub fn send(&self, message: &ControlChange) -> Result<(), MidiError> {
        match lock(&self.connection).as_mut() {
            Some(active) => active.handle.send(message),
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        lock(&self.connection).is_some()
    }

    /// Name of the device currently open.
    pub fn device(&self) -> Option<String> {
        lock(&self.connection)
            .as_ref()
            .map(|active| active.device.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::memory::MemoryBackend;

    fn get_port() -> (MidiPort, MemoryBackend) {
        let backend = MemoryBackend::new(&["A", "B"]);
        (MidiPort::new(Arc::new(backend.clone())), backend)
    }

    fn message(value: u32) -> ControlChange {
        ControlChange::new(0, 19, value).unwrap()
    }

    #[test]
    fn test_send_without_connection() {
        let (port, backend) = get_port();

        assert!(port.send(&message(1)).is_ok());
        assert!(!port.is_open());
        assert!(backend.sent().is_empty(), "Message sent with no connection");
    }

    #[test]
    fn test_close_without_connection() {
        let (port, backend) = get_port();

        assert!(port.close().is_ok());
        assert!(port.close().is_ok());
        assert_eq!(backend.open_connections(), 0);
    }

    #[test]
    fn test_open_and_send() {
        let (port, backend) = get_port();

        port.open("A").unwrap();
        assert!(port.is_open());
        assert_eq!(port.device().as_deref(), Some("A"));

        port.send(&message(5)).unwrap();
        assert_eq!(backend.sent_to("A"), vec![message(5)]);
    }

    #[test]
    fn test_open_replaces_previous() {
        let (port, backend) = get_port();

        port.open("A").unwrap();
        port.open("B").unwrap();
        assert_eq!(backend.open_connections(), 1, "Previous connection left open");

        port.send(&message(9)).unwrap();
        assert!(backend.sent_to("A").is_empty());
        assert_eq!(backend.sent_to("B"), vec![message(9)]);
    }

    #[test]
    fn test_failed_open_leaves_port_unset() {
        let (port, backend) = get_port();

        port.open("A").unwrap();
        let result = port.open("Missing");

        assert_eq!(result, Err(MidiError::PortNotFound("Missing".to_string())));
        assert!(!port.is_open());
        assert_eq!(backend.open_connections(), 0, "Old connection not closed");
        assert!(port.send(&message(1)).is_ok());
        assert!(backend.sent().is_empty());
    }

    #[test]
    fn test_failed_close_still_closes() {
        let (port, backend) = get_port();

        port.open("A").unwrap();
        backend.set_fail_close(true);

        assert!(port.close().is_err());
        assert!(!port.is_open());
        assert_eq!(backend.open_connections(), 0);
    }

    #[test]
    fn test_failed_close_does_not_block_open() {
        let (port, backend) = get_port();

        port.open("A").unwrap();
        backend.set_fail_close(true);

        assert!(port.open("B").is_ok());
        assert_eq!(port.device().as_deref(), Some("B"));
        assert_eq!(backend.open_connections(), 1);
    }

    #[test]
    fn test_failed_send_keeps_connection() {
        let (port, backend) = get_port();

        port.open("A").unwrap();
        backend.set_fail_sends(true);
        assert!(port.send(&message(1)).is_err());

        backend.set_fail_sends(false);
        port.send(&message(2)).unwrap();
        assert!(port.is_open());
        assert_eq!(backend.sent_to("A"), vec![message(2)]);
    }

    #[test]
    fn test_port_names() {
        let (port, _) = get_port();
        assert_eq!(port.backend().port_names().unwrap(), vec!["A", "B"]);
    }
}
