// This file contains some custom stuff for finding the MIDI back-end and its output ports

use crate::midi::memory::MemoryBackend;
use crate::midi::MidiBackend;
#[cfg(feature = "midir")]
use crate::midi::midir_backend::MidirBackend;
use simplelog::{debug, error, warn};
use std::sync::Arc;

/// Name the LFO registers with on the host MIDI system.
pub const DEFAULT_CLIENT_NAME: &str = "MIDI LFO";

/// The backend used when none is given.
///
/// With the `midir` feature these are the host MIDI output ports. Without it the LFO runs against
/// a [MemoryBackend] with no ports, so it computes values but cannot send them anywhere.
pub fn default_backend(client_name: &str) -> Arc<dyn MidiBackend> {
    #[cfg(feature = "midir")]
    {
        Arc::new(MidirBackend::new(client_name))
    }

    #[cfg(not(feature = "midir"))]
    {
        warn!(
            "<b>Built <yellow>without</> <b>MIDI output support; {} has no ports.</>",
            client_name
        );
        null_backend()
    }
}

/// Lists the output ports of `backend`. Errors are logged and produce an empty list.
pub fn output_port_names(backend: &dyn MidiBackend) -> Vec<String> {
    match backend.port_names() {
        Ok(names) => {
            for name in names.iter() {
                debug!("Adding port {}...", name);
            }
            names
        }
        Err(e) => {
            error!("<b>Could <red>not list</> <b>the MIDI output ports: {}</>", e);
            Vec::new()
        }
    }
}

/// Picks the port to connect to.
///
/// # Arguments
/// * `ports` - the available port names, as given by [output_port_names].
/// * `preferred` - (optional) the wanted port. If not set the first port is chosen.
///
/// # Return
/// The chosen port name, or `None` if the preferred port is missing or there are no ports.
pub fn get_preferred_port(ports: &[String], preferred: Option<&str>) -> Option<String> {
    let port = match preferred {
        Some(wanted) => ports.iter().find(|port| port.as_str() == wanted),
        None => ports.first(),
    };

    match port {
        Some(port) => {
            debug!("Port {} is active", port);
            Some(port.clone())
        }
        None => {
            match preferred {
                Some(wanted) => warn!("<b>Port <yellow>{}</> <b>not found.</>", wanted),
                None => warn!("<b>There are <yellow>no</> <b>MIDI output ports.</>"),
            }
            None
        }
    }
}

/// A backend with no ports, for when the host backend cannot be used.
pub fn null_backend() -> Arc<dyn MidiBackend> {
    Arc::new(MemoryBackend::default())
}
