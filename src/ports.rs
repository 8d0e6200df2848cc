//! MIDI port discovery and connection
//!
//! Opens the X-Touch Mini's ports by case-insensitive substring match and
//! plugs them into the rest of the system: the input callback parses raw
//! bytes and feeds the queue without blocking the driver thread, and the
//! output connection hides behind the [`MidiPort`] seam.

use crate::midi::{format_hex, MidiMessage};
use crate::queue::MidiSender;
use crate::surface::MidiPort;
use anyhow::Result;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::{debug, info};

/// Failures while locating or opening a MIDI port
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("MIDI input port matching '{0}' not found")]
    InputNotFound(String),
    #[error("MIDI output port matching '{0}' not found")]
    OutputNotFound(String),
    #[error("failed to initialize MIDI backend: {0}")]
    Init(#[from] midir::InitError),
    #[error("failed to connect to MIDI input: {0}")]
    ConnectInput(#[from] midir::ConnectError<MidiInput>),
    #[error("failed to connect to MIDI output: {0}")]
    ConnectOutput(#[from] midir::ConnectError<MidiOutput>),
}

/// Open the input port and feed every parsed message into the queue.
///
/// The returned connection must be kept alive for the callback to keep
/// running.
pub fn open_input(pattern: &str, sender: MidiSender) -> Result<MidiInputConnection<()>, PortError> {
    let midi_in = MidiInput::new("xtouch-ardour-in")?;

    let (port, name) = find_port(&midi_in.ports(), pattern, |p| midi_in.port_name(p).ok())
        .ok_or_else(|| PortError::InputNotFound(pattern.to_string()))?;
    info!("Connecting to input port: {}", name);

    let conn = midi_in.connect(
        &port,
        "xtouch-ardour",
        move |_timestamp, data, _| {
            // Runs on the driver thread: parse and hand off, never block.
            match MidiMessage::parse(data) {
                Some(msg) => sender.push(msg),
                None => debug!("unparsed MIDI input: {}", format_hex(data)),
            }
        },
        (),
    )?;
    Ok(conn)
}

/// Open the output port for LED and ring feedback.
pub fn open_output(pattern: &str) -> Result<MidiOutputConnection, PortError> {
    let midi_out = MidiOutput::new("xtouch-ardour-out")?;

    let (port, name) = find_port(&midi_out.ports(), pattern, |p| midi_out.port_name(p).ok())
        .ok_or_else(|| PortError::OutputNotFound(pattern.to_string()))?;
    info!("Connecting to output port: {}", name);

    Ok(midi_out.connect(&port, "xtouch-ardour")?)
}

/// Case-insensitive substring match over the available ports.
fn find_port<P: Clone>(
    ports: &[P],
    pattern: &str,
    name_of: impl Fn(&P) -> Option<String>,
) -> Option<(P, String)> {
    let pattern = pattern.to_lowercase();
    for port in ports {
        if let Some(name) = name_of(port) {
            if name.to_lowercase().contains(&pattern) {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                return Some((port.clone(), name));
            }
        }
    }
    None
}

/// The device's output connection, behind the surface's transport seam.
pub struct HardwarePort {
    conn: MidiOutputConnection,
}

impl HardwarePort {
    pub fn new(conn: MidiOutputConnection) -> Self {
        Self { conn }
    }
}

impl MidiPort for HardwarePort {
    fn send(&mut self, msg: &MidiMessage) -> Result<()> {
        let data = msg.encode();
        self.conn.send(&data)?;
        debug!("Sent: {} | {}", format_hex(&data), msg);
        Ok(())
    }
}

/// Print every available MIDI port (for `--list-ports`).
pub fn print_ports() -> Result<()> {
    let midi_in = MidiInput::new("xtouch-ardour-scanner")?;
    println!("\n=== MIDI Input Ports ===");
    for (i, port) in midi_in.ports().iter().enumerate() {
        if let Ok(name) = midi_in.port_name(port) {
            println!("  {}: {}", i, name);
        }
    }

    let midi_out = MidiOutput::new("xtouch-ardour-scanner")?;
    println!("\n=== MIDI Output Ports ===");
    for (i, port) in midi_out.ports().iter().enumerate() {
        if let Ok(name) = midi_out.port_name(port) {
            println!("  {}: {}", i, name);
        }
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_port_matches_case_insensitively() {
        let ports = vec!["Midi Through 14:0", "X-TOUCH MINI 28:0"];
        let found = find_port(&ports, "x-touch mini", |p| Some(p.to_string()));
        assert_eq!(found.map(|(_, name)| name), Some("X-TOUCH MINI 28:0".to_string()));
    }

    #[test]
    fn find_port_returns_none_without_match() {
        let ports = vec!["Midi Through 14:0"];
        assert!(find_port(&ports, "x-touch mini", |p| Some(p.to_string())).is_none());
    }
}
