//! Real MIDI output through midir.

use log::{info, warn};
use midir::{MidiOutput, MidiOutputConnection};

use crate::engine::{EngineError, OutputSink, Result};

/// Output sink writing raw event bytes to a MIDI output port.
pub struct MidirSink {
    connection: MidiOutputConnection,
}

impl MidirSink {
    /// Connects to the first output port whose name contains `device_name`,
    /// or to the first available port when no name is given.
    pub fn connect(device_name: Option<&str>) -> Result<Self> {
        let midi_out = MidiOutput::new("tickweave-output")
            .map_err(|e| EngineError::Output(e.to_string()))?;

        let out_ports = midi_out.ports();
        if out_ports.is_empty() {
            return Err(EngineError::Output("no MIDI output ports available".into()));
        }

        let port = match device_name {
            Some(name) => out_ports
                .iter()
                .find(|p| midi_out.port_name(p).unwrap_or_default().contains(name))
                .ok_or_else(|| {
                    EngineError::Output(format!("MIDI output device '{}' not found", name))
                })?,
            None => &out_ports[0],
        };

        let port_name = midi_out
            .port_name(port)
            .map_err(|e| EngineError::Output(e.to_string()))?;
        info!("Connecting to MIDI output port: {}", port_name);

        let connection = midi_out
            .connect(port, "tickweave-output-conn")
            .map_err(|e| EngineError::Output(e.to_string()))?;
        Ok(MidirSink { connection })
    }

    /// Lists the names of all available MIDI output ports.
    pub fn list_devices() -> Vec<String> {
        match MidiOutput::new("tickweave-query") {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(e) => {
                warn!("Failed to query MIDI output ports: {}", e);
                Vec::new()
            }
        }
    }
}

impl OutputSink for MidirSink {
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.connection
            .send(bytes)
            .map_err(|e| EngineError::Output(e.to_string()))
    }

    fn flush(&mut self) {
        // midir sends synchronously, nothing is buffered on our side
    }

    fn all_notes_off(&mut self) {
        for channel in 0..16u8 {
            // CC 123: all notes off
            if let Err(e) = self.connection.send(&[0xB0 | channel, 123, 0]) {
                warn!("Failed to silence channel {}: {}", channel, e);
            }
        }
    }
}
