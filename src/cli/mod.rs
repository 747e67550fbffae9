use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Sequence file to open (.twv is the native format)
    pub file: Option<PathBuf>,

    /// List available MIDI output devices
    #[arg(long)]
    pub device_list: bool,

    /// Send playback to a specific MIDI output device
    #[arg(long)]
    pub midi_output: Option<String>,

    /// Start playback from this tick
    #[arg(long, default_value_t = 0)]
    pub start_tick: u64,
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}
