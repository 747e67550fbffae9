#[cfg(test)]
mod tests {
    use clap::Parser;
    use tickweave::cli::{validate_device, Args};

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["test"]);
        assert_eq!(args.file, None);
        assert!(!args.device_list);
        assert_eq!(args.midi_output, None);
        assert_eq!(args.start_tick, 0);
    }

    #[test]
    fn test_args_with_output_device() {
        let args = Args::parse_from(["test", "--midi-output", "Synth Port 1"]);
        assert_eq!(args.midi_output, Some("Synth Port 1".to_string()));
        assert!(!args.device_list);
    }

    #[test]
    fn test_args_with_file_and_start_tick() {
        let args = Args::parse_from(["test", "song.twv", "--start-tick", "960"]);
        assert_eq!(args.file.as_deref().and_then(|p| p.to_str()), Some("song.twv"));
        assert_eq!(args.start_tick, 960);
    }

    #[test]
    fn test_valid_device_passes_validation() {
        let devices = vec!["Synth Port 1".to_string(), "Synth Port 2".to_string()];
        assert!(validate_device("Synth Port 1", &devices).is_ok());
        // Substring matches count, like the underlying port lookup
        assert!(validate_device("Port 2", &devices).is_ok());
    }

    #[test]
    fn test_invalid_device_fails_validation() {
        let devices = vec!["Synth Port 1".to_string()];
        let err = validate_device("Nonexistent Device", &devices).unwrap_err();
        assert!(err.contains("Nonexistent Device"));
        assert!(err.contains("Synth Port 1"), "message lists alternatives");
    }
}
