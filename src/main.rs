use std::sync::Arc;

use clap::Parser;
use tickweave::{
    cli::{validate_device, Args},
    engine::{MidirSink, MockEngine},
    logging,
    timing::DEFAULT_TICKS_PER_QUARTER,
    Document, OutputSink, Player, PlayerEvent, Tempo,
};

fn main() {
    initialize_logging();
    let args = Args::parse();
    let devices = MidirSink::list_devices();

    if args.device_list {
        list_available_devices(&devices);
        return;
    }

    if let Some(device_name) = &args.midi_output {
        if let Err(error_msg) = validate_device(device_name, &devices) {
            log::error!("{}", error_msg);
            eprintln!("{}", error_msg);
            std::process::exit(1);
        }
    }

    let engine = Arc::new(MockEngine::new());
    let document = match &args.file {
        Some(path) => Document::open(engine, path),
        None => {
            load_demo_pattern(&engine);
            Document::new(engine)
        }
    };
    let document = match document {
        Ok(document) => document,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut player = build_player(args.midi_output.as_deref());
    let events = player.subscribe();
    player.play(Arc::clone(document.engine()), args.start_tick);
    println!("Playing from tick {}...", args.start_tick);

    // The worker always reports Finished on exit; block until it does.
    for event in events.iter() {
        if event == PlayerEvent::Finished {
            break;
        }
    }
    player.stop();
    println!("Done.");
}

fn initialize_logging() {
    logging::init_logger().expect("Logger initialization failed");
    log::info!("Application starting");
}

fn list_available_devices(devices: &[String]) {
    println!("Available MIDI output devices:");
    for device in devices {
        println!("  - {}", device);
    }
}

fn build_player(device_name: Option<&str>) -> Player {
    match device_name {
        Some(name) => match MidirSink::connect(Some(name)) {
            Ok(sink) => {
                println!("Connected to MIDI output: {}", name);
                Player::new(sink)
            }
            Err(e) => {
                log::error!("Error connecting to MIDI output: {}", e);
                eprintln!("Error connecting to MIDI output: {}", e);
                std::process::exit(1);
            }
        },
        None => Player::new(LogSink),
    }
}

/// Fallback sink when no MIDI device is requested; events land in the log.
struct LogSink;

impl OutputSink for LogSink {
    fn emit(&mut self, bytes: &[u8]) -> tickweave::engine::Result<()> {
        log::debug!("emit {:?}", bytes);
        Ok(())
    }

    fn flush(&mut self) {}

    fn all_notes_off(&mut self) {
        log::debug!("all notes off");
    }
}

/// A short two-channel pattern so running without a file still plays.
fn load_demo_pattern(engine: &MockEngine) {
    let quarter = DEFAULT_TICKS_PER_QUARTER as u64;
    engine.set_tempo(0, Tempo::from_bpm(120.0));

    // Ascending arpeggio on channel 0
    for (i, note) in [60u8, 64, 67, 72].iter().enumerate() {
        let at = i as u64 * quarter;
        engine.add_event(at, vec![0x90, *note, 100]);
        engine.add_event(at + quarter - 10, vec![0x80, *note, 0]);
    }

    // Held pad note on channel 1
    engine.add_event(0, vec![0x91, 48, 80]);
    engine.add_event(4 * quarter - 10, vec![0x81, 48, 0]);
}
