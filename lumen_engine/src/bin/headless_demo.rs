use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lumen_engine::{
    Concert, MidiInput, MidiMessageLogger, ProcessingBlockFactory, StripChangeLogger, SystemClock,
};

// A single patch at (bank 0, program 0): piano-decay glow on channel 0.
const DEMO_CONCERT: &str = r#"{
    "objectType": "Concert",
    "isListeningToProgramChange": true,
    "programChangeChannel": 0,
    "currentBank": 0,
    "noteToLightMap": {"60": 0, "62": 1, "64": 2, "65": 3, "67": 4, "69": 5, "71": 6, "72": 7},
    "patches": [
        {
            "objectType": "Patch",
            "name": "Piano Glow",
            "bank": 0,
            "program": 0,
            "hasBankAndProgram": true,
            "processingChain": {
                "objectType": "ProcessingChain",
                "processingChain": [
                    {
                        "objectType": "NoteRgbSource",
                        "channel": 0,
                        "usingPedal": true,
                        "rgbFunction": {
                            "objectType": "PianoDecayRgbFunction",
                            "r": 200, "g": 120, "b": 40
                        }
                    }
                ]
            }
        }
    ]
}"#;

fn feed(midi_input: &MidiInput, bytes: &[u8]) {
    for &byte in bytes {
        midi_input.process_midi_byte(byte);
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    println!("[Headless] Loading demo concert...");
    let midi_input = MidiInput::new();
    let clock = Arc::new(SystemClock::new());
    let factory = ProcessingBlockFactory::new(Arc::clone(&midi_input), clock);
    let concert = Concert::new(Arc::clone(&midi_input), factory);
    concert.load_from_str(DEMO_CONCERT)?;

    MidiMessageLogger::attach(&midi_input);
    StripChangeLogger::attach(&concert);

    println!("[Headless] Playing a short arpeggio. Run with RUST_LOG=debug to watch frames.");
    let player_input = Arc::clone(&midi_input);
    let player = thread::spawn(move || {
        // Select the patch, hold the pedal, then roll a C major arpeggio.
        feed(&player_input, &[0xc0, 0]);
        feed(&player_input, &[0xb0, 0x40, 127]);
        for &pitch in &[60u8, 64, 67, 72] {
            feed(&player_input, &[0x90, pitch, 100]);
            thread::sleep(Duration::from_millis(250));
            feed(&player_input, &[0x80, pitch, 0]);
        }
        thread::sleep(Duration::from_millis(500));
        feed(&player_input, &[0xb0, 0x40, 0]);
    });

    // Render at roughly 30 fps while the player runs.
    for _ in 0..90 {
        concert.execute();
        thread::sleep(Duration::from_millis(33));
    }
    let _ = player.join();

    println!("[Headless] Done.");
    Ok(())
}
