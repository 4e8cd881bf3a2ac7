use std::fmt::Write as _;
use std::sync::Mutex;

use lumen_shared::{MidiEvent, RgbStrip};

use crate::concert::Concert;
use crate::midi::MidiInput;
use crate::observer::SubscriptionToken;

/// Logs every parsed MIDI event in a compact fixed-width format. Handy on
/// hosts with a log sink wired up.
pub struct MidiMessageLogger;

impl MidiMessageLogger {
    /// Subscribes the logger; the returned token detaches it again.
    pub fn attach(midi_input: &MidiInput) -> SubscriptionToken {
        midi_input.subscribe(Box::new(|event| match *event {
            MidiEvent::NoteChange {
                channel,
                pitch,
                velocity,
                on,
            } => {
                let state = if on { " ON" } else { "OFF" };
                log::info!("{state} chan {channel:2} pitch {pitch:3} vel {velocity:3}");
            }
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => log::info!("CON chan {channel:2} controller {controller:3} val {value:3}"),
            MidiEvent::ProgramChange { channel, program } => {
                log::info!("PRG chan {channel:2} num {program:2}");
            }
            MidiEvent::ChannelPressureChange { channel, value } => {
                log::info!("CHP chan {channel:2} val {value:2}");
            }
            MidiEvent::PitchBendChange { channel, value } => {
                log::info!(" PB chan {channel:2} val {value:5}");
            }
        }))
    }
}

/// Logs the strip contents whenever a rendered frame differs from the
/// previous one, one `index: r g b` line per light.
pub struct StripChangeLogger;

impl StripChangeLogger {
    pub fn attach(concert: &Concert) -> SubscriptionToken {
        let previous: Mutex<RgbStrip> = Mutex::new(RgbStrip::new());
        concert.subscribe(Box::new(move |strip| {
            let mut previous = previous.lock().unwrap();
            if previous.as_slice() == strip {
                return;
            }
            previous.clear();
            previous.extend_from_slice(strip);

            let mut message = String::from("strip update:\n");
            for (index, light) in strip.iter().enumerate() {
                let _ = writeln!(message, "{index:3}: {:3} {:3} {:3}", light.r, light.g, light.b);
            }
            log::debug!("{message}");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ProcessingBlockFactory;
    use crate::time::ManualClock;
    use std::sync::Arc;

    #[test]
    fn attach_and_detach_without_side_effects() {
        let midi_input = MidiInput::new();
        let token = MidiMessageLogger::attach(&midi_input);
        for byte in [0x90, 60, 100, 0xb0, 0x40, 127] {
            midi_input.process_midi_byte(byte);
        }
        midi_input.unsubscribe(token);

        let factory =
            ProcessingBlockFactory::new(Arc::clone(&midi_input), Arc::new(ManualClock::new()));
        let concert = Concert::new(midi_input, factory);
        concert.add_patch();
        let token = StripChangeLogger::attach(&concert);
        concert.execute();
        concert.execute();
        concert.unsubscribe(token);
    }
}
