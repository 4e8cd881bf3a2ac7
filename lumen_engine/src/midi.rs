use std::sync::{Arc, Mutex};

use lumen_shared::{
    MidiEvent, STATUS_CHANNEL_PRESSURE, STATUS_CONTROL_CHANGE, STATUS_NOTE_OFF, STATUS_NOTE_ON,
    STATUS_PITCH_BEND, STATUS_PROGRAM_CHANGE,
};

use crate::observer::{ObserverCallback, ObserverList, SubscriptionToken};

/// Reassembles MIDI channel-voice messages from a raw byte stream.
///
/// Data bytes arriving outside a message are discarded. A status byte always
/// starts a fresh message, abandoning any partially assembled one. Running
/// status is not supported.
pub struct MidiParser {
    building: bool,
    message: Vec<u8>,
}

impl MidiParser {
    pub fn new() -> Self {
        Self {
            building: false,
            message: Vec::with_capacity(3),
        }
    }

    /// Feeds one byte; returns a complete event when the byte finishes a
    /// message. Malformed input never panics, it is dropped until the next
    /// status byte.
    pub fn feed(&mut self, byte: u8) -> Option<MidiEvent> {
        if byte & 0x80 != 0 {
            self.message.clear();
            self.building = true;
        }

        if !self.building {
            return None;
        }

        self.message.push(byte);

        // Status in the high nibble, channel in the low nibble.
        let status = self.message[0] & 0xf0;
        let channel = self.message[0] & 0x0f;

        let event = match status {
            STATUS_NOTE_OFF if self.message.len() >= 3 => Some(MidiEvent::NoteChange {
                channel,
                pitch: self.message[1],
                velocity: self.message[2],
                on: false,
            }),
            STATUS_NOTE_ON if self.message.len() >= 3 => Some(MidiEvent::NoteChange {
                channel,
                pitch: self.message[1],
                velocity: self.message[2],
                on: true,
            }),
            STATUS_CONTROL_CHANGE if self.message.len() >= 3 => Some(MidiEvent::ControlChange {
                channel,
                controller: self.message[1],
                value: self.message[2],
            }),
            STATUS_PROGRAM_CHANGE if self.message.len() >= 2 => Some(MidiEvent::ProgramChange {
                channel,
                program: self.message[1],
            }),
            STATUS_CHANNEL_PRESSURE if self.message.len() >= 2 => {
                Some(MidiEvent::ChannelPressureChange {
                    channel,
                    value: self.message[1],
                })
            }
            STATUS_PITCH_BEND if self.message.len() >= 3 => {
                // 14-bit value: first data byte carries the low 7 bits.
                let value = u16::from(self.message[1]) | (u16::from(self.message[2]) << 7);
                Some(MidiEvent::PitchBendChange { channel, value })
            }
            STATUS_NOTE_OFF
            | STATUS_NOTE_ON
            | STATUS_CONTROL_CHANGE
            | STATUS_PROGRAM_CHANGE
            | STATUS_CHANNEL_PRESSURE
            | STATUS_PITCH_BEND => None,
            _ => {
                log::warn!(
                    "unsupported MIDI status {status:#04x} on channel {channel}, ignoring rest of message"
                );
                self.building = false;
                self.message.clear();
                None
            }
        };

        if event.is_some() {
            self.building = false;
            self.message.clear();
        }
        event
    }
}

impl Default for MidiParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte sink for a MIDI source, fanning parsed events out to subscribers.
///
/// The host feeds bytes from wherever they come from (UART drain task,
/// library callback thread); subscribers get called on that same thread and
/// are expected to return quickly.
pub struct MidiInput {
    parser: Mutex<MidiParser>,
    observers: Mutex<ObserverList<MidiEvent>>,
}

impl MidiInput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            parser: Mutex::new(MidiParser::new()),
            observers: Mutex::new(ObserverList::new()),
        })
    }

    pub fn process_midi_byte(&self, byte: u8) {
        let event = self.parser.lock().unwrap().feed(byte);
        if let Some(event) = event {
            self.notify(event);
        }
    }

    /// Delivers an already-parsed event to every subscriber. Callbacks run
    /// with the subscription list locked and must not subscribe or
    /// unsubscribe from inside.
    pub fn notify(&self, event: MidiEvent) {
        self.observers.lock().unwrap().notify(&event);
    }

    pub fn subscribe(&self, callback: ObserverCallback<MidiEvent>) -> SubscriptionToken {
        self.observers.lock().unwrap().subscribe(callback)
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.observers.lock().unwrap().unsubscribe(token);
    }
}
