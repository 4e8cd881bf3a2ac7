pub mod rgb;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use rgb::{rgb_from_float, Rgb, RgbStrip};

/// Milliseconds since an arbitrary epoch. Wraps after roughly 49 days.
pub type Millis = u32;

/// Size of the per-note state tables. MIDI pitches are 7 bits on the wire;
/// the table reserves head room up to a full byte.
pub const NUM_NOTES: usize = 256;

/// Highest MIDI channel number.
pub const MAX_CHANNEL: u8 = 15;

/// Highest program number carried by a program change message.
pub const MAX_PROGRAM: u8 = 0x7f;

/// Highest bank number a 14-bit bank select sequence can produce.
pub const MAX_BANK: u16 = 0x3fff;

// Status nibbles of the MIDI channel-voice messages the engine understands.
pub const STATUS_NOTE_OFF: u8 = 0x80;
pub const STATUS_NOTE_ON: u8 = 0x90;
pub const STATUS_CONTROL_CHANGE: u8 = 0xb0;
pub const STATUS_PROGRAM_CHANGE: u8 = 0xc0;
pub const STATUS_CHANNEL_PRESSURE: u8 = 0xd0;
pub const STATUS_PITCH_BEND: u8 = 0xe0;

// Controller numbers with engine-level semantics.
pub const BANK_SELECT_MSB: u8 = 0x00;
pub const BANK_SELECT_LSB: u8 = 0x20;
pub const DAMPER_PEDAL: u8 = 0x40;

/// A parsed MIDI channel-voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEvent {
    /// Note on or off. A note on with velocity 0 is delivered as-is;
    /// receivers that want the MIDI-canonical "velocity 0 means off"
    /// interpretation remap it themselves.
    NoteChange {
        channel: u8,
        pitch: u8,
        velocity: u8,
        on: bool,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    ChannelPressureChange {
        channel: u8,
        value: u8,
    },
    /// 14-bit pitch bend, low 7 bits from the first data byte.
    PitchBendChange {
        channel: u8,
        value: u16,
    },
}

/// Live state of a single note, kept by note-driven sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteState {
    /// True while the key is physically held down.
    pub pressed: bool,
    /// True while the note contributes light: pressed, or held over by the
    /// damper pedal after release.
    pub sounding: bool,
    pub press_down_velocity: u8,
    pub note_on_time_ms: Millis,
}

/// Maps MIDI note numbers to light indices on the strip. Ordered so that
/// serialized documents come out deterministic.
pub type NoteToLightMap = BTreeMap<u8, u16>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_state_defaults_to_silent() {
        let state = NoteState::default();
        assert!(!state.pressed);
        assert!(!state.sounding);
        assert_eq!(state.press_down_velocity, 0);
        assert_eq!(state.note_on_time_ms, 0);
    }
}
