use lumen_shared::{rgb_from_float, Millis, NoteState, Rgb};
use serde_json::{json, Value};

use crate::block::object_type;
use crate::json::{JsonHelper, OBJECT_TYPE_KEY};

/// Factor/offset pair for one color channel of a linear ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearConstants {
    pub factor: f32,
    pub offset: f32,
}

/// Velocity-proportional color, constant over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRgbFunction {
    red: LinearConstants,
    green: LinearConstants,
    blue: LinearConstants,
}

impl LinearRgbFunction {
    pub fn new(red: LinearConstants, green: LinearConstants, blue: LinearConstants) -> Self {
        Self { red, green, blue }
    }

    fn calculate(&self, note_state: &NoteState, _now: Millis) -> Rgb {
        if !note_state.sounding {
            return Rgb::default();
        }

        let velocity = f32::from(note_state.press_down_velocity);
        rgb_from_float(
            self.red.factor * velocity + self.red.offset,
            self.green.factor * velocity + self.green.offset,
            self.blue.factor * velocity + self.blue.offset,
        )
    }

    fn to_json(&self) -> Value {
        json!({
            OBJECT_TYPE_KEY: object_type::LINEAR_RGB_FUNCTION,
            R_FACTOR_KEY: self.red.factor,
            R_OFFSET_KEY: self.red.offset,
            G_FACTOR_KEY: self.green.factor,
            G_OFFSET_KEY: self.green.offset,
            B_FACTOR_KEY: self.blue.factor,
            B_OFFSET_KEY: self.blue.offset,
        })
    }

    fn from_json(&mut self, json: &Value) {
        let helper = JsonHelper::new("LinearRgbFunction", json);
        helper.get_item_if_present(R_FACTOR_KEY, &mut self.red.factor);
        helper.get_item_if_present(R_OFFSET_KEY, &mut self.red.offset);
        helper.get_item_if_present(G_FACTOR_KEY, &mut self.green.factor);
        helper.get_item_if_present(G_OFFSET_KEY, &mut self.green.offset);
        helper.get_item_if_present(B_FACTOR_KEY, &mut self.blue.factor);
        helper.get_item_if_present(B_OFFSET_KEY, &mut self.blue.offset);
    }
}

impl Default for LinearRgbFunction {
    /// Unit white ramp: every channel scales straight off the velocity.
    fn default() -> Self {
        let full_scale = LinearConstants {
            factor: 255.0,
            offset: 0.0,
        };
        Self::new(full_scale, full_scale, full_scale)
    }
}

const R_FACTOR_KEY: &str = "rFactor";
const R_OFFSET_KEY: &str = "rOffset";
const G_FACTOR_KEY: &str = "gFactor";
const G_OFFSET_KEY: &str = "gOffset";
const B_FACTOR_KEY: &str = "bFactor";
const B_OFFSET_KEY: &str = "bOffset";

const R_KEY: &str = "r";
const G_KEY: &str = "g";
const B_KEY: &str = "b";

// Piano-style decay: a fast drop to half intensity over the first 1.2 s, then
// a slow fade to silence over the next 13.8 s.
const FAST_DECAY_DURATION_MS: Millis = 1200;
const SLOW_DECAY_DURATION_MS: Millis = 13800;
const FAST_DECAY_FACTOR: f32 = 0.5;
const SLOW_DECAY_FACTOR: f32 = 0.5;

/// Two-segment decay envelope over a fixed color, scaled by velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PianoDecayRgbFunction {
    color: Rgb,
}

impl PianoDecayRgbFunction {
    pub fn new() -> Self {
        Self {
            color: Rgb::default(),
        }
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    fn calculate(&self, note_state: &NoteState, now: Millis) -> Rgb {
        if !note_state.sounding {
            return Rgb::default();
        }

        let sounding_time = now.wrapping_sub(note_state.note_on_time_ms);

        let (time_progress, decay_factor, start_intensity) = if sounding_time < FAST_DECAY_DURATION_MS
        {
            (
                sounding_time as f32 / FAST_DECAY_DURATION_MS as f32,
                FAST_DECAY_FACTOR,
                1.0,
            )
        } else {
            // The slow segment picks up at the intensity where the fast one
            // left off.
            (
                (sounding_time - FAST_DECAY_DURATION_MS) as f32 / SLOW_DECAY_DURATION_MS as f32,
                SLOW_DECAY_FACTOR,
                1.0 - FAST_DECAY_FACTOR,
            )
        };

        // Past the end of the slow segment this goes negative and the color
        // clamps to black.
        let intensity = start_intensity - time_progress * decay_factor;
        let velocity_factor = f32::from(note_state.press_down_velocity) / 127.0;
        (velocity_factor * intensity) * self.color
    }

    fn to_json(&self) -> Value {
        json!({
            OBJECT_TYPE_KEY: object_type::PIANO_DECAY_RGB_FUNCTION,
            R_KEY: self.color.r,
            G_KEY: self.color.g,
            B_KEY: self.color.b,
        })
    }

    fn from_json(&mut self, json: &Value) {
        let helper = JsonHelper::new("PianoDecayRgbFunction", json);
        helper.get_item_if_present(R_KEY, &mut self.color.r);
        helper.get_item_if_present(G_KEY, &mut self.color.g);
        helper.get_item_if_present(B_KEY, &mut self.color.b);
    }
}

impl Default for PianoDecayRgbFunction {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed set of per-note color functions, tagged by `"objectType"` in
/// persisted documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RgbFunction {
    Linear(LinearRgbFunction),
    PianoDecay(PianoDecayRgbFunction),
}

impl RgbFunction {
    /// Maps a note's state and the current time to a color contribution.
    pub fn calculate(&self, note_state: &NoteState, now: Millis) -> Rgb {
        match self {
            RgbFunction::Linear(function) => function.calculate(note_state, now),
            RgbFunction::PianoDecay(function) => function.calculate(note_state, now),
        }
    }

    pub fn object_type(&self) -> &'static str {
        match self {
            RgbFunction::Linear(_) => object_type::LINEAR_RGB_FUNCTION,
            RgbFunction::PianoDecay(_) => object_type::PIANO_DECAY_RGB_FUNCTION,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RgbFunction::Linear(function) => function.to_json(),
            RgbFunction::PianoDecay(function) => function.to_json(),
        }
    }

    /// Builds a function from its persisted form, dispatching on the type
    /// tag. Unknown tags are logged and yield `None`.
    pub fn from_json(json: &Value) -> Option<RgbFunction> {
        let Some(tag) = json.get(OBJECT_TYPE_KEY).and_then(Value::as_str) else {
            log::error!("RGB function document carries no object type");
            return None;
        };

        match tag {
            object_type::LINEAR_RGB_FUNCTION => {
                let mut function = LinearRgbFunction::default();
                function.from_json(json);
                Some(RgbFunction::Linear(function))
            }
            object_type::PIANO_DECAY_RGB_FUNCTION => {
                let mut function = PianoDecayRgbFunction::new();
                function.from_json(json);
                Some(RgbFunction::PianoDecay(function))
            }
            other => {
                log::error!("unknown RGB function type '{other}'");
                None
            }
        }
    }
}

impl Default for RgbFunction {
    fn default() -> Self {
        RgbFunction::Linear(LinearRgbFunction::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sounding_note(velocity: u8, note_on_time_ms: Millis) -> NoteState {
        NoteState {
            pressed: true,
            sounding: true,
            press_down_velocity: velocity,
            note_on_time_ms,
        }
    }

    #[test]
    fn linear_scales_velocity() {
        let function = LinearRgbFunction::new(
            LinearConstants {
                factor: 2.0,
                offset: 10.0,
            },
            LinearConstants {
                factor: 1.0,
                offset: 0.0,
            },
            LinearConstants {
                factor: 0.0,
                offset: 3.0,
            },
        );

        assert_eq!(
            function.calculate(&sounding_note(100, 0), 0),
            Rgb::new(210, 100, 3)
        );
    }

    #[test]
    fn linear_is_black_when_not_sounding() {
        let function = LinearRgbFunction::default();
        let state = NoteState {
            press_down_velocity: 127,
            ..NoteState::default()
        };
        assert_eq!(function.calculate(&state, 0), Rgb::BLACK);
    }

    #[test]
    fn default_linear_is_a_unit_white_ramp() {
        let function = LinearRgbFunction::default();
        assert_eq!(
            function.calculate(&sounding_note(1, 0), 0),
            Rgb::new(255, 255, 255)
        );
    }

    #[test]
    fn piano_decay_truth_table_at_full_velocity() {
        let mut function = PianoDecayRgbFunction::new();
        function.set_color(Rgb::new(200, 100, 100));
        let state = sounding_note(127, 0);

        let truth_table = [
            (0, Rgb::new(200, 100, 100)),
            (600, Rgb::new(150, 75, 75)),
            (1200, Rgb::new(100, 50, 50)),
            (8100, Rgb::new(50, 25, 25)),
            (15000, Rgb::new(0, 0, 0)),
        ];
        for (time, expected) in truth_table {
            assert_eq!(function.calculate(&state, time), expected, "time {time}");
        }
    }

    #[test]
    fn piano_decay_scales_with_velocity() {
        let mut function = PianoDecayRgbFunction::new();
        function.set_color(Rgb::new(200, 100, 100));

        assert_eq!(
            function.calculate(&sounding_note(63, 0), 0),
            Rgb::new(99, 49, 49)
        );
    }

    #[test]
    fn piano_decay_is_black_when_not_sounding() {
        let mut function = PianoDecayRgbFunction::new();
        function.set_color(Rgb::new(255, 255, 255));
        let state = NoteState {
            press_down_velocity: 127,
            ..NoteState::default()
        };
        assert_eq!(function.calculate(&state, 42), Rgb::BLACK);
    }

    #[test]
    fn piano_decay_stays_black_long_after_release() {
        let mut function = PianoDecayRgbFunction::new();
        function.set_color(Rgb::new(200, 100, 100));
        assert_eq!(
            function.calculate(&sounding_note(127, 0), 60_000),
            Rgb::BLACK
        );
    }

    #[test]
    fn linear_json_round_trip() {
        let function = RgbFunction::Linear(LinearRgbFunction::new(
            LinearConstants {
                factor: 1.5,
                offset: 2.0,
            },
            LinearConstants {
                factor: 3.0,
                offset: 4.0,
            },
            LinearConstants {
                factor: 5.0,
                offset: 6.0,
            },
        ));

        let restored = RgbFunction::from_json(&function.to_json()).unwrap();
        assert_eq!(restored, function);
    }

    #[test]
    fn piano_decay_json_round_trip() {
        let mut inner = PianoDecayRgbFunction::new();
        inner.set_color(Rgb::new(9, 8, 7));
        let function = RgbFunction::PianoDecay(inner);

        let restored = RgbFunction::from_json(&function.to_json()).unwrap();
        assert_eq!(restored, function);
    }

    #[test]
    fn unknown_function_type_yields_none() {
        let json = serde_json::json!({"objectType": "NoSuchFunction"});
        assert!(RgbFunction::from_json(&json).is_none());
    }
}
