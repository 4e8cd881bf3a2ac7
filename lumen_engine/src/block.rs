use lumen_shared::{NoteToLightMap, Rgb};
use serde_json::{json, Value};

use crate::json::{JsonHelper, OBJECT_TYPE_KEY};

/// Wire names of the serializable engine objects. These are stable: they are
/// what ends up in persisted concert documents.
pub mod object_type {
    pub const EQUAL_RANGE_RGB_SOURCE: &str = "EqualRangeRgbSource";
    pub const NOTE_RGB_SOURCE: &str = "NoteRgbSource";
    pub const PROCESSING_CHAIN: &str = "ProcessingChain";
    pub const PATCH: &str = "Patch";
    pub const CONCERT: &str = "Concert";
    pub const LINEAR_RGB_FUNCTION: &str = "LinearRgbFunction";
    pub const PIANO_DECAY_RGB_FUNCTION: &str = "PianoDecayRgbFunction";
}

/// A unit of the rendering pipeline.
///
/// Blocks composite additively: `execute` reads the strip and adds its own
/// contribution, staying within the strip's current length. Event-driven
/// blocks gate their bookkeeping on the active state and drop any transient
/// energy when deactivated.
pub trait ProcessingBlock: Send {
    /// Puts the block into its active state. Idempotent.
    fn activate(&mut self);

    /// Puts the block into its idle state, releasing transient state that
    /// would otherwise keep lights on. Idempotent.
    fn deactivate(&mut self);

    /// Adds this block's contribution for the current frame.
    fn execute(&mut self, strip: &mut [Rgb], note_to_light_map: &NoteToLightMap);

    /// The block's wire name from [`object_type`].
    fn object_type(&self) -> &'static str;

    fn to_json(&self) -> Value;

    /// Populates the block's persistent parameters from a document produced
    /// by [`ProcessingBlock::to_json`]. Unknown or mistyped keys keep their
    /// current values.
    fn from_json(&mut self, json: &Value);
}

const R_KEY: &str = "r";
const G_KEY: &str = "g";
const B_KEY: &str = "b";

/// Paints every light in the same color.
///
/// Overwrites the strip instead of adding to it, so it only composes as the
/// first block of a chain.
pub struct EqualRangeRgbSource {
    color: Rgb,
}

impl EqualRangeRgbSource {
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
}

impl Default for EqualRangeRgbSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingBlock for EqualRangeRgbSource {
    fn activate(&mut self) {}

    fn deactivate(&mut self) {}

    fn execute(&mut self, strip: &mut [Rgb], _note_to_light_map: &NoteToLightMap) {
        for light in strip.iter_mut() {
            *light = self.color;
        }
    }

    fn object_type(&self) -> &'static str {
        object_type::EQUAL_RANGE_RGB_SOURCE
    }

    fn to_json(&self) -> Value {
        json!({
            OBJECT_TYPE_KEY: self.object_type(),
            R_KEY: self.color.r,
            G_KEY: self.color.g,
            B_KEY: self.color.b,
        })
    }

    fn from_json(&mut self, json: &Value) {
        let helper = JsonHelper::new("EqualRangeRgbSource", json);
        helper.get_item_if_present(R_KEY, &mut self.color.r);
        helper.get_item_if_present(G_KEY, &mut self.color.g);
        helper.get_item_if_present(B_KEY, &mut self.color.b);
    }
}
