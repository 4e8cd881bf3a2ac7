use std::sync::{Arc, Weak};

use serde_json::Value;

use crate::block::{object_type, EqualRangeRgbSource, ProcessingBlock};
use crate::chain::ProcessingChain;
use crate::error::EngineError;
use crate::json::OBJECT_TYPE_KEY;
use crate::midi::MidiInput;
use crate::note_source::NoteRgbSource;
use crate::patch::Patch;
use crate::time::Clock;

/// Builds engine objects from their persisted form, dispatching on the
/// `"objectType"` tag. Holds the collaborators event-driven blocks need.
pub struct ProcessingBlockFactory {
    midi_input: Arc<MidiInput>,
    clock: Arc<dyn Clock>,
    weak_self: Weak<ProcessingBlockFactory>,
}

impl ProcessingBlockFactory {
    pub fn new(midi_input: Arc<MidiInput>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            midi_input,
            clock,
            weak_self: weak_self.clone(),
        })
    }

    /// The factory is only ever handed out inside an `Arc`, so containers it
    /// creates can keep their own handle to it.
    fn arc(&self) -> Arc<Self> {
        self.weak_self.upgrade().expect("factory outlived its Arc")
    }

    pub fn create_chain(&self) -> ProcessingChain {
        // A chain needs the factory to construct its members.
        ProcessingChain::new(self.arc())
    }

    pub fn create_patch(&self) -> Patch {
        Patch::new(self.arc())
    }

    pub fn create_note_source(&self) -> NoteRgbSource {
        NoteRgbSource::new(Arc::clone(&self.midi_input), Arc::clone(&self.clock))
    }

    /// Restores a block from JSON. Unknown or untagged documents are logged
    /// and yield `None`; the caller skips the entry.
    pub fn block_from_json(&self, json: &Value) -> Option<Box<dyn ProcessingBlock>> {
        match self.try_block_from_json(json) {
            Ok(block) => Some(block),
            Err(error) => {
                log::error!("cannot restore processing block: {error}");
                None
            }
        }
    }

    fn try_block_from_json(&self, json: &Value) -> Result<Box<dyn ProcessingBlock>, EngineError> {
        let tag = json
            .get(OBJECT_TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or(EngineError::MissingObjectType)?;

        let mut block: Box<dyn ProcessingBlock> = match tag {
            object_type::EQUAL_RANGE_RGB_SOURCE => Box::new(EqualRangeRgbSource::new()),
            object_type::NOTE_RGB_SOURCE => Box::new(self.create_note_source()),
            object_type::PROCESSING_CHAIN => Box::new(self.create_chain()),
            other => return Err(EngineError::UnknownObjectType(other.to_owned())),
        };
        block.from_json(json);
        Ok(block)
    }

    pub fn patch_from_json(&self, json: &Value) -> Patch {
        let mut patch = self.create_patch();
        patch.from_json(json);
        patch
    }
}
