use std::sync::Arc;

use lumen_shared::{NoteToLightMap, Rgb};
use serde_json::{json, Value};

use crate::block::{object_type, ProcessingBlock};
use crate::chain::ProcessingChain;
use crate::factory::ProcessingBlockFactory;
use crate::json::{JsonHelper, OBJECT_TYPE_KEY};

const BANK_KEY: &str = "bank";
const PROGRAM_KEY: &str = "program";
const HAS_BANK_AND_PROGRAM_KEY: &str = "hasBankAndProgram";
const NAME_KEY: &str = "name";
const PROCESSING_CHAIN_KEY: &str = "processingChain";

const DEFAULT_NAME: &str = "Untitled Patch";

/// A named pipeline of processing blocks, addressable over MIDI through its
/// optional (bank, program) coordinates.
pub struct Patch {
    factory: Arc<ProcessingBlockFactory>,
    name: String,
    bank: u8,
    program: u8,
    bank_and_program_set: bool,
    chain: ProcessingChain,
}

impl Patch {
    pub(crate) fn new(factory: Arc<ProcessingBlockFactory>) -> Self {
        let chain = ProcessingChain::new(Arc::clone(&factory));
        Self {
            factory,
            name: DEFAULT_NAME.to_owned(),
            bank: 0,
            program: 0,
            bank_and_program_set: false,
            chain,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    pub fn set_bank(&mut self, bank: u8) {
        self.bank = bank;
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    /// Stores the program number and marks the patch addressable.
    pub fn set_program(&mut self, program: u8) {
        self.program = program;
        self.bank_and_program_set = true;
    }

    pub fn has_bank_and_program(&self) -> bool {
        self.bank_and_program_set
    }

    /// Makes the patch unaddressable; the stored bank and program values stay
    /// in place.
    pub fn clear_bank_and_program(&mut self) {
        self.bank_and_program_set = false;
    }

    pub fn chain(&self) -> &ProcessingChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut ProcessingChain {
        &mut self.chain
    }

    pub fn activate(&mut self) {
        self.chain.activate();
    }

    pub fn deactivate(&mut self) {
        self.chain.deactivate();
    }

    pub fn execute(&mut self, strip: &mut [Rgb], note_to_light_map: &NoteToLightMap) {
        self.chain.execute(strip, note_to_light_map);
    }

    pub fn object_type(&self) -> &'static str {
        object_type::PATCH
    }

    pub fn to_json(&self) -> Value {
        json!({
            OBJECT_TYPE_KEY: self.object_type(),
            HAS_BANK_AND_PROGRAM_KEY: self.bank_and_program_set,
            BANK_KEY: self.bank,
            PROGRAM_KEY: self.program,
            NAME_KEY: self.name,
            PROCESSING_CHAIN_KEY: self.chain.to_json(),
        })
    }

    pub fn from_json(&mut self, json: &Value) {
        let helper = JsonHelper::new("Patch", json);
        helper.get_item_if_present(HAS_BANK_AND_PROGRAM_KEY, &mut self.bank_and_program_set);
        helper.get_item_if_present(PROGRAM_KEY, &mut self.program);
        helper.get_item_if_present(BANK_KEY, &mut self.bank);
        helper.get_item_if_present(NAME_KEY, &mut self.name);

        if let Some(converted_chain) = helper.object_if_present(PROCESSING_CHAIN_KEY) {
            self.chain.from_json(converted_chain);
        } else {
            // Fall back to an empty chain.
            self.chain = self.factory.create_chain();
        }
    }
}
