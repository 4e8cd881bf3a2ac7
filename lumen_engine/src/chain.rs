use std::sync::Arc;

use lumen_shared::{NoteToLightMap, Rgb};
use serde_json::{json, Value};

use crate::block::{object_type, ProcessingBlock};
use crate::factory::ProcessingBlockFactory;
use crate::json::{JsonHelper, OBJECT_TYPE_KEY};

const PROCESSING_CHAIN_KEY: &str = "processingChain";

/// Ordered, owning sequence of blocks. A chain is itself a block, so chains
/// nest.
pub struct ProcessingChain {
    factory: Arc<ProcessingBlockFactory>,
    active: bool,
    blocks: Vec<Box<dyn ProcessingBlock>>,
}

impl ProcessingChain {
    pub(crate) fn new(factory: Arc<ProcessingBlockFactory>) -> Self {
        Self {
            factory,
            active: false,
            blocks: Vec::new(),
        }
    }

    /// Inserts a block at `index`, clamped to the current length. The block's
    /// activation immediately follows the chain's.
    pub fn insert_block_at(&mut self, mut block: Box<dyn ProcessingBlock>, index: usize) {
        let index = index.min(self.blocks.len());
        self.match_activation(block.as_mut());
        self.blocks.insert(index, block);
    }

    /// Appends a block; same activation rule as [`Self::insert_block_at`].
    pub fn insert_block(&mut self, mut block: Box<dyn ProcessingBlock>) {
        self.match_activation(block.as_mut());
        self.blocks.push(block);
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn match_activation(&self, block: &mut dyn ProcessingBlock) {
        if self.active {
            block.activate();
        } else {
            block.deactivate();
        }
    }

    fn update_all_block_states(&mut self) {
        if self.active {
            for block in &mut self.blocks {
                block.activate();
            }
        } else {
            for block in &mut self.blocks {
                block.deactivate();
            }
        }
    }
}

impl ProcessingBlock for ProcessingChain {
    fn activate(&mut self) {
        for block in &mut self.blocks {
            block.activate();
        }
        self.active = true;
    }

    fn deactivate(&mut self) {
        for block in &mut self.blocks {
            block.deactivate();
        }
        self.active = false;
    }

    fn execute(&mut self, strip: &mut [Rgb], note_to_light_map: &NoteToLightMap) {
        // Start clean; members composite on top of each other.
        for light in strip.iter_mut() {
            *light = Rgb::BLACK;
        }

        for block in &mut self.blocks {
            block.execute(strip, note_to_light_map);
        }
    }

    fn object_type(&self) -> &'static str {
        object_type::PROCESSING_CHAIN
    }

    fn to_json(&self) -> Value {
        let converted_blocks: Vec<Value> = self.blocks.iter().map(|block| block.to_json()).collect();
        json!({
            OBJECT_TYPE_KEY: self.object_type(),
            PROCESSING_CHAIN_KEY: converted_blocks,
        })
    }

    fn from_json(&mut self, json: &Value) {
        self.blocks.clear();

        let helper = JsonHelper::new("ProcessingChain", json);
        if let Some(converted_blocks) = helper.array_if_present(PROCESSING_CHAIN_KEY) {
            for converted in converted_blocks {
                if let Some(block) = self.factory.block_from_json(converted) {
                    self.blocks.push(block);
                }
            }
        } else {
            log::error!("document contains no list of processing blocks, chain stays empty");
        }

        self.update_all_block_states();
    }
}
