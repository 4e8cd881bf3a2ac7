use std::sync::{Arc, Mutex, Weak};

use lumen_shared::{
    MidiEvent, NoteToLightMap, Rgb, RgbStrip, BANK_SELECT_LSB, BANK_SELECT_MSB, MAX_BANK,
    MAX_CHANNEL,
};
use serde_json::{json, Value};

use crate::block::object_type;
use crate::error::EngineError;
use crate::factory::ProcessingBlockFactory;
use crate::json::{
    note_to_light_map_from_json, note_to_light_map_to_json, JsonHelper, OBJECT_TYPE_KEY,
};
use crate::midi::MidiInput;
use crate::observer::{ObserverCallback, ObserverList, SubscriptionToken};
use crate::patch::Patch;
use crate::scheduler::Scheduler;

const IS_LISTENING_TO_PROGRAM_CHANGE_KEY: &str = "isListeningToProgramChange";
const PROGRAM_CHANGE_CHANNEL_KEY: &str = "programChangeChannel";
const CURRENT_BANK_KEY: &str = "currentBank";
const NOTE_TO_LIGHT_MAP_KEY: &str = "noteToLightMap";
const PATCHES_KEY: &str = "patches";

/// Index of a patch in the concert's ordered patch list.
pub type PatchPosition = usize;

struct ConcertState {
    patches: Vec<Patch>,
    active_patch: Option<PatchPosition>,
    note_to_light_map: NoteToLightMap,
    strip: RgbStrip,
    listening_to_program_change: bool,
    program_change_channel: u8,
    current_bank: u16,
}

impl ConcertState {
    /// Grows the strip so every mapped light exists. Never shrinks.
    fn create_minimum_amount_of_lights(&mut self) {
        let minimum = self
            .note_to_light_map
            .values()
            .map(|&light| usize::from(light) + 1)
            .max()
            .unwrap_or(0);
        if self.strip.len() < minimum {
            self.strip.resize(minimum, Rgb::default());
        }
    }
}

struct ConcertInner {
    state: Mutex<ConcertState>,
    scheduler: Scheduler,
    observers: Mutex<ObserverList<[Rgb]>>,
    midi_input: Arc<MidiInput>,
    factory: Arc<ProcessingBlockFactory>,
}

impl ConcertInner {
    fn handle_midi_event(this: &Arc<Self>, event: MidiEvent) {
        match event {
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => {
                // Skip the scheduler round-trip for controllers without
                // patch-selection semantics.
                if controller != BANK_SELECT_MSB && controller != BANK_SELECT_LSB {
                    return;
                }

                let shared = Arc::clone(this);
                this.scheduler.schedule(move || {
                    shared.apply_bank_select(channel, controller, value);
                });
            }
            MidiEvent::ProgramChange { channel, program } => {
                let shared = Arc::clone(this);
                this.scheduler.schedule(move || {
                    shared.apply_program_change(channel, program);
                });
            }
            _ => {}
        }
    }

    /// 14-bit bank reconstruction: the MSB controller writes bits [13:7], the
    /// LSB controller bits [6:0].
    fn apply_bank_select(&self, channel: u8, controller: u8, value: u8) {
        let mut state = self.state.lock().unwrap();
        if channel != state.program_change_channel {
            return;
        }

        if controller == BANK_SELECT_MSB {
            state.current_bank = (u16::from(value) << 7) | (state.current_bank & 0x7f);
        } else {
            state.current_bank = (state.current_bank & 0x3f80) | u16::from(value);
        }
    }

    fn apply_program_change(&self, channel: u8, program: u8) {
        let mut state = self.state.lock().unwrap();
        if !state.listening_to_program_change || channel != state.program_change_channel {
            return;
        }

        let bank = state.current_bank;
        let matching = state.patches.iter().position(|patch| {
            patch.has_bank_and_program()
                && u16::from(patch.bank()) == bank
                && patch.program() == program
        });

        // No match leaves the current patch in place.
        if let Some(position) = matching {
            if let Some(active) = state.active_patch {
                log::info!("deactivating patch '{}'", state.patches[active].name());
                state.patches[active].deactivate();
            }
            log::info!("activating patch '{}'", state.patches[position].name());
            state.patches[position].activate();
            state.active_patch = Some(position);
        }
    }
}

/// The top-level document: owns the patches, the note-to-light map and the
/// strip buffer, selects the active patch from bank select plus program
/// change, and publishes each rendered frame to its observers.
///
/// MIDI callbacks defer their work to the concert's scheduler; every mutation
/// they cause is applied on the render task at the start of `execute`.
pub struct Concert {
    inner: Arc<ConcertInner>,
    subscription: SubscriptionToken,
}

impl Concert {
    pub fn new(midi_input: Arc<MidiInput>, factory: Arc<ProcessingBlockFactory>) -> Self {
        let inner = Arc::new(ConcertInner {
            state: Mutex::new(ConcertState {
                patches: Vec::new(),
                active_patch: None,
                note_to_light_map: NoteToLightMap::new(),
                strip: RgbStrip::new(),
                listening_to_program_change: false,
                program_change_channel: 0,
                current_bank: 0,
            }),
            scheduler: Scheduler::new(),
            observers: Mutex::new(ObserverList::new()),
            midi_input: Arc::clone(&midi_input),
            factory,
        });

        let weak: Weak<ConcertInner> = Arc::downgrade(&inner);
        let subscription = midi_input.subscribe(Box::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                ConcertInner::handle_midi_event(&inner, *event);
            }
        }));

        Self {
            inner,
            subscription,
        }
    }

    pub fn size(&self) -> usize {
        self.inner.state.lock().unwrap().patches.len()
    }

    /// Creates an empty patch through the factory and appends it. The first
    /// patch of a concert activates immediately.
    pub fn add_patch(&self) -> PatchPosition {
        let patch = self.inner.factory.create_patch();
        self.adopt_patch(patch)
    }

    /// Appends an externally built patch; same first-patch activation rule as
    /// [`Self::add_patch`].
    pub fn adopt_patch(&self, patch: Patch) -> PatchPosition {
        let mut state = self.inner.state.lock().unwrap();
        state.patches.push(patch);
        if state.patches.len() == 1 {
            state.patches[0].activate();
            state.active_patch = Some(0);
        }
        state.patches.len() - 1
    }

    /// Runs `action` against the patch at `position`, if it exists.
    pub fn with_patch<R>(
        &self,
        position: PatchPosition,
        action: impl FnOnce(&mut Patch) -> R,
    ) -> Option<R> {
        let mut state = self.inner.state.lock().unwrap();
        state.patches.get_mut(position).map(action)
    }

    /// Removes the patch at `position`, shifting the rest left. Removing the
    /// active patch leaves no patch active.
    pub fn remove_patch(&self, position: PatchPosition) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if position >= state.patches.len() {
            return false;
        }

        state.patches.remove(position);
        state.active_patch = match state.active_patch {
            Some(active) if active == position => None,
            Some(active) if active > position => Some(active - 1),
            other => other,
        };
        true
    }

    pub fn note_to_light_map(&self) -> NoteToLightMap {
        self.inner.state.lock().unwrap().note_to_light_map.clone()
    }

    pub fn set_note_to_light_map(&self, note_to_light_map: NoteToLightMap) {
        let mut state = self.inner.state.lock().unwrap();
        state.note_to_light_map = note_to_light_map;
        // Make sure all mapped lights fit into the strip.
        state.create_minimum_amount_of_lights();
    }

    pub fn strip_size(&self) -> usize {
        self.inner.state.lock().unwrap().strip.len()
    }

    pub fn is_listening_to_program_change(&self) -> bool {
        self.inner.state.lock().unwrap().listening_to_program_change
    }

    pub fn set_listening_to_program_change(&self, listening: bool) {
        self.inner.state.lock().unwrap().listening_to_program_change = listening;
    }

    pub fn program_change_channel(&self) -> u8 {
        self.inner.state.lock().unwrap().program_change_channel
    }

    pub fn set_program_change_channel(&self, channel: u8) {
        self.inner.state.lock().unwrap().program_change_channel = channel.min(MAX_CHANNEL);
    }

    pub fn current_bank(&self) -> u16 {
        self.inner.state.lock().unwrap().current_bank
    }

    pub fn set_current_bank(&self, bank: u16) {
        self.inner.state.lock().unwrap().current_bank = bank.min(MAX_BANK);
    }

    /// Renders one frame: applies pending MIDI work, executes the active
    /// patch into the strip, and hands the result to every frame observer.
    ///
    /// Observers run synchronously and must not call back into mutating
    /// concert operations.
    pub fn execute(&self) {
        self.inner.scheduler.execute_all();

        let mut state = self.inner.state.lock().unwrap();
        if let Some(active) = state.active_patch {
            let state = &mut *state;
            state.patches[active].execute(&mut state.strip, &state.note_to_light_map);

            self.inner.observers.lock().unwrap().notify(&state.strip);
        }
    }

    pub fn subscribe(&self, observer: ObserverCallback<[Rgb]>) -> SubscriptionToken {
        self.inner.observers.lock().unwrap().subscribe(observer)
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.inner.observers.lock().unwrap().unsubscribe(token);
    }

    pub fn object_type(&self) -> &'static str {
        object_type::CONCERT
    }

    pub fn to_json(&self) -> Value {
        let state = self.inner.state.lock().unwrap();
        let converted_patches: Vec<Value> =
            state.patches.iter().map(|patch| patch.to_json()).collect();
        json!({
            OBJECT_TYPE_KEY: self.object_type(),
            IS_LISTENING_TO_PROGRAM_CHANGE_KEY: state.listening_to_program_change,
            PROGRAM_CHANGE_CHANNEL_KEY: state.program_change_channel,
            CURRENT_BANK_KEY: state.current_bank,
            NOTE_TO_LIGHT_MAP_KEY: note_to_light_map_to_json(&state.note_to_light_map),
            PATCHES_KEY: converted_patches,
        })
    }

    /// Replaces this concert's configuration and patches with the document's
    /// contents. No patch is active afterwards until a program change picks
    /// one.
    pub fn from_json(&self, json: &Value) {
        let mut state = self.inner.state.lock().unwrap();

        let helper = JsonHelper::new("Concert", json);
        helper.get_item_if_present(
            IS_LISTENING_TO_PROGRAM_CHANGE_KEY,
            &mut state.listening_to_program_change,
        );
        helper.get_item_if_present(
            PROGRAM_CHANGE_CHANNEL_KEY,
            &mut state.program_change_channel,
        );
        helper.get_item_if_present(CURRENT_BANK_KEY, &mut state.current_bank);

        if let Some(converted_map) = helper.object_if_present(NOTE_TO_LIGHT_MAP_KEY) {
            state.note_to_light_map = note_to_light_map_from_json(converted_map);
            state.create_minimum_amount_of_lights();
        }

        state.patches.clear();
        state.active_patch = None;
        if let Some(converted_patches) = helper.array_if_present(PATCHES_KEY) {
            for converted in converted_patches {
                let patch = self.inner.factory.patch_from_json(converted);
                state.patches.push(patch);
            }
        }
    }

    /// Serializes the concert as a JSON document string.
    pub fn save_to_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Loads a concert document from a string. Schema-level problems inside a
    /// well-formed document degrade and log; only unparseable JSON errors.
    pub fn load_from_str(&self, document: &str) -> Result<(), EngineError> {
        let json: Value = serde_json::from_str(document)?;
        self.from_json(&json);
        Ok(())
    }
}

impl Drop for Concert {
    fn drop(&mut self) {
        self.inner.midi_input.unsubscribe(self.subscription);
    }
}
