use std::sync::{Arc, Mutex};

use lumen_shared::{MidiEvent, NoteState, NoteToLightMap, Rgb, DAMPER_PEDAL, NUM_NOTES};
use serde_json::{json, Value};

use crate::block::{object_type, ProcessingBlock};
use crate::json::{JsonHelper, OBJECT_TYPE_KEY};
use crate::midi::MidiInput;
use crate::observer::SubscriptionToken;
use crate::rgb_function::RgbFunction;
use crate::scheduler::Scheduler;
use crate::time::Clock;

const USING_PEDAL_KEY: &str = "usingPedal";
const CHANNEL_KEY: &str = "channel";
const RGB_FUNCTION_KEY: &str = "rgbFunction";

struct NoteSourceInner {
    active: bool,
    channel: u8,
    using_pedal: bool,
    pedal_pressed: bool,
    note_states: [NoteState; NUM_NOTES],
    rgb_function: Option<RgbFunction>,
}

struct NoteSourceShared {
    inner: Mutex<NoteSourceInner>,
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
}

impl NoteSourceShared {
    fn handle_midi_event(this: &Arc<Self>, event: MidiEvent) {
        match event {
            MidiEvent::NoteChange {
                channel,
                pitch,
                velocity,
                on,
            } => Self::on_note_change(this, channel, pitch, velocity, on),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } if controller == DAMPER_PEDAL => Self::on_damper_pedal(this, channel, value),
            _ => {}
        }
    }

    fn on_note_change(this: &Arc<Self>, channel: u8, pitch: u8, velocity: u8, on: bool) {
        if !this.inner.lock().unwrap().active {
            return;
        }

        let shared = Arc::clone(this);
        this.scheduler.schedule(move || {
            let now = shared.clock.now_ms();
            let mut inner = shared.inner.lock().unwrap();
            if channel != inner.channel {
                return;
            }

            if on {
                let state = &mut inner.note_states[pitch as usize];
                state.press_down_velocity = velocity;
                state.note_on_time_ms = now;
                state.pressed = true;
                state.sounding = true;
            } else {
                inner.note_states[pitch as usize].pressed = false;
                if !inner.pedal_pressed {
                    inner.note_states[pitch as usize].sounding = false;
                }
            }
        });
    }

    fn on_damper_pedal(this: &Arc<Self>, channel: u8, value: u8) {
        if !this.inner.lock().unwrap().active {
            return;
        }

        // The channel check happens inside the task: it reads configuration
        // that may change between scheduling and draining.
        let shared = Arc::clone(this);
        this.scheduler.schedule(move || {
            let mut inner = shared.inner.lock().unwrap();
            if channel != inner.channel || !inner.using_pedal {
                return;
            }

            inner.pedal_pressed = value >= 64;
            if !inner.pedal_pressed {
                // Stop the notes which were only sounding through the pedal.
                for state in inner.note_states.iter_mut() {
                    if !state.pressed {
                        state.sounding = false;
                    }
                }
            }
        });
    }
}

/// Lights lights from live note state on one MIDI channel.
///
/// MIDI callbacks never touch note state directly; they enqueue tasks on the
/// block's scheduler, which `execute` drains before rendering. Note
/// transitions therefore apply on the render task, in arrival order.
pub struct NoteRgbSource {
    shared: Arc<NoteSourceShared>,
    midi_input: Arc<MidiInput>,
    subscription: SubscriptionToken,
}

impl NoteRgbSource {
    pub fn new(midi_input: Arc<MidiInput>, clock: Arc<dyn Clock>) -> Self {
        let shared = Arc::new(NoteSourceShared {
            inner: Mutex::new(NoteSourceInner {
                active: false,
                channel: 0,
                using_pedal: false,
                pedal_pressed: false,
                note_states: [NoteState::default(); NUM_NOTES],
                rgb_function: Some(RgbFunction::default()),
            }),
            scheduler: Scheduler::new(),
            clock,
        });

        let weak = Arc::downgrade(&shared);
        let subscription = midi_input.subscribe(Box::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                NoteSourceShared::handle_midi_event(&shared, *event);
            }
        }));

        Self {
            shared,
            midi_input,
            subscription,
        }
    }

    pub fn channel(&self) -> u8 {
        self.shared.inner.lock().unwrap().channel
    }

    pub fn set_channel(&self, channel: u8) {
        self.shared.inner.lock().unwrap().channel = channel;
    }

    pub fn is_using_pedal(&self) -> bool {
        self.shared.inner.lock().unwrap().using_pedal
    }

    pub fn set_using_pedal(&self, using_pedal: bool) {
        self.shared.inner.lock().unwrap().using_pedal = using_pedal;
    }

    /// Replaces the color function; the previous one is dropped.
    pub fn set_rgb_function(&self, rgb_function: RgbFunction) {
        self.shared.inner.lock().unwrap().rgb_function = Some(rgb_function);
    }
}

impl ProcessingBlock for NoteRgbSource {
    fn activate(&mut self) {
        self.shared.inner.lock().unwrap().active = true;
    }

    fn deactivate(&mut self) {
        // Handle the backlog first so a queued event cannot resurrect a note
        // after this returns.
        self.shared.scheduler.execute_all();

        let mut inner = self.shared.inner.lock().unwrap();
        for state in inner.note_states.iter_mut() {
            state.pressed = false;
            state.sounding = false;
        }
        inner.active = false;
    }

    fn execute(&mut self, strip: &mut [Rgb], note_to_light_map: &NoteToLightMap) {
        self.shared.scheduler.execute_all();

        let inner = self.shared.inner.lock().unwrap();
        let Some(rgb_function) = &inner.rgb_function else {
            return;
        };

        let now = self.shared.clock.now_ms();
        for (&note, &light) in note_to_light_map {
            let light = light as usize;
            if light < strip.len() {
                strip[light] += rgb_function.calculate(&inner.note_states[note as usize], now);
            }
        }
    }

    fn object_type(&self) -> &'static str {
        object_type::NOTE_RGB_SOURCE
    }

    fn to_json(&self) -> Value {
        let inner = self.shared.inner.lock().unwrap();
        let mut converted = json!({
            OBJECT_TYPE_KEY: self.object_type(),
            USING_PEDAL_KEY: inner.using_pedal,
            CHANNEL_KEY: inner.channel,
        });
        if let Some(rgb_function) = &inner.rgb_function {
            converted[RGB_FUNCTION_KEY] = rgb_function.to_json();
        }
        converted
    }

    fn from_json(&mut self, json: &Value) {
        let mut inner = self.shared.inner.lock().unwrap();
        let helper = JsonHelper::new("NoteRgbSource", json);
        helper.get_item_if_present(USING_PEDAL_KEY, &mut inner.using_pedal);
        helper.get_item_if_present(CHANNEL_KEY, &mut inner.channel);

        if let Some(converted) = helper.object_if_present(RGB_FUNCTION_KEY) {
            inner.rgb_function = RgbFunction::from_json(converted);
        }
    }
}

impl Drop for NoteRgbSource {
    fn drop(&mut self) {
        self.midi_input.unsubscribe(self.subscription);
    }
}
