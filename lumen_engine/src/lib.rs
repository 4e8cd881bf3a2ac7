pub mod block;
pub mod chain;
pub mod concert;
pub mod error;
pub mod factory;
pub mod json;
pub mod midi;
pub mod monitor;
pub mod note_source;
pub mod observer;
pub mod patch;
pub mod rgb_function;
pub mod scheduler;
pub mod time;

#[cfg(test)]
mod tests_concert;

pub use block::{object_type, EqualRangeRgbSource, ProcessingBlock};
pub use chain::ProcessingChain;
pub use concert::{Concert, PatchPosition};
pub use error::EngineError;
pub use factory::ProcessingBlockFactory;
pub use midi::{MidiInput, MidiParser};
pub use monitor::{MidiMessageLogger, StripChangeLogger};
pub use note_source::NoteRgbSource;
pub use observer::{ObserverCallback, ObserverList, SubscriptionToken};
pub use patch::Patch;
pub use rgb_function::{LinearConstants, LinearRgbFunction, PianoDecayRgbFunction, RgbFunction};
pub use scheduler::Scheduler;
pub use time::{Clock, ManualClock, SystemClock};
