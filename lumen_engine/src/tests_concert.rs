//! End-to-end scenarios: raw MIDI bytes in, rendered frames out.

use std::sync::{Arc, Mutex};

use lumen_shared::{NoteToLightMap, Rgb, RgbStrip};

use crate::concert::Concert;
use crate::factory::ProcessingBlockFactory;
use crate::midi::MidiInput;
use crate::rgb_function::{PianoDecayRgbFunction, RgbFunction};
use crate::time::ManualClock;

struct Fixture {
    midi_input: Arc<MidiInput>,
    clock: Arc<ManualClock>,
    factory: Arc<ProcessingBlockFactory>,
    concert: Concert,
}

fn setup() -> Fixture {
    let midi_input = MidiInput::new();
    let clock = Arc::new(ManualClock::new());
    let factory = ProcessingBlockFactory::new(Arc::clone(&midi_input), clock.clone());
    let concert = Concert::new(Arc::clone(&midi_input), Arc::clone(&factory));
    Fixture {
        midi_input,
        clock,
        factory,
        concert,
    }
}

fn feed(midi_input: &MidiInput, bytes: &[u8]) {
    for &byte in bytes {
        midi_input.process_midi_byte(byte);
    }
}

fn capture_frames(concert: &Concert) -> Arc<Mutex<Vec<RgbStrip>>> {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&frames);
    concert.subscribe(Box::new(move |strip| {
        sink.lock().unwrap().push(strip.to_vec());
    }));
    frames
}

fn one_to_one_map(count: u8) -> NoteToLightMap {
    (0..count).map(|note| (note, u16::from(note))).collect()
}

#[test]
fn bank_select_and_program_change_select_a_patch() {
    let fixture = setup();
    fixture.concert.set_listening_to_program_change(true);
    fixture.concert.set_program_change_channel(0);

    let patch_a = fixture.concert.add_patch();
    let patch_b = fixture.concert.add_patch();
    fixture.concert.with_patch(patch_a, |patch| {
        patch.set_bank(0);
        patch.set_program(0);
    });
    fixture.concert.with_patch(patch_b, |patch| {
        patch.set_bank(129);
        patch.set_program(42);
    });

    // CC 0 (MSB) = 1, CC 32 (LSB) = 1, then program change 42, all on
    // channel 0.
    feed(&fixture.midi_input, &[0xb0, 0x00, 1, 0xb0, 0x20, 1, 0xc0, 42]);
    fixture.concert.execute();

    assert_eq!(fixture.concert.current_bank(), 129);
    assert!(!fixture
        .concert
        .with_patch(patch_a, |p| p.chain().is_active())
        .unwrap());
    assert!(fixture
        .concert
        .with_patch(patch_b, |p| p.chain().is_active())
        .unwrap());
}

#[test]
fn bank_select_on_the_wrong_channel_changes_nothing() {
    let fixture = setup();
    fixture.concert.set_listening_to_program_change(true);
    fixture.concert.set_program_change_channel(0);

    // Same sequence as above, but on channel 1.
    feed(&fixture.midi_input, &[0xb1, 0x00, 1, 0xb1, 0x20, 1]);
    fixture.concert.execute();
    assert_eq!(fixture.concert.current_bank(), 0);
}

#[test]
fn pedal_sustains_notes_until_released() {
    let fixture = setup();
    fixture.concert.set_note_to_light_map(one_to_one_map(10));

    let position = fixture.concert.add_patch();
    let source = fixture.factory.create_note_source();
    source.set_using_pedal(true);
    fixture.concert.with_patch(position, |patch| {
        patch.chain_mut().insert_block(Box::new(source));
    });

    let frames = capture_frames(&fixture.concert);

    // Note 0 on, pedal down, note 2 on, both notes released.
    feed(&fixture.midi_input, &[0x90, 0, 1]);
    feed(&fixture.midi_input, &[0xb0, 0x40, 127]);
    feed(&fixture.midi_input, &[0x90, 2, 1]);
    feed(&fixture.midi_input, &[0x80, 0, 0]);
    feed(&fixture.midi_input, &[0x80, 2, 0]);
    fixture.concert.execute();

    {
        let frames = frames.lock().unwrap();
        let frame = frames.last().unwrap();
        assert_eq!(frame[0], Rgb::new(255, 255, 255));
        assert_eq!(frame[2], Rgb::new(255, 255, 255));
        assert_eq!(frame[1], Rgb::BLACK);
    }

    // Pedal up: both notes go dark.
    feed(&fixture.midi_input, &[0xb0, 0x40, 0]);
    fixture.concert.execute();

    let frames = frames.lock().unwrap();
    assert_eq!(*frames.last().unwrap(), vec![Rgb::BLACK; 10]);
}

#[test]
fn piano_decay_envelope_over_a_held_note() {
    let fixture = setup();
    fixture.concert.set_note_to_light_map(one_to_one_map(1));

    let position = fixture.concert.add_patch();
    let source = fixture.factory.create_note_source();
    let mut function = PianoDecayRgbFunction::new();
    function.set_color(Rgb::new(200, 100, 100));
    source.set_rgb_function(RgbFunction::PianoDecay(function));
    fixture.concert.with_patch(position, |patch| {
        patch.chain_mut().insert_block(Box::new(source));
    });

    let frames = capture_frames(&fixture.concert);
    feed(&fixture.midi_input, &[0x90, 0, 127]);

    let truth_table = [
        (0, Rgb::new(200, 100, 100)),
        (600, Rgb::new(150, 75, 75)),
        (1200, Rgb::new(100, 50, 50)),
        (8100, Rgb::new(50, 25, 25)),
        (15000, Rgb::BLACK),
    ];
    for (time, expected) in truth_table {
        fixture.clock.set(time);
        fixture.concert.execute();
        assert_eq!(frames.lock().unwrap().last().unwrap()[0], expected, "time {time}");
    }
}

#[test]
fn concert_json_round_trips_byte_equal() {
    let fixture = setup();
    fixture.concert.set_listening_to_program_change(true);
    fixture.concert.set_program_change_channel(3);
    fixture.concert.set_current_bank(17);
    fixture
        .concert
        .set_note_to_light_map(NoteToLightMap::from([(1, 10), (2, 20)]));

    let first = fixture.concert.add_patch();
    fixture.concert.with_patch(first, |patch| {
        patch.set_name("Lead");
        patch.set_bank(2);
        patch.set_program(3);
    });
    let source = fixture.factory.create_note_source();
    source.set_channel(1);
    source.set_using_pedal(true);
    let mut wash = crate::block::EqualRangeRgbSource::new();
    wash.set_color(Rgb::new(10, 0, 40));
    fixture.concert.with_patch(first, |patch| {
        patch.chain_mut().insert_block(Box::new(wash));
        patch.chain_mut().insert_block(Box::new(source));
    });
    fixture.concert.add_patch();

    let document = fixture.concert.save_to_string();

    let restored = Concert::new(
        Arc::clone(&fixture.midi_input),
        Arc::clone(&fixture.factory),
    );
    restored.load_from_str(&document).unwrap();

    assert_eq!(restored.size(), 2);
    assert_eq!(restored.to_json(), fixture.concert.to_json());
    assert_eq!(restored.save_to_string(), document);
}

#[test]
fn restored_concert_selects_patches_over_midi() {
    let fixture = setup();
    fixture.concert.set_listening_to_program_change(true);
    fixture.concert.set_program_change_channel(0);
    fixture.concert.set_note_to_light_map(one_to_one_map(4));

    let position = fixture.concert.add_patch();
    fixture.concert.with_patch(position, |patch| {
        patch.set_bank(0);
        patch.set_program(7);
    });
    let source = fixture.factory.create_note_source();
    fixture.concert.with_patch(position, |patch| {
        patch.chain_mut().insert_block(Box::new(source));
    });

    let document = fixture.concert.save_to_string();
    drop(fixture.concert);

    let restored = Concert::new(
        Arc::clone(&fixture.midi_input),
        Arc::clone(&fixture.factory),
    );
    restored.load_from_str(&document).unwrap();
    let frames = capture_frames(&restored);

    // Nothing is active after a load; the program change brings it up.
    restored.execute();
    assert!(frames.lock().unwrap().is_empty());

    // The activation applies on the next render tick; only notes arriving
    // after it light up.
    feed(&fixture.midi_input, &[0xc0, 7]);
    restored.execute();
    feed(&fixture.midi_input, &[0x90, 1, 1]);
    restored.execute();

    let frames = frames.lock().unwrap();
    assert_eq!(frames.last().unwrap()[1], Rgb::new(255, 255, 255));
}

#[test]
fn events_apply_in_arrival_order() {
    let fixture = setup();
    fixture.concert.set_note_to_light_map(one_to_one_map(2));

    let position = fixture.concert.add_patch();
    let source = fixture.factory.create_note_source();
    fixture.concert.with_patch(position, |patch| {
        patch.chain_mut().insert_block(Box::new(source));
    });
    let frames = capture_frames(&fixture.concert);

    // On and off before the frame: the off wins because it arrived last.
    feed(&fixture.midi_input, &[0x90, 0, 100, 0x80, 0, 0]);
    fixture.concert.execute();
    assert_eq!(*frames.lock().unwrap().last().unwrap(), vec![Rgb::BLACK; 2]);
}
