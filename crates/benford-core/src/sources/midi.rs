//! Note-event stream to frequency sample conversion.
//!
//! Decoding a binary MIDI file is left to the caller; this module consumes the
//! resulting note-on / note-off events. Events are replayed in order while
//! counting active instances per pitch. A note-on with velocity 0 is a
//! note-off. When the last active instance of a pitch ends, the pitch's
//! equal-temperament frequency is emitted.

use serde::{Deserialize, Serialize};

use crate::error::BenfordError;
use crate::BenfordResult;

const MAX_MIDI_VALUE: u8 = 127;

/// A decoded MIDI channel-voice note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

/// Frequency in Hz of a MIDI note number: `440 * 2^((note - 69) / 12)`.
pub fn note_to_frequency(note: u8) -> f64 {
    440.0 * 2f64.powf((f64::from(note) - 69.0) / 12.0)
}

fn decode_error(reason: String) -> BenfordError {
    BenfordError::Decode {
        source_kind: "midi_events".into(),
        reason,
    }
}

/// Replay note events into the frequencies of completed notes.
pub fn frequencies_from_events(events: &[NoteEvent]) -> BenfordResult<Vec<f64>> {
    let mut active = [0u32; MAX_MIDI_VALUE as usize + 1];
    let mut frequencies = Vec::new();

    for (i, event) in events.iter().enumerate() {
        let (note, starts) = match *event {
            NoteEvent::NoteOn { note, velocity } => {
                if velocity > MAX_MIDI_VALUE {
                    return Err(decode_error(format!(
                        "event {i}: velocity {velocity} exceeds {MAX_MIDI_VALUE}"
                    )));
                }
                (note, velocity > 0)
            }
            NoteEvent::NoteOff { note } => (note, false),
        };
        if note > MAX_MIDI_VALUE {
            return Err(decode_error(format!(
                "event {i}: note {note} exceeds {MAX_MIDI_VALUE}"
            )));
        }

        let slot = &mut active[note as usize];
        if starts {
            *slot += 1;
        } else if *slot > 0 {
            *slot -= 1;
            if *slot == 0 {
                frequencies.push(note_to_frequency(note));
            }
        }
    }

    if frequencies.is_empty() {
        return Err(decode_error("no completed notes found".into()));
    }
    Ok(frequencies)
}
