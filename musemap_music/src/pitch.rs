// Pitch-class names and note-name ⇄ MIDI number conversion.
//
// Sharps are the canonical spelling for black keys; flats are accepted on
// input. Note names follow scientific pitch notation with middle C = C4 =
// MIDI 60, so the MIDI number is `pitch_class + (octave + 1) * 12`.

use crate::error::EncodeError;

/// Canonical (sharp) spelling of each pitch class.
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Render a pitch class (taken mod 12) with its sharp name.
pub fn pitch_class_name(pc: u8) -> &'static str {
    PITCH_CLASS_NAMES[(pc % 12) as usize]
}

/// Parse a root name such as `"F#"` or `"Bb"` into a pitch class.
///
/// Only the naturals plus single sharps/flats that land on a black key are
/// recognised; `E#`, `Cb` and friends are rejected.
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    let pc = match name {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => return None,
    };
    Some(pc)
}

/// Convert a note name (`"C4"`, `"F#3"`, `"Bb-1"`) to a MIDI number.
///
/// A purely numeric string is taken as a MIDI number directly. Anything
/// else that does not match `[A-G][#b]?-?[0-9]+` is an error, as is an
/// octave outside -1..=9 or a result above 127 (`G#9`).
pub fn note_name_to_midi(name: &str) -> Result<u8, EncodeError> {
    let trimmed = name.trim();
    if let Ok(number) = trimmed.parse::<i64>() {
        return midi_from_i64(number);
    }

    let invalid = |reason| EncodeError::InvalidNoteName {
        name: name.to_string(),
        reason,
    };

    match trimmed.chars().next() {
        Some('A'..='G') => {}
        Some(_) => return Err(invalid("pitch letter must be A-G")),
        None => return Err(invalid("empty note name")),
    }
    let octave_start = match trimmed[1..].chars().next() {
        Some('#') | Some('b') => 2,
        _ => 1,
    };
    let class_name = &trimmed[..octave_start];
    let octave_text = &trimmed[octave_start..];
    if octave_text.is_empty() {
        return Err(invalid("missing octave number"));
    }
    let digits = octave_text.strip_prefix('-').unwrap_or(octave_text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("octave must be an integer"));
    }
    let octave: i32 = octave_text
        .parse()
        .map_err(|_| invalid("octave must be an integer"))?;
    if !(-1..=9).contains(&octave) {
        return Err(EncodeError::OctaveOutOfRange {
            name: name.to_string(),
            octave,
        });
    }
    // The letter is valid, so only the accidental can make this unspellable.
    let pc = parse_pitch_class(class_name)
        .ok_or_else(|| invalid("accidental does not name a pitch class"))?;

    midi_from_i64(i64::from(pc) + (i64::from(octave) + 1) * 12)
}

/// Range-check an integer MIDI number.
pub fn midi_from_i64(pitch: i64) -> Result<u8, EncodeError> {
    u8::try_from(pitch)
        .ok()
        .filter(|p| *p <= 127)
        .ok_or(EncodeError::PitchOutOfRange { pitch })
}

/// Render a MIDI number as a sharp-spelled note name (60 → `"C4"`).
pub fn midi_to_note_name(pitch: u8) -> String {
    let octave = i32::from(pitch / 12) - 1;
    format!("{}{}", pitch_class_name(pitch % 12), octave)
}
