// JSON wire format for sequences crossing a process boundary.
//
// Callers on the other side of an API send either a JSON note list or an
// already-encoded base64 MIDI string; `WirePayload` accepts both. The JSON
// form is deliberately loose about how values are written:
//
//   {"notes": [{"pitch": "F#4", "startTime": 0, "duration": 0.5,
//               "velocity": 0.8}],
//    "key": "D_major", "timeSignature": "3/4", "tempo": 96}
//
// - `pitch` is a MIDI number or a note name.
// - `startTime` may also be spelled `time`.
// - `velocity` is an integer 0..=127, or a float where values up to 1.0
//   are normalized loudness (scaled by 127 and rounded).
// - `voice` defaults to melody; `key` to C major; `timeSignature` to 4/4.
//
// A single malformed note name rejects the whole payload.

use crate::error::EncodeError;
use crate::midi::{EncodeOptions, decode_midi_base64, encode_sequence_base64};
use crate::pitch::{midi_from_i64, note_name_to_midi};
use crate::sequence::{Note, NoteSequence, TimeSignature, Voice};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIRE_KEY: &str = "C_major";

/// Pitch as sent by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePitch {
    Midi(i64),
    Name(String),
}

impl WirePitch {
    pub fn to_midi(&self) -> Result<u8, EncodeError> {
        match self {
            WirePitch::Midi(number) => midi_from_i64(*number),
            WirePitch::Name(name) => note_name_to_midi(name),
        }
    }
}

/// Velocity as sent by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireVelocity {
    Midi(u8),
    Scaled(f64),
}

impl WireVelocity {
    pub fn to_midi(self) -> u8 {
        match self {
            WireVelocity::Midi(v) => v.min(127),
            WireVelocity::Scaled(v) if v <= 1.0 => (v.max(0.0) * 127.0).round() as u8,
            WireVelocity::Scaled(v) => v.round().min(127.0) as u8,
        }
    }
}

fn default_velocity() -> WireVelocity {
    WireVelocity::Midi(100)
}

fn default_voice() -> Voice {
    Voice::Melody
}

fn default_key() -> String {
    DEFAULT_WIRE_KEY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNote {
    pub pitch: WirePitch,
    #[serde(alias = "time")]
    pub start_time: f64,
    pub duration: f64,
    #[serde(default = "default_velocity")]
    pub velocity: WireVelocity,
    #[serde(default = "default_voice")]
    pub voice: Voice,
}

impl WireNote {
    pub fn to_note(&self) -> Result<Note, EncodeError> {
        Ok(Note {
            pitch: self.pitch.to_midi()?,
            start_beats: self.start_time,
            duration_beats: self.duration,
            velocity: self.velocity.to_midi(),
            voice: self.voice,
        })
    }
}

impl From<&Note> for WireNote {
    fn from(note: &Note) -> Self {
        WireNote {
            pitch: WirePitch::Midi(i64::from(note.pitch)),
            start_time: note.start_beats,
            duration: note.duration_beats,
            velocity: WireVelocity::Midi(note.velocity),
            voice: note.voice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSequence {
    pub notes: Vec<WireNote>,
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default)]
    pub time_signature: TimeSignature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
}

impl WireSequence {
    pub fn from_sequence(sequence: &NoteSequence) -> Self {
        WireSequence {
            notes: sequence.notes.iter().map(WireNote::from).collect(),
            key: sequence.key_label.clone(),
            time_signature: sequence.time_signature,
            tempo: Some(sequence.tempo_bpm),
        }
    }

    /// Convert to a sequence, using `default_tempo` when none was sent.
    pub fn into_sequence(self, default_tempo: f64) -> Result<NoteSequence, EncodeError> {
        let notes = self
            .notes
            .iter()
            .map(WireNote::to_note)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NoteSequence {
            notes,
            key_label: self.key,
            time_signature: self.time_signature,
            tempo_bpm: self.tempo.unwrap_or(default_tempo),
        })
    }
}

/// Input of the encoder's wire adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePayload {
    /// Base64 MIDI, passed through after validation.
    Encoded(String),
    Sequence(WireSequence),
}

impl WirePayload {
    pub fn from_json(json: &str) -> Result<Self, EncodeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Turn any payload into base64 MIDI.
pub fn encode_payload(
    payload: WirePayload,
    options: &EncodeOptions,
    default_tempo: f64,
) -> Result<String, EncodeError> {
    match payload {
        WirePayload::Encoded(text) => {
            decode_midi_base64(&text)?;
            Ok(text.trim().to_string())
        }
        WirePayload::Sequence(wire) => {
            let sequence = wire.into_sequence(default_tempo)?;
            encode_sequence_base64(&sequence, options)
        }
    }
}
