// Error types for every failure domain of the composer.
//
// Each stage reports through its own enum so callers can tell a rejected
// request (`IdeaError`) from a corrupt note stream (`EncodeError`) or a
// collaborator outage (`KnowledgeError`). `ComposeError` wraps the ones
// that can surface from a full `Composer::compose` run. Collaborator
// failures never reach `ComposeError`: the composer logs them and falls
// back to the built-in tables.

use thiserror::Error;

/// A musical idea that cannot be turned into a generation request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdeaError {
    #[error("tempo must be a finite positive number of beats per minute, got {0}")]
    InvalidTempo(f64),

    #[error("accented beat {0} is outside the 4-beat bar (expected 1..=4)")]
    InvalidAccent(u8),
}

/// A scale definition that violates the offset invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("scale '{0}' has no degrees")]
    Empty(String),

    #[error("scale '{id}' must start at offset 0, starts at {first}")]
    NotRooted { id: String, first: u8 },

    #[error("scale '{id}' offsets must be strictly ascending and below 12: {offsets:?}")]
    BadOffsets { id: String, offsets: Vec<u8> },
}

/// Invalid quantization grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantizeError {
    #[error("quantize grid must be a finite positive number of beats, got {0}")]
    InvalidGrid(f64),
}

/// Anything that stops a note sequence from becoming MIDI bytes.
///
/// Encoding is all-or-nothing: one bad note rejects the whole call.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid note name '{name}': {reason}")]
    InvalidNoteName { name: String, reason: &'static str },

    #[error("octave {octave} in note '{name}' is out of range (expected -1..=9)")]
    OctaveOutOfRange { name: String, octave: i32 },

    #[error("pitch {pitch} is outside the MIDI range 0..=127")]
    PitchOutOfRange { pitch: i64 },

    #[error("note {index} has invalid timing (start {start}, duration {duration})")]
    InvalidTiming {
        index: usize,
        start: f64,
        duration: f64,
    },

    #[error("tempo {0} bpm cannot be written as a MIDI tempo")]
    InvalidTempo(f64),

    #[error("invalid time signature '{0}'")]
    InvalidTimeSignature(String),

    #[error("MIDI timing must be metrical with 1..=32767 ticks per quarter note")]
    UnsupportedTiming,

    #[error("malformed MIDI data: {0}")]
    Midi(#[from] midly::Error),

    #[error("failed to write MIDI data: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid wire payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A knowledge-base lookup that could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeError {
    #[error("knowledge base unavailable: {0}")]
    Unavailable(String),

    #[error("knowledge base returned malformed data: {0}")]
    Malformed(String),
}

/// Failure of a full compose run.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Idea(#[from] IdeaError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Configuration file problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tempo range {min}..{max}")]
    TempoRange { min: f64, max: f64 },
}
