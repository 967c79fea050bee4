// MuseMap music core
//
// Turns a loose musical idea (genre, moods, complexity, tempo, key) into a
// multi-voice note sequence and a Standard MIDI File. Generation is
// rule-based: a scale is picked from the key or the moods, a genre profile
// sets density, articulation and feel, and melody, bass and chord voices
// are laid over a fixed I-IV-V-I skeleton. An optional knowledge base of
// music-theory facts fills in an unset tempo or key.
//
// Architecture:
// - pitch.rs: Note names <-> MIDI numbers
// - scale.rs: Built-in scale table, validated scale definitions, mood fallback
// - key.rs: Key label resolution and scale-degree to pitch mapping
// - profile.rs: Per-genre generation profile and General MIDI instrumentation
// - idea.rs: Request type and defaulting/validation into a resolved idea
// - sequence.rs: Notes, voices, time signatures, note sequences
// - generate.rs: Melody, bass and chord pattern generator
// - quantize.rs: Grid snapping with swing
// - midi.rs: SMF encoder/decoder and base64 transport
// - wire.rs: Loose JSON note format used across process boundaries
// - knowledge.rs: Knowledge-base port plus an in-memory implementation
// - config.rs: Composer configuration
// - composer.rs: Idea-to-MIDI pipeline facade
// - error.rs: Error enums per failure domain
//
// The generator is deterministic given a seed, supporting reproducible output.

pub mod composer;
pub mod config;
pub mod error;
pub mod generate;
pub mod idea;
pub mod key;
pub mod knowledge;
pub mod midi;
pub mod pitch;
pub mod profile;
pub mod quantize;
pub mod scale;
pub mod sequence;
pub mod wire;

pub use composer::{Composer, Composition, CompositionMetadata, MusicalContext};
pub use config::ComposerConfig;
pub use idea::MusicalIdea;
pub use knowledge::{InMemoryKnowledgeBase, KnowledgeBase};
pub use sequence::{Note, NoteSequence, TimeSignature, Voice};
