// Pattern generator: from a musical idea to a multi-voice note sequence.
//
// One generator serves every genre. The genre only selects a
// `GenreProfile`; the algorithm is the same:
//
// - A fixed eight-slot chord-root skeleton (I I IV IV V V I I over scale
//   degrees) is stretched across the melody.
// - Melody: one note per step. Accented beats draw from the chord tones
//   of the active slot (more candidates at higher complexity), even weak
//   beats take the chord third, odd weak beats wander anywhere in the
//   scale. Velocity and (at high complexity) duration get random jitter.
// - Bass (complexity >= 5): the chord root two octaves down, one long
//   note every four melody steps.
// - Chord stacks (complexity >= 4): one stack per measure, or two at
//   complexity >= 7, an octave below the melody. Richer interval sets as
//   complexity rises. Comping stacks are tagged Harmony, sustained ones
//   Pad.
//
// All randomness comes through the `RandomSource` port, so a fixed seed
// reproduces the exact sequence. Voices are appended one after another;
// the result is not in time order.

use crate::error::IdeaError;
use crate::idea::{MusicalIdea, ResolvedIdea};
use crate::key::KeyContext;
use crate::scale::ScaleTable;
use crate::sequence::{Note, NoteSequence, TimeSignature, Voice};
use musemap_prng::{MuseRng, RandomSource};
use tracing::debug;

/// Chord-root scale degrees, one per slot.
pub const CHORD_PATTERN: [usize; 8] = [0, 0, 3, 3, 4, 4, 0, 0];

/// Beats per measure for chord placement (the generator always writes 4/4).
const BEATS_PER_MEASURE: f64 = 4.0;

/// Fraction of a step that odd notes are pushed late when swinging.
const SWING_RATIO: f64 = 0.33;

const MELODY_VELOCITY_RANGE: (i32, i32) = (40, 110);
const VOICE_VELOCITY_RANGE: (i32, i32) = (40, 127);

/// Generate a sequence for an idea, resolving its key against the
/// built-in scale table.
pub fn generate(
    idea: &MusicalIdea,
    rng: &mut impl RandomSource,
) -> Result<NoteSequence, IdeaError> {
    let resolved = idea.resolve()?;
    let key = KeyContext::resolve(resolved.key.as_deref(), &resolved.moods, ScaleTable::builtin());
    Ok(generate_from(&resolved, &key, rng))
}

/// Convenience wrapper seeding a fresh `MuseRng`.
pub fn generate_seeded(idea: &MusicalIdea, seed: u64) -> Result<NoteSequence, IdeaError> {
    let mut rng = MuseRng::new(seed);
    generate(idea, &mut rng)
}

/// Generate from an already resolved idea and key.
pub fn generate_from(
    idea: &ResolvedIdea,
    key: &KeyContext,
    rng: &mut impl RandomSource,
) -> NoteSequence {
    let mut notes = melody(idea, key, rng);
    if idea.complexity >= 5 {
        notes.extend(bass(idea, key));
    }
    if idea.complexity >= 4 {
        notes.extend(chords(idea, key));
    }

    let sequence = NoteSequence {
        notes,
        key_label: key.label(),
        time_signature: TimeSignature::COMMON,
        tempo_bpm: idea.tempo_bpm,
    };
    debug!(
        genre = %idea.genre,
        complexity = idea.complexity,
        key = %sequence.key_label,
        notes = sequence.notes.len(),
        "generated sequence"
    );
    sequence
}

/// Chord-skeleton slot of melody step `i`.
fn chord_slot(i: usize, note_count: usize) -> usize {
    let steps_per_slot = note_count as f64 / CHORD_PATTERN.len() as f64;
    (i as f64 / steps_per_slot).floor() as usize % CHORD_PATTERN.len()
}

fn clamp_velocity(raw: i32, (low, high): (i32, i32)) -> u8 {
    raw.clamp(low, high) as u8
}

fn melody(idea: &ResolvedIdea, key: &KeyContext, rng: &mut impl RandomSource) -> Vec<Note> {
    let profile = &idea.profile;
    let complexity = usize::from(idea.complexity);
    let note_count = profile.note_count(idea.complexity);
    let step = profile.note_duration_beats;
    let scale_len = key.scale.len().max(1);
    let candidates = (complexity / 2).clamp(1, 4);

    let mut notes = Vec::with_capacity(note_count);
    for i in 0..note_count {
        let root = CHORD_PATTERN[chord_slot(i, note_count)];
        let accented = profile.is_accented(i);

        // Degrees stay unwrapped: degree_pitch lifts anything past the top
        // of the scale an octave.
        let (degree, bonus) = if accented {
            (root + 2 * rng.range_usize(0, candidates), 15.0)
        } else if i % 2 == 0 {
            (root + 2, 5.0)
        } else {
            (rng.range_usize(0, scale_len), 0.0)
        };

        let mut start = i as f64 * step;
        if profile.swing && i % 2 == 1 {
            start += step * SWING_RATIO;
        }

        let jitter = rng.range_f64(-5.0, 5.0) * f64::from(idea.complexity) / 10.0;
        let velocity = (f64::from(profile.base_velocity) + bonus + jitter).round() as i32;

        let length_factor = if idea.complexity > 7 {
            rng.range_f64(0.7, 0.9)
        } else {
            0.9
        };

        notes.push(Note {
            pitch: key.degree_pitch(degree, 0),
            start_beats: start,
            duration_beats: step * length_factor,
            velocity: clamp_velocity(velocity, MELODY_VELOCITY_RANGE),
            voice: Voice::Melody,
        });
    }
    notes
}

fn bass(idea: &ResolvedIdea, key: &KeyContext) -> Vec<Note> {
    let profile = &idea.profile;
    let note_count = profile.note_count(idea.complexity);
    let step = profile.note_duration_beats;
    let velocity = clamp_velocity(i32::from(profile.base_velocity) - 10, VOICE_VELOCITY_RANGE);

    (0..note_count)
        .step_by(4)
        .map(|i| Note {
            pitch: key.degree_pitch(CHORD_PATTERN[chord_slot(i, note_count)], -2),
            start_beats: i as f64 * step,
            duration_beats: step * 3.5,
            velocity,
            voice: Voice::Bass,
        })
        .collect()
}

/// Semitone stack above the chord root for chord position `p`.
fn chord_intervals(complexity: u8, p: usize) -> &'static [u8] {
    let even = p % 2 == 0;
    match complexity {
        8.. if even => &[0, 4, 7, 11],
        8.. => &[0, 3, 7, 10],
        6.. if even => &[0, 4, 7, 10],
        6.. => &[0, 3, 7, 10],
        _ if p % 3 == 2 => &[0, 3, 7],
        _ => &[0, 4, 7],
    }
}

fn chords(idea: &ResolvedIdea, key: &KeyContext) -> Vec<Note> {
    let profile = &idea.profile;
    let note_count = profile.note_count(idea.complexity);
    let chords_per_measure = if idea.complexity >= 7 { 2 } else { 1 };
    let voice = if idea.complexity >= 7 {
        Voice::Harmony
    } else {
        Voice::Pad
    };
    let melody_beats = note_count as f64 * profile.note_duration_beats;
    let measures = (melody_beats / BEATS_PER_MEASURE).ceil() as usize;
    let chord_duration = BEATS_PER_MEASURE / chords_per_measure as f64;
    let base_velocity = i32::from(profile.base_velocity) - 15;

    let mut notes = Vec::new();
    for p in 0..measures * chords_per_measure {
        let root_pitch = key.degree_pitch(CHORD_PATTERN[p % CHORD_PATTERN.len()], -1);
        for (k, &interval) in chord_intervals(idea.complexity, p).iter().enumerate() {
            let accent = if k == 0 { 5 } else { 0 };
            notes.push(Note {
                pitch: root_pitch.saturating_add(interval).min(127),
                start_beats: p as f64 * chord_duration,
                duration_beats: chord_duration * 0.8,
                velocity: clamp_velocity(base_velocity + accent, VOICE_VELOCITY_RANGE),
                voice,
            });
        }
    }
    notes
}
