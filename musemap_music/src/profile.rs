// Genre profiles: the per-genre knobs of the pattern generator.
//
// One generator serves every genre; a genre only changes how many melody
// notes there are, how loud and how long they are, which beats of the bar
// get an accent, and whether odd notes swing. Unknown genres (including
// "Classical") get the default profile.
//
// Instrument choice is a separate lookup (`Instrumentation`) consulted only
// by the MIDI encoder for program changes. The generator treats voices as
// abstract roles.

use crate::sequence::Voice;
use serde::{Deserialize, Serialize};

/// Fewest and most melody notes a request can produce.
pub const MIN_NOTE_COUNT: usize = 8;
pub const MAX_NOTE_COUNT: usize = 32;

/// Base generation parameters for a genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreProfile {
    /// Melody length at complexity 5.
    pub note_count_base: i32,
    pub base_velocity: u8,
    /// Melody note spacing in beats.
    pub note_duration_beats: f64,
    /// 1-indexed beats within a 4-beat bar that receive an accent.
    pub accented_beats: Vec<u8>,
    pub swing: bool,
}

impl Default for GenreProfile {
    fn default() -> Self {
        GenreProfile {
            note_count_base: 16,
            base_velocity: 80,
            note_duration_beats: 0.5,
            accented_beats: vec![1, 3],
            swing: false,
        }
    }
}

impl GenreProfile {
    /// Profile for a genre name (ASCII case-insensitive).
    pub fn for_genre(genre: &str) -> Self {
        let default = GenreProfile::default();
        match genre.trim().to_ascii_lowercase().as_str() {
            "jazz" => GenreProfile {
                note_count_base: 24,
                base_velocity: 70,
                note_duration_beats: 0.25,
                accented_beats: vec![2, 4],
                swing: true,
            },
            "rock" => GenreProfile {
                note_count_base: 16,
                base_velocity: 90,
                note_duration_beats: 0.5,
                ..default
            },
            "blues" => GenreProfile {
                note_count_base: 12,
                base_velocity: 75,
                note_duration_beats: 0.33,
                swing: true,
                ..default
            },
            _ => default,
        }
    }

    /// Melody note count for a complexity, always within 8..=32.
    pub fn note_count(&self, complexity: u8) -> usize {
        let raw = self.note_count_base + (i32::from(complexity) - 5) * 2;
        raw.clamp(MIN_NOTE_COUNT as i32, MAX_NOTE_COUNT as i32) as usize
    }

    /// Whether melody index `i` falls on an accented beat.
    pub fn is_accented(&self, i: usize) -> bool {
        let beat = (i % 4) as u8 + 1;
        self.accented_beats.contains(&beat)
    }
}

/// General MIDI programs per voice role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrumentation {
    pub melody: u8,
    pub bass: u8,
    pub harmony: u8,
    pub pad: u8,
}

impl Default for Instrumentation {
    /// Acoustic grand, acoustic bass, string ensemble, warm pad.
    fn default() -> Self {
        Instrumentation {
            melody: 0,
            bass: 32,
            harmony: 48,
            pad: 89,
        }
    }
}

impl Instrumentation {
    pub fn for_genre(genre: &str) -> Self {
        match genre.trim().to_ascii_lowercase().as_str() {
            // Piano over cello and strings.
            "classical" => Instrumentation {
                melody: 0,
                bass: 42,
                harmony: 48,
                pad: 49,
            },
            // Vibraphone, upright bass, electric piano.
            "jazz" => Instrumentation {
                melody: 11,
                bass: 32,
                harmony: 4,
                pad: 4,
            },
            // Overdriven guitar, picked bass, distortion guitar.
            "rock" => Instrumentation {
                melody: 29,
                bass: 34,
                harmony: 30,
                pad: 18,
            },
            "blues" => Instrumentation {
                melody: 22,
                bass: 33,
                harmony: 16,
                pad: 16,
            },
            "pop" => Instrumentation {
                melody: 80,
                bass: 38,
                harmony: 0,
                pad: 89,
            },
            "electronic" => Instrumentation {
                melody: 81,
                bass: 38,
                harmony: 90,
                pad: 88,
            },
            _ => Instrumentation::default(),
        }
    }

    pub fn program(&self, voice: Voice) -> u8 {
        match voice {
            Voice::Melody => self.melody,
            Voice::Bass => self.bass,
            Voice::Harmony => self.harmony,
            Voice::Pad => self.pad,
        }
    }
}
