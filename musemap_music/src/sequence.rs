// Note sequences: the symbolic output of the pattern generator.
//
// A `NoteSequence` is a bag of timed `Note` events across up to four
// simultaneous voices, plus the key label, time signature and tempo needed
// to encode it. Notes are stored in creation order (voice by voice), not
// in time order; anything that needs chronological order (the MIDI
// encoder) sorts for itself.
//
// Times and durations are in beats (quarter notes).

use crate::error::EncodeError;
use crate::pitch::midi_to_note_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Voice role of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Melody = 0,
    Bass = 1,
    Harmony = 2,
    Pad = 3,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Melody, Voice::Bass, Voice::Harmony, Voice::Pad];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Voice::Melody => "Melody",
            Voice::Bass => "Bass",
            Voice::Harmony => "Harmony",
            Voice::Pad => "Pad",
        }
    }

    /// Voice for a MIDI channel written by the encoder (channel = index).
    pub fn from_channel(channel: u8) -> Option<Voice> {
        Voice::ALL.get(usize::from(channel)).copied()
    }
}

/// One note event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// MIDI pitch, 0..=127.
    pub pitch: u8,
    pub start_beats: f64,
    pub duration_beats: f64,
    /// MIDI velocity, 1..=127.
    pub velocity: u8,
    pub voice: Voice,
}

impl Note {
    pub fn end_beats(&self) -> f64 {
        self.start_beats + self.duration_beats
    }
}

/// Time signature as numerator / denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    /// Numerator at least 1, denominator a power of two up to 64.
    pub fn new(numerator: u8, denominator: u8) -> Result<Self, EncodeError> {
        if numerator == 0 || !denominator.is_power_of_two() || denominator > 64 {
            return Err(EncodeError::InvalidTimeSignature(format!(
                "{numerator}/{denominator}"
            )));
        }
        Ok(TimeSignature {
            numerator,
            denominator,
        })
    }

    /// Denominator as the power-of-two exponent MIDI stores.
    pub fn denominator_exponent(&self) -> u8 {
        self.denominator.trailing_zeros() as u8
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::COMMON
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TimeSignature {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || EncodeError::InvalidTimeSignature(s.to_string());
        let (num, den) = s.trim().split_once('/').ok_or_else(bad)?;
        let num = num.trim().parse().map_err(|_| bad())?;
        let den = den.trim().parse().map_err(|_| bad())?;
        TimeSignature::new(num, den).map_err(|_| bad())
    }
}

impl Serialize for TimeSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Output of the pattern generator, input of the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSequence {
    pub notes: Vec<Note>,
    pub key_label: String,
    pub time_signature: TimeSignature,
    pub tempo_bpm: f64,
}

impl NoteSequence {
    /// Notes of one voice, in creation order.
    pub fn voice_notes(&self, voice: Voice) -> impl Iterator<Item = &Note> + '_ {
        self.notes.iter().filter(move |n| n.voice == voice)
    }

    pub fn voice_count(&self, voice: Voice) -> usize {
        self.voice_notes(voice).count()
    }

    /// Beat at which the last note ends (0 for an empty sequence).
    pub fn length_beats(&self) -> f64 {
        self.notes
            .iter()
            .map(Note::end_beats)
            .fold(0.0, f64::max)
    }

    /// Length in seconds at the sequence tempo.
    pub fn duration_seconds(&self) -> f64 {
        if self.tempo_bpm > 0.0 {
            self.length_beats() * 60.0 / self.tempo_bpm
        } else {
            0.0
        }
    }

    pub fn stats(&self) -> SequenceStats {
        let mut per_voice = [0usize; 4];
        for note in &self.notes {
            per_voice[note.voice.index()] += 1;
        }
        let (lowest, highest) = self
            .notes
            .iter()
            .fold((None, None), |(lo, hi): (Option<u8>, Option<u8>), n| {
                (
                    Some(lo.map_or(n.pitch, |l| l.min(n.pitch))),
                    Some(hi.map_or(n.pitch, |h| h.max(n.pitch))),
                )
            });
        SequenceStats {
            total_notes: self.notes.len(),
            per_voice,
            lowest_pitch: lowest,
            highest_pitch: highest,
            length_beats: self.length_beats(),
        }
    }

    /// One line per voice listing note names, for logs and the CLI.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} in {} at {:.0} bpm, {:.1} beats\n",
            self.time_signature,
            self.key_label,
            self.tempo_bpm,
            self.length_beats()
        );
        for voice in Voice::ALL {
            let names: Vec<String> = self
                .voice_notes(voice)
                .map(|n| midi_to_note_name(n.pitch))
                .collect();
            if names.is_empty() {
                continue;
            }
            out.push_str(&format!("{:>8}: {}\n", voice.name(), names.join(" ")));
        }
        out
    }
}

/// Counts and range of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStats {
    pub total_notes: usize,
    /// Indexed by `Voice::index()`.
    pub per_voice: [usize; 4],
    pub lowest_pitch: Option<u8>,
    pub highest_pitch: Option<u8>,
    pub length_beats: f64,
}
