// Scale definitions and the built-in scale table.
//
// A scale is an ordered list of semitone offsets from its root. The table
// tags every scale with the moods and genres it suits; those tags back the
// mood lookups that the knowledge base would otherwise answer.
//
// `ScaleDefinition` enforces its invariants at construction (non-empty,
// rooted at 0, strictly ascending, all below 12), so every scale that
// reaches the pattern generator has at least one degree and the
// scale-degree modulus is never zero.
//
// Used by key.rs to resolve a `KeyContext`, and by knowledge.rs to map
// knowledge-base scale records onto playable scales.

use crate::error::ScaleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Scale types known to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    Major,
    NaturalMinor,
    HarmonicMinor,
    MelodicMinor,
    Blues,
    PentatonicMajor,
    PentatonicMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
}

impl ScaleType {
    pub const ALL: [ScaleType; 11] = [
        ScaleType::Major,
        ScaleType::NaturalMinor,
        ScaleType::HarmonicMinor,
        ScaleType::MelodicMinor,
        ScaleType::Blues,
        ScaleType::PentatonicMajor,
        ScaleType::PentatonicMinor,
        ScaleType::Dorian,
        ScaleType::Phrygian,
        ScaleType::Lydian,
        ScaleType::Mixolydian,
    ];

    /// Identifier used in `"<Root>_<id>"` key strings.
    pub fn id(self) -> &'static str {
        match self {
            ScaleType::Major => "major",
            ScaleType::NaturalMinor => "natural_minor",
            ScaleType::HarmonicMinor => "harmonic_minor",
            ScaleType::MelodicMinor => "melodic_minor",
            ScaleType::Blues => "blues",
            ScaleType::PentatonicMajor => "pentatonic_major",
            ScaleType::PentatonicMinor => "pentatonic_minor",
            ScaleType::Dorian => "dorian",
            ScaleType::Phrygian => "phrygian",
            ScaleType::Lydian => "lydian",
            ScaleType::Mixolydian => "mixolydian",
        }
    }

    pub fn from_id(id: &str) -> Option<ScaleType> {
        ScaleType::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ScaleType::Major => "Major Scale",
            ScaleType::NaturalMinor => "Natural Minor Scale",
            ScaleType::HarmonicMinor => "Harmonic Minor Scale",
            ScaleType::MelodicMinor => "Melodic Minor Scale",
            ScaleType::Blues => "Blues Scale",
            ScaleType::PentatonicMajor => "Major Pentatonic",
            ScaleType::PentatonicMinor => "Minor Pentatonic",
            ScaleType::Dorian => "Dorian Mode",
            ScaleType::Phrygian => "Phrygian Mode",
            ScaleType::Lydian => "Lydian Mode",
            ScaleType::Mixolydian => "Mixolydian Mode",
        }
    }

    /// Semitone offsets from the root, ascending, starting at 0.
    pub fn offsets(self) -> &'static [u8] {
        match self {
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleType::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::PentatonicMajor => &[0, 2, 4, 7, 9],
            ScaleType::PentatonicMinor => &[0, 3, 5, 7, 10],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
        }
    }

    pub fn mood_tags(self) -> &'static [&'static str] {
        match self {
            ScaleType::Major => &["Happy", "Bright", "Stable", "Energetic"],
            ScaleType::NaturalMinor => &["Sad", "Dark", "Mysterious"],
            ScaleType::HarmonicMinor => &["Dramatic", "Exotic", "Tense"],
            ScaleType::MelodicMinor => &["Bittersweet", "Sophisticated"],
            ScaleType::Blues => &["Soulful", "Expressive"],
            ScaleType::PentatonicMajor => &["Simple", "Folk", "Peaceful", "Neutral"],
            ScaleType::PentatonicMinor => &["Gritty", "Raw"],
            ScaleType::Dorian => &["Cool", "Melancholic"],
            ScaleType::Phrygian => &["Exotic", "Dark"],
            ScaleType::Lydian => &["Dreamy", "Bright"],
            ScaleType::Mixolydian => &["Relaxed", "Bluesy"],
        }
    }

    pub fn genre_tags(self) -> &'static [&'static str] {
        match self {
            ScaleType::Major => &["Classical", "Pop", "Rock", "Jazz"],
            ScaleType::NaturalMinor => &["Classical", "Rock", "Jazz"],
            ScaleType::HarmonicMinor => &["Classical", "Metal"],
            ScaleType::MelodicMinor => &["Jazz", "Classical"],
            ScaleType::Blues => &["Blues", "Jazz", "Rock"],
            ScaleType::PentatonicMajor => &["Folk", "Pop", "Rock"],
            ScaleType::PentatonicMinor => &["Blues", "Rock"],
            ScaleType::Dorian => &["Jazz", "Funk"],
            ScaleType::Phrygian => &["Flamenco", "Metal"],
            ScaleType::Lydian => &["Film", "Jazz"],
            ScaleType::Mixolydian => &["Rock", "Blues", "Folk"],
        }
    }
}

/// A validated scale: id, name, offsets and descriptive tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleDefinition {
    id: String,
    name: String,
    offsets: Vec<u8>,
    mood_tags: BTreeSet<String>,
    genre_tags: BTreeSet<String>,
}

impl ScaleDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        offsets: Vec<u8>,
        mood_tags: BTreeSet<String>,
        genre_tags: BTreeSet<String>,
    ) -> Result<Self, ScaleError> {
        let id = id.into();
        match offsets.first() {
            None => return Err(ScaleError::Empty(id)),
            Some(&first) if first != 0 => return Err(ScaleError::NotRooted { id, first }),
            Some(_) => {}
        }
        let ascending = offsets.windows(2).all(|w| w[0] < w[1]);
        if !ascending || offsets.iter().any(|&o| o >= 12) {
            return Err(ScaleError::BadOffsets { id, offsets });
        }
        Ok(ScaleDefinition {
            id,
            name: name.into(),
            offsets,
            mood_tags,
            genre_tags,
        })
    }

    /// The built-in definition of a scale type.
    pub fn from_type(scale_type: ScaleType) -> Self {
        let tags = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        ScaleDefinition {
            id: scale_type.id().to_string(),
            name: scale_type.display_name().to_string(),
            offsets: scale_type.offsets().to_vec(),
            mood_tags: tags(scale_type.mood_tags()),
            genre_tags: tags(scale_type.genre_tags()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offsets(&self) -> &[u8] {
        &self.offsets
    }

    /// Number of degrees; always at least 1.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Always false: an empty scale cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn mood_tags(&self) -> &BTreeSet<String> {
        &self.mood_tags
    }

    pub fn genre_tags(&self) -> &BTreeSet<String> {
        &self.genre_tags
    }

    /// Minor-flavoured: has a minor third above the root and no major third.
    pub fn is_minor(&self) -> bool {
        self.offsets.contains(&3) && !self.offsets.contains(&4)
    }
}

/// The table of scales available for key resolution.
#[derive(Debug, Clone)]
pub struct ScaleTable {
    scales: Vec<ScaleDefinition>,
}

impl ScaleTable {
    /// The process-wide built-in table, one entry per `ScaleType`.
    pub fn builtin() -> &'static ScaleTable {
        static TABLE: OnceLock<ScaleTable> = OnceLock::new();
        TABLE.get_or_init(|| ScaleTable {
            scales: ScaleType::ALL
                .into_iter()
                .map(ScaleDefinition::from_type)
                .collect(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&ScaleDefinition> {
        self.scales.iter().find(|s| s.id == id)
    }

    /// Scale type for a mood set when no usable key was given.
    ///
    /// The groups are checked in priority order, so a {Sad, Happy} request
    /// resolves to natural minor. Matching ignores ASCII case.
    pub fn mood_fallback<S: AsRef<str>>(&self, moods: &BTreeSet<S>) -> ScaleType {
        let any = |wanted: &[&str]| {
            moods
                .iter()
                .any(|m| wanted.iter().any(|w| w.eq_ignore_ascii_case(m.as_ref())))
        };
        if any(&["Sad", "Dark", "Mysterious"]) {
            ScaleType::NaturalMinor
        } else if any(&["Happy", "Bright", "Energetic"]) {
            ScaleType::Major
        } else if any(&["Soulful", "Expressive"]) {
            ScaleType::Blues
        } else {
            ScaleType::PentatonicMajor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moods(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_required_offsets() {
        assert_eq!(ScaleType::Major.offsets(), &[0, 2, 4, 5, 7, 9, 11]);
        assert_eq!(ScaleType::NaturalMinor.offsets(), &[0, 2, 3, 5, 7, 8, 10]);
        assert_eq!(ScaleType::HarmonicMinor.offsets(), &[0, 2, 3, 5, 7, 8, 11]);
        assert_eq!(ScaleType::Blues.offsets(), &[0, 3, 5, 6, 7, 10]);
        assert_eq!(ScaleType::PentatonicMajor.offsets(), &[0, 2, 4, 7, 9]);
    }

    #[test]
    fn test_builtin_table_satisfies_invariants() {
        for scale_type in ScaleType::ALL {
            let def = ScaleDefinition::from_type(scale_type);
            let checked = ScaleDefinition::new(
                def.id().to_string(),
                def.name().to_string(),
                def.offsets().to_vec(),
                def.mood_tags().clone(),
                def.genre_tags().clone(),
            );
            assert_eq!(checked.as_ref(), Ok(&def), "{}", scale_type.id());
            assert_eq!(ScaleType::from_id(scale_type.id()), Some(scale_type));
            assert_eq!(ScaleTable::builtin().get(scale_type.id()), Some(&def));
        }
    }

    #[test]
    fn test_invalid_definitions_rejected() {
        let none = BTreeSet::new;
        assert_eq!(
            ScaleDefinition::new("x", "X", vec![], none(), none()),
            Err(ScaleError::Empty("x".into()))
        );
        assert!(matches!(
            ScaleDefinition::new("x", "X", vec![2, 4], none(), none()),
            Err(ScaleError::NotRooted { first: 2, .. })
        ));
        assert!(matches!(
            ScaleDefinition::new("x", "X", vec![0, 4, 4], none(), none()),
            Err(ScaleError::BadOffsets { .. })
        ));
        assert!(matches!(
            ScaleDefinition::new("x", "X", vec![0, 7, 12], none(), none()),
            Err(ScaleError::BadOffsets { .. })
        ));
        // A single-degree drone scale is degenerate but legal.
        assert!(ScaleDefinition::new("drone", "Drone", vec![0], none(), none()).is_ok());
    }

    #[test]
    fn test_mood_cascade() {
        let table = ScaleTable::builtin();
        assert_eq!(table.mood_fallback(&moods(&["Sad"])), ScaleType::NaturalMinor);
        assert_eq!(table.mood_fallback(&moods(&["mysterious"])), ScaleType::NaturalMinor);
        assert_eq!(table.mood_fallback(&moods(&["Energetic"])), ScaleType::Major);
        assert_eq!(table.mood_fallback(&moods(&["Soulful"])), ScaleType::Blues);
        assert_eq!(table.mood_fallback(&moods(&["Neutral"])), ScaleType::PentatonicMajor);
        assert_eq!(table.mood_fallback(&moods(&[])), ScaleType::PentatonicMajor);
        // Minor group wins over the major group.
        assert_eq!(
            table.mood_fallback(&moods(&["Happy", "Dark"])),
            ScaleType::NaturalMinor
        );
    }

    #[test]
    fn test_minor_detection() {
        assert!(ScaleDefinition::from_type(ScaleType::NaturalMinor).is_minor());
        assert!(ScaleDefinition::from_type(ScaleType::Blues).is_minor());
        assert!(!ScaleDefinition::from_type(ScaleType::Major).is_minor());
        assert!(!ScaleDefinition::from_type(ScaleType::PentatonicMajor).is_minor());
    }
}
