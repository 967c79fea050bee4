// Music-theory knowledge base port.
//
// The composer can consult an external store of scales, chords,
// progressions and genre characteristics to fill in what a request leaves
// unset (tempo from the genre's usual range, key from a mood-appropriate
// scale). The store is always optional: every lookup may fail, and the
// composer treats a failure like an empty answer and carries on with the
// built-in tables.
//
// `KnowledgeBase` is the port. This crate ships one implementation,
// `InMemoryKnowledgeBase`, loaded from JSON; `fixture()` embeds
// `data/theory_fixture.json`. A graph-database backend lives outside this
// crate and plugs in through the same trait.

use crate::error::KnowledgeError;
use crate::scale::ScaleType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A scale as stored in the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub mood: Vec<String>,
}

impl ScaleRecord {
    /// Built-in scale this record corresponds to, if any.
    ///
    /// Records use short ids (`minor`, `pentatonic`) for the common
    /// scales; those map onto the natural minor and major pentatonic.
    pub fn scale_type(&self) -> Option<ScaleType> {
        ScaleType::from_id(&self.id).or(match self.id.as_str() {
            "minor" => Some(ScaleType::NaturalMinor),
            "pentatonic" => Some(ScaleType::PentatonicMajor),
            _ => None,
        })
    }

    fn has_any_mood(&self, moods: &BTreeSet<String>) -> bool {
        self.mood
            .iter()
            .any(|m| moods.iter().any(|wanted| wanted.eq_ignore_ascii_case(m)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub chords: Vec<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub mood: Vec<String>,
}

/// Tempo range and usual material of a genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreCharacteristics {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub tempo_min: f64,
    pub tempo_max: f64,
    #[serde(default)]
    pub common_scales: Vec<String>,
    #[serde(default)]
    pub common_progressions: Vec<String>,
}

impl GenreCharacteristics {
    /// Middle of the genre's tempo range.
    pub fn typical_tempo(&self) -> f64 {
        (self.tempo_min + self.tempo_max) / 2.0
    }
}

/// Lookup service for music-theory facts.
///
/// Implementations must be shareable across request threads. Lookups that
/// find nothing return an empty answer, not an error; errors mean the
/// store itself could not be queried.
pub trait KnowledgeBase: Send + Sync {
    fn genre_characteristics(
        &self,
        genre: &str,
    ) -> Result<Option<GenreCharacteristics>, KnowledgeError>;

    /// Scales tagged with any of the given moods.
    fn scales_for_moods(&self, moods: &BTreeSet<String>)
    -> Result<Vec<ScaleRecord>, KnowledgeError>;

    fn progressions_for_genre(&self, genre: &str)
    -> Result<Vec<ProgressionRecord>, KnowledgeError>;

    /// Chords with the given symbols (`"G7"`, `"Dm"`), in the order asked
    /// for. Unknown symbols are skipped.
    fn chords_by_id(&self, ids: &[String]) -> Result<Vec<ChordRecord>, KnowledgeError>;
}

/// Knowledge base held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryKnowledgeBase {
    #[serde(default)]
    scales: Vec<ScaleRecord>,
    #[serde(default)]
    chords: Vec<ChordRecord>,
    #[serde(default)]
    progressions: Vec<ProgressionRecord>,
    #[serde(default)]
    genres: Vec<GenreCharacteristics>,
}

impl InMemoryKnowledgeBase {
    /// Parse a knowledge base from JSON.
    pub fn from_json(json: &str) -> Result<Self, KnowledgeError> {
        let kb: InMemoryKnowledgeBase =
            serde_json::from_str(json).map_err(|e| KnowledgeError::Malformed(e.to_string()))?;
        if let Some(genre) = kb
            .genres
            .iter()
            .find(|g| !(g.tempo_min > 0.0 && g.tempo_min <= g.tempo_max))
        {
            return Err(KnowledgeError::Malformed(format!(
                "genre '{}' has tempo range {}..{}",
                genre.name, genre.tempo_min, genre.tempo_max
            )));
        }
        Ok(kb)
    }

    /// The fixture embedded at compile time.
    ///
    /// Panics if the embedded JSON is malformed (should never happen in a
    /// released build).
    pub fn fixture() -> Self {
        let json = include_str!("../../data/theory_fixture.json");
        InMemoryKnowledgeBase::from_json(json).expect("embedded theory_fixture.json is malformed")
    }

    pub fn scales(&self) -> &[ScaleRecord] {
        &self.scales
    }

    pub fn genres(&self) -> &[GenreCharacteristics] {
        &self.genres
    }
}

impl KnowledgeBase for InMemoryKnowledgeBase {
    fn genre_characteristics(
        &self,
        genre: &str,
    ) -> Result<Option<GenreCharacteristics>, KnowledgeError> {
        let genre = genre.trim();
        Ok(self
            .genres
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(genre) || g.id.eq_ignore_ascii_case(genre))
            .cloned())
    }

    fn scales_for_moods(
        &self,
        moods: &BTreeSet<String>,
    ) -> Result<Vec<ScaleRecord>, KnowledgeError> {
        Ok(self
            .scales
            .iter()
            .filter(|s| s.has_any_mood(moods))
            .cloned()
            .collect())
    }

    fn progressions_for_genre(
        &self,
        genre: &str,
    ) -> Result<Vec<ProgressionRecord>, KnowledgeError> {
        let genre = genre.trim();
        Ok(self
            .progressions
            .iter()
            .filter(|p| p.genre.iter().any(|g| g.eq_ignore_ascii_case(genre)))
            .cloned()
            .collect())
    }

    fn chords_by_id(&self, ids: &[String]) -> Result<Vec<ChordRecord>, KnowledgeError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.chords.iter().find(|c| &c.id == id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn moods(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fixture_contents() {
        let kb = InMemoryKnowledgeBase::fixture();
        assert_eq!(kb.scales().len(), 3);
        let chord_ids: Vec<&str> = kb.chords.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(chord_ids, vec!["C", "Dm", "G7"]);
        assert_eq!(kb.genres().len(), 2);
    }

    #[test]
    fn test_genre_lookup() {
        let kb = InMemoryKnowledgeBase::fixture();
        let jazz = kb.genre_characteristics("jazz").unwrap().unwrap();
        assert_eq!(jazz.name, "Jazz");
        assert_eq!((jazz.tempo_min, jazz.tempo_max), (80.0, 160.0));
        assert_eq!(jazz.typical_tempo(), 120.0);
        assert_eq!(jazz.common_scales, vec!["major", "minor"]);

        let rock = kb.genre_characteristics("Rock").unwrap().unwrap();
        assert_eq!(rock.typical_tempo(), 140.0);
        assert_eq!(kb.genre_characteristics("Polka").unwrap(), None);
    }

    #[test]
    fn test_scales_for_moods() {
        let kb = InMemoryKnowledgeBase::fixture();
        let found = kb.scales_for_moods(&moods(&["dark", "Peaceful"])).unwrap();
        let ids: Vec<&str> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["minor", "pentatonic"]);
        assert!(kb.scales_for_moods(&moods(&["Angry"])).unwrap().is_empty());
    }

    #[test]
    fn test_record_scale_types() {
        let kb = InMemoryKnowledgeBase::fixture();
        let types: Vec<Option<ScaleType>> = kb.scales().iter().map(ScaleRecord::scale_type).collect();
        assert_eq!(
            types,
            vec![
                Some(ScaleType::Major),
                Some(ScaleType::NaturalMinor),
                Some(ScaleType::PentatonicMajor),
            ]
        );
    }

    #[test]
    fn test_progressions_for_genre() {
        let kb = InMemoryKnowledgeBase::fixture();
        let jazz = kb.progressions_for_genre("Jazz").unwrap();
        assert_eq!(jazz.len(), 1);
        assert_eq!(jazz[0].chords, vec!["Dm7", "G7", "Cmaj7"]);
        let folk = kb.progressions_for_genre("folk").unwrap();
        assert_eq!(folk[0].id, "I-IV-V");
    }

    #[test]
    fn test_chords_by_id() {
        let kb = InMemoryKnowledgeBase::fixture();
        // Symbols are case-sensitive: "dm" is not "Dm".
        let ids: Vec<String> = ["G7", "Cmaj7", "dm", "C"].map(String::from).to_vec();
        let found = kb.chords_by_id(&ids).unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["G Dominant 7th", "C Major"]);
        assert_eq!(found[0].notes, vec!["G", "B", "D", "F"]);
        assert_eq!(found[0].function, "dominant");
        assert!(kb.chords_by_id(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_data() {
        assert!(matches!(
            InMemoryKnowledgeBase::from_json("{\"scales\": 3}"),
            Err(KnowledgeError::Malformed(_))
        ));
        let inverted = r#"{"genres": [{"name": "Doom", "tempoMin": 90, "tempoMax": 60}]}"#;
        assert!(InMemoryKnowledgeBase::from_json(inverted).is_err());
        assert_eq!(
            InMemoryKnowledgeBase::from_json("{}").unwrap(),
            InMemoryKnowledgeBase::default()
        );
    }

    #[test]
    fn test_usable_as_trait_object() {
        let kb: Box<dyn KnowledgeBase> = Box::new(InMemoryKnowledgeBase::fixture());
        assert!(kb.genre_characteristics("Jazz").unwrap().is_some());
    }
}
