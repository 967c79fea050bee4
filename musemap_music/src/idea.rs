// Musical ideas: the user-facing generation request.
//
// `MusicalIdea` is what arrives over the API boundary (camelCase JSON, every
// field optional). `resolve()` turns it into a `ResolvedIdea` with all
// defaults applied and all values in range. Bad values are corrected where
// a safe default exists; only values with no sensible correction are
// rejected.

use crate::error::IdeaError;
use crate::profile::GenreProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

pub const DEFAULT_GENRE: &str = "Classical";
pub const DEFAULT_MOOD: &str = "Neutral";
pub const DEFAULT_COMPLEXITY: u8 = 5;
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const MIN_TEMPO_BPM: f64 = 20.0;
pub const MAX_TEMPO_BPM: f64 = 400.0;

/// A generation request as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicalIdea {
    pub genre: Option<String>,
    pub mood: BTreeSet<String>,
    /// 1..=10; values outside are clamped.
    pub complexity: Option<i32>,
    /// Beats per minute.
    pub tempo: Option<f64>,
    /// `"<Root>_<scale>"`, e.g. `"F#_harmonic_minor"`.
    pub key: Option<String>,
    /// Overrides the genre's swing default.
    pub swing: Option<bool>,
    /// Overrides the genre's accented beats (1-indexed, 1..=4).
    pub accented_beats: Option<Vec<u8>>,
}

impl MusicalIdea {
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_moods<I, S>(mut self, moods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mood = moods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_complexity(mut self, complexity: i32) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = Some(tempo);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Apply defaults and range corrections.
    pub fn resolve(&self) -> Result<ResolvedIdea, IdeaError> {
        let genre = self
            .genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_GENRE)
            .to_string();

        let mut moods: BTreeSet<String> = self
            .mood
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        if moods.is_empty() {
            moods.insert(DEFAULT_MOOD.to_string());
        }

        let complexity = self
            .complexity
            .map_or(DEFAULT_COMPLEXITY, |c| c.clamp(1, 10) as u8);

        let tempo_bpm = match self.tempo {
            None => DEFAULT_TEMPO_BPM,
            Some(t) if !t.is_finite() || t <= 0.0 => return Err(IdeaError::InvalidTempo(t)),
            Some(t) if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&t) => {
                let clamped = t.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM);
                warn!(requested = t, used = clamped, "tempo out of range, clamping");
                clamped
            }
            Some(t) => t,
        };

        let mut profile = GenreProfile::for_genre(&genre);
        if let Some(swing) = self.swing {
            profile.swing = swing;
        }
        if let Some(accents) = &self.accented_beats {
            if let Some(&bad) = accents.iter().find(|b| !(1..=4).contains(*b)) {
                return Err(IdeaError::InvalidAccent(bad));
            }
            profile.accented_beats = accents.clone();
        }

        Ok(ResolvedIdea {
            genre,
            moods,
            complexity,
            tempo_bpm,
            tempo_explicit: self.tempo.is_some(),
            key: self.key.clone(),
            profile,
        })
    }
}

/// A request with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdea {
    pub genre: String,
    /// Never empty.
    pub moods: BTreeSet<String>,
    /// 1..=10.
    pub complexity: u8,
    pub tempo_bpm: f64,
    /// False when `tempo_bpm` is the default, so enrichment may replace it.
    pub tempo_explicit: bool,
    pub key: Option<String>,
    /// Genre profile with the request's swing/accent overrides applied.
    pub profile: GenreProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let resolved = MusicalIdea::default().resolve().unwrap();
        assert_eq!(resolved.genre, "Classical");
        assert_eq!(
            resolved.moods,
            BTreeSet::from(["Neutral".to_string()])
        );
        assert_eq!(resolved.complexity, 5);
        assert_eq!(resolved.tempo_bpm, 120.0);
        assert!(!resolved.tempo_explicit);
        assert_eq!(resolved.key, None);
        assert_eq!(resolved.profile, GenreProfile::default());
    }

    #[test]
    fn test_complexity_clamped() {
        let low = MusicalIdea::default().with_complexity(-3).resolve().unwrap();
        assert_eq!(low.complexity, 1);
        let high = MusicalIdea::default().with_complexity(42).resolve().unwrap();
        assert_eq!(high.complexity, 10);
    }

    #[test]
    fn test_tempo_handling() {
        let slow = MusicalIdea::default().with_tempo(5.0).resolve().unwrap();
        assert_eq!(slow.tempo_bpm, MIN_TEMPO_BPM);
        assert!(slow.tempo_explicit);
        let fast = MusicalIdea::default().with_tempo(900.0).resolve().unwrap();
        assert_eq!(fast.tempo_bpm, MAX_TEMPO_BPM);

        for bad in [0.0, -60.0, f64::NAN, f64::INFINITY] {
            let err = MusicalIdea::default().with_tempo(bad).resolve().unwrap_err();
            assert!(matches!(err, IdeaError::InvalidTempo(_)));
        }
    }

    #[test]
    fn test_blank_fields_fall_back() {
        let idea = MusicalIdea::default()
            .with_genre("   ")
            .with_moods(["", " "]);
        let resolved = idea.resolve().unwrap();
        assert_eq!(resolved.genre, "Classical");
        assert!(resolved.moods.contains("Neutral"));
    }

    #[test]
    fn test_overrides_replace_genre_defaults() {
        let idea = MusicalIdea {
            genre: Some("Jazz".into()),
            swing: Some(false),
            accented_beats: Some(vec![1]),
            ..Default::default()
        };
        let resolved = idea.resolve().unwrap();
        assert!(!resolved.profile.swing);
        assert_eq!(resolved.profile.accented_beats, vec![1]);
        assert_eq!(resolved.profile.note_count_base, 24);

        let bad = MusicalIdea {
            accented_beats: Some(vec![2, 5]),
            ..Default::default()
        };
        assert_eq!(bad.resolve(), Err(IdeaError::InvalidAccent(5)));
    }

    #[test]
    fn test_camel_case_json() {
        let idea: MusicalIdea = serde_json::from_str(
            r#"{"genre": "Jazz", "mood": ["Happy"], "complexity": 8, "tempo": 140,
                "accentedBeats": [2, 4]}"#,
        )
        .unwrap();
        assert_eq!(idea.genre.as_deref(), Some("Jazz"));
        assert_eq!(idea.complexity, Some(8));
        assert_eq!(idea.tempo, Some(140.0));
        assert_eq!(idea.accented_beats, Some(vec![2, 4]));
        assert_eq!(idea.key, None);

        let empty: MusicalIdea = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, MusicalIdea::default());
    }
}
