// Composer: the full idea-to-MIDI pipeline.
//
// A compose run is:
//   1. resolve the idea (defaults, range checks);
//   2. enrich from the knowledge base, if one is attached: an unset tempo
//      becomes the genre's typical tempo, an unset key becomes the first
//      mood-appropriate scale the built-in table knows, rooted on C;
//   3. keep the tempo inside the configured range;
//   4. generate, optionally quantize, and encode to base64 MIDI.
//
// The knowledge base is advisory. Lookup errors are logged and the run
// continues exactly as if no knowledge base were attached, so a dead
// collaborator never fails a request.

use crate::config::ComposerConfig;
use crate::error::{ComposeError, IdeaError};
use crate::generate::generate_from;
use crate::idea::{MusicalIdea, ResolvedIdea};
use crate::key::KeyContext;
use crate::knowledge::{GenreCharacteristics, KnowledgeBase};
use crate::midi::{EncodeOptions, encode_sequence_base64};
use crate::profile::Instrumentation;
use crate::quantize::quantize_sequence;
use crate::scale::ScaleTable;
use crate::sequence::{NoteSequence, TimeSignature};
use musemap_prng::{MuseRng, RandomSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Descriptive metadata returned alongside the MIDI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionMetadata {
    pub genre: String,
    pub mood: Vec<String>,
    pub tempo: f64,
    pub key: String,
    pub time_signature: TimeSignature,
}

/// Result of a compose run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub sequence: NoteSequence,
    pub midi_base64: String,
    pub metadata: CompositionMetadata,
}

/// Knowledge-base facts relevant to one idea.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicalContext {
    pub genre: String,
    pub genre_info: Option<GenreCharacteristics>,
    /// `(name, notes)` of each mood-appropriate scale.
    pub scales: Vec<(String, Vec<String>)>,
    /// `(name, chords)` of each progression common in the genre.
    pub progressions: Vec<(String, Vec<String>)>,
    /// `(name, notes)` of the progression chords the knowledge base knows.
    pub chords: Vec<(String, Vec<String>)>,
}

impl MusicalContext {
    pub fn is_empty(&self) -> bool {
        self.genre_info.is_none()
            && self.scales.is_empty()
            && self.progressions.is_empty()
            && self.chords.is_empty()
    }
}

impl fmt::Display for MusicalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No specific musical context available.");
        }
        let mut sections = Vec::new();
        if let Some(info) = &self.genre_info {
            sections.push(format!(
                "Genre: {}\n- Typical tempo range: {}-{} BPM\n- Common progressions: {}\n- Common scales: {}",
                self.genre,
                info.tempo_min,
                info.tempo_max,
                info.common_progressions.join(", "),
                info.common_scales.join(", "),
            ));
        }
        if !self.scales.is_empty() {
            let lines: Vec<String> = self
                .scales
                .iter()
                .map(|(name, notes)| format!("- {name}: {}", notes.join(" ")))
                .collect();
            sections.push(format!("Mood-appropriate scales:\n{}", lines.join("\n")));
        }
        if !self.progressions.is_empty() {
            let lines: Vec<String> = self
                .progressions
                .iter()
                .map(|(name, chords)| format!("- {name}: {}", chords.join(" ")))
                .collect();
            sections.push(format!("Genre progressions:\n{}", lines.join("\n")));
        }
        if !self.chords.is_empty() {
            let lines: Vec<String> = self
                .chords
                .iter()
                .map(|(name, notes)| format!("- {name}: {}", notes.join(" ")))
                .collect();
            sections.push(format!("Chords:\n{}", lines.join("\n")));
        }
        write!(f, "{}", sections.join("\n\n"))
    }
}

/// Runs the pipeline with a fixed configuration.
pub struct Composer<'kb> {
    config: ComposerConfig,
    knowledge: Option<&'kb dyn KnowledgeBase>,
}

impl<'kb> Composer<'kb> {
    pub fn new(config: ComposerConfig) -> Self {
        Composer {
            config,
            knowledge: None,
        }
    }

    pub fn with_knowledge_base(mut self, knowledge: &'kb dyn KnowledgeBase) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Compose with a fresh generator seeded from `seed`.
    pub fn compose_seeded(&self, idea: &MusicalIdea, seed: u64) -> Result<Composition, ComposeError> {
        self.compose(idea, &mut MuseRng::new(seed))
    }

    pub fn compose(
        &self,
        idea: &MusicalIdea,
        rng: &mut impl RandomSource,
    ) -> Result<Composition, ComposeError> {
        let mut resolved = idea.resolve()?;
        self.enrich(&mut resolved);

        let key = KeyContext::resolve(resolved.key.as_deref(), &resolved.moods, ScaleTable::builtin());
        let mut sequence = generate_from(&resolved, &key, rng);
        if let Some(options) = &self.config.quantize {
            sequence = quantize_sequence(&sequence, options);
        }

        let options = EncodeOptions {
            ticks_per_quarter: self.config.ticks_per_quarter,
            time_signature: sequence.time_signature,
            layout: self.config.layout,
            quantize: None,
            title: None,
            instrumentation: self
                .config
                .instrumentation
                .unwrap_or_else(|| Instrumentation::for_genre(&resolved.genre)),
        };
        let midi_base64 = encode_sequence_base64(&sequence, &options)?;

        info!(
            genre = %resolved.genre,
            key = %sequence.key_label,
            tempo = sequence.tempo_bpm,
            notes = sequence.notes.len(),
            "composed"
        );
        let metadata = CompositionMetadata {
            genre: resolved.genre,
            mood: resolved.moods.into_iter().collect(),
            tempo: sequence.tempo_bpm,
            key: sequence.key_label.clone(),
            time_signature: sequence.time_signature,
        };
        Ok(Composition {
            sequence,
            midi_base64,
            metadata,
        })
    }

    /// Fill unset tempo and key, then clamp the tempo.
    fn enrich(&self, idea: &mut ResolvedIdea) {
        if !idea.tempo_explicit {
            idea.tempo_bpm = self.config.default_tempo;
            if let Some(info) = self.genre_info(&idea.genre) {
                debug!(genre = %idea.genre, tempo = info.typical_tempo(), "tempo from knowledge base");
                idea.tempo_bpm = info.typical_tempo();
            }
        }

        let keyless = idea.key.is_none();
        if let Some(kb) = self.knowledge.filter(|_| keyless) {
            match kb.scales_for_moods(&idea.moods) {
                Ok(records) => {
                    if let Some(scale_type) = records.iter().find_map(|r| r.scale_type()) {
                        debug!(scale = scale_type.id(), "key from knowledge base");
                        idea.key = Some(format!("C_{}", scale_type.id()));
                    }
                }
                Err(e) => warn!(error = %e, "mood scale lookup failed, using built-in table"),
            }
        }

        let clamped = self.config.clamp_tempo(idea.tempo_bpm);
        if clamped != idea.tempo_bpm {
            warn!(requested = idea.tempo_bpm, used = clamped, "tempo outside configured range");
            idea.tempo_bpm = clamped;
        }
    }

    fn genre_info(&self, genre: &str) -> Option<GenreCharacteristics> {
        let kb = self.knowledge?;
        match kb.genre_characteristics(genre) {
            Ok(info) => info,
            Err(e) => {
                warn!(genre, error = %e, "genre lookup failed, using built-in defaults");
                None
            }
        }
    }

    /// Gather what the knowledge base knows about an idea.
    ///
    /// Failed lookups leave their section empty.
    pub fn describe_context(&self, idea: &MusicalIdea) -> Result<MusicalContext, IdeaError> {
        let resolved = idea.resolve()?;
        let mut context = MusicalContext {
            genre: resolved.genre.clone(),
            genre_info: self.genre_info(&resolved.genre),
            ..MusicalContext::default()
        };
        let Some(kb) = self.knowledge else {
            return Ok(context);
        };

        match kb.scales_for_moods(&resolved.moods) {
            Ok(records) => {
                context.scales = records.into_iter().map(|r| (r.name, r.notes)).collect();
            }
            Err(e) => warn!(error = %e, "mood scale lookup failed"),
        }
        match kb.progressions_for_genre(&resolved.genre) {
            Ok(records) => {
                context.progressions = records.into_iter().map(|r| (r.name, r.chords)).collect();
            }
            Err(e) => warn!(error = %e, "progression lookup failed"),
        }

        let mut symbols: Vec<String> = Vec::new();
        for symbol in context.progressions.iter().flat_map(|(_, chords)| chords) {
            if !symbols.contains(symbol) {
                symbols.push(symbol.clone());
            }
        }
        if !symbols.is_empty() {
            match kb.chords_by_id(&symbols) {
                Ok(records) => {
                    context.chords = records.into_iter().map(|r| (r.name, r.notes)).collect();
                }
                Err(e) => warn!(error = %e, "chord lookup failed"),
            }
        }
        Ok(context)
    }
}
