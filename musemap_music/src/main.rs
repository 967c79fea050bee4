// MuseMap composer CLI entry point.
//
// Composes one piece from command-line idea fields and writes it out as a
// raw MIDI file, a base64 string, or the full JSON composition (sequence,
// base64 MIDI and metadata). With `--from-json` it skips generation and
// encodes a wire payload (JSON note list or base64 MIDI) instead.
//
// Usage:
//   cargo run -p musemap_music -- [OUTPUT] [--genre G] [--mood M]...
//     [--complexity N] [--tempo BPM] [--key Root_scale] [--seed N]
//     [--grid BEATS] [--swing RATIO] [--merged] [--config FILE]
//     [--no-knowledge-base] [--emit midi|base64|json] [-v|-q]
//
// Without OUTPUT the result goes to stdout. Logs always go to stderr.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{ArgAction, Parser, ValueEnum};
use musemap_music::composer::Composer;
use musemap_music::config::ComposerConfig;
use musemap_music::idea::MusicalIdea;
use musemap_music::knowledge::InMemoryKnowledgeBase;
use musemap_music::midi::{EncodeOptions, TrackLayout};
use musemap_music::pitch::midi_to_note_name;
use musemap_music::quantize::QuantizeOptions;
use musemap_music::sequence::{NoteSequence, Voice};
use musemap_music::wire::{WirePayload, encode_payload};
use musemap_prng::MuseRng;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{Level, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Standard MIDI File bytes
    Midi,
    /// Base64-encoded MIDI file
    Base64,
    /// Composition as JSON (sequence, base64 MIDI, metadata)
    Json,
}

/// Compose a short multi-voice piece and encode it as MIDI
#[derive(Debug, Parser)]
#[command(name = "musemap", version, about, long_about = None)]
struct Cli {
    /// Output file (default: stdout)
    output: Option<PathBuf>,

    /// Genre, e.g. Jazz, Rock, Blues, Classical
    #[arg(long)]
    genre: Option<String>,

    /// Mood tag; repeat for several
    #[arg(long = "mood")]
    moods: Vec<String>,

    /// Complexity 1..=10 (out-of-range values are clamped)
    #[arg(long, allow_negative_numbers = true)]
    complexity: Option<i32>,

    /// Tempo in beats per minute
    #[arg(long)]
    tempo: Option<f64>,

    /// Key label such as D_dorian or F#_harmonic_minor
    #[arg(long)]
    key: Option<String>,

    /// Random seed (default: picked from the clock and logged)
    #[arg(long)]
    seed: Option<u64>,

    /// Quantize to this grid, in beats
    #[arg(long)]
    grid: Option<f64>,

    /// Swing ratio 0..=1 applied while quantizing (0.5 is straight)
    #[arg(long)]
    swing: Option<f64>,

    /// Put every voice on a single note track
    #[arg(long)]
    merged: bool,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not consult the built-in theory knowledge base
    #[arg(long)]
    no_knowledge_base: bool,

    /// Encode a wire payload from this JSON file instead of composing
    #[arg(long, value_name = "FILE")]
    from_json: Option<PathBuf>,

    /// Print the knowledge-base context for the idea and exit
    #[arg(long)]
    context: bool,

    #[arg(long, value_enum, default_value_t = Emit::Base64)]
    emit: Emit,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    fn idea(&self) -> MusicalIdea {
        let mut idea = MusicalIdea::default().with_moods(self.moods.iter().cloned());
        if let Some(genre) = &self.genre {
            idea = idea.with_genre(genre.clone());
        }
        if let Some(complexity) = self.complexity {
            idea = idea.with_complexity(complexity);
        }
        if let Some(tempo) = self.tempo {
            idea = idea.with_tempo(tempo);
        }
        if let Some(key) = &self.key {
            idea = idea.with_key(key.clone());
        }
        idea
    }

    /// Generator for this run: `--seed` if given, otherwise seeded from
    /// the clock with the seed logged.
    fn rng(&self) -> MuseRng {
        match self.seed {
            Some(seed) => MuseRng::new(seed),
            None => {
                let (seed, rng) = MuseRng::from_entropy();
                info!(seed, "no --seed given; rerun with this seed to reproduce");
                rng
            }
        }
    }

    /// Config file values with command-line flags applied on top.
    fn config(&self) -> Result<ComposerConfig> {
        let mut config = match &self.config {
            Some(path) => ComposerConfig::load(path)?,
            None => ComposerConfig::default(),
        };
        if self.grid.is_some() || self.swing.is_some() {
            let base = config.quantize.unwrap_or_default();
            let options = QuantizeOptions::new(
                self.grid.unwrap_or(base.grid_beats()),
                self.swing.unwrap_or(base.swing()),
            )
            .context("invalid --grid")?;
            config.quantize = Some(options);
        }
        if self.merged {
            config.layout = TrackLayout::Merged;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    let config = cli.config()?;

    if let Some(path) = &cli.from_json {
        return encode_file(&cli, &config, path);
    }

    let knowledge = InMemoryKnowledgeBase::fixture();
    let mut composer = Composer::new(config);
    if !cli.no_knowledge_base {
        composer = composer.with_knowledge_base(&knowledge);
    }
    let idea = cli.idea();

    if cli.context {
        println!("{}", composer.describe_context(&idea)?);
        return Ok(());
    }

    let mut rng = cli.rng();
    let composition = composer
        .compose(&idea, &mut rng)
        .context("composition failed")?;
    info!("{}", composition.sequence.summary().trim_end());
    info!("{}", stats_line(&composition.sequence));

    let bytes = match cli.emit {
        Emit::Midi => STANDARD
            .decode(&composition.midi_base64)
            .context("composer produced invalid base64")?,
        Emit::Base64 => format!("{}\n", composition.midi_base64).into_bytes(),
        Emit::Json => {
            let mut json = serde_json::to_string_pretty(&composition)?;
            json.push('\n');
            json.into_bytes()
        }
    };
    write_output(cli.output.as_deref(), &bytes)
}

/// `--from-json`: encode a note list or validate a base64 payload.
fn encode_file(cli: &Cli, config: &ComposerConfig, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let payload = WirePayload::from_json(&json)
        .with_context(|| format!("{} is not a wire payload", path.display()))?;
    let options = EncodeOptions {
        ticks_per_quarter: config.ticks_per_quarter,
        layout: config.layout,
        quantize: config.quantize,
        instrumentation: config.instrumentation.unwrap_or_default(),
        ..EncodeOptions::default()
    };
    let encoded = encode_payload(payload, &options, config.default_tempo)
        .with_context(|| format!("failed to encode {}", path.display()))?;

    let bytes = match cli.emit {
        Emit::Midi => STANDARD.decode(&encoded)?,
        Emit::Base64 | Emit::Json => format!("{encoded}\n").into_bytes(),
    };
    write_output(cli.output.as_deref(), &bytes)
}

/// Note counts, pitch range and length, e.g.
/// `12 notes (Melody 8, Bass 4), C2..G4, 8.0 beats, 4.0 s`.
fn stats_line(sequence: &NoteSequence) -> String {
    let stats = sequence.stats();
    let voices: Vec<String> = Voice::ALL
        .into_iter()
        .filter(|v| stats.per_voice[v.index()] > 0)
        .map(|v| format!("{} {}", v.name(), stats.per_voice[v.index()]))
        .collect();
    let range = match (stats.lowest_pitch, stats.highest_pitch) {
        (Some(lo), Some(hi)) => format!("{}..{}", midi_to_note_name(lo), midi_to_note_name(hi)),
        _ => "no pitches".to_string(),
    };
    format!(
        "{} notes ({}), {range}, {:.1} beats, {:.1} s",
        stats.total_notes,
        voices.join(", "),
        stats.length_beats,
        sequence.duration_seconds(),
    )
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
