// MIDI output from note sequences, and decoding back to notes.
//
// Converts notes into a Standard MIDI File (SMF) for playback. Output is
// always SMF Format 1 (multi-track):
// - Track 0 is the conductor track: title, tempo, time signature and, when
//   the key label names a known key, a key signature.
// - `TrackLayout::SplitByVoice` adds one track per voice that has notes;
//   `TrackLayout::Merged` puts every note in a single track. Either way
//   each voice plays on its own channel (channel = voice index) with a
//   program change from the `Instrumentation` table, so the decoder can
//   recover voices.
//
// Note times are converted to absolute ticks, sorted (note-offs before
// note-ons at the same tick, so repeated pitches re-trigger cleanly), then
// delta-encoded. Every note lasts at least one tick.
//
// Encoding is all-or-nothing: the first invalid note, tempo or time
// signature rejects the whole call. The byte stream is handed out either
// raw or base64-encoded (standard alphabet, padded) for text transports.
//
// Uses the `midly` crate for MIDI reading and writing.

use crate::error::EncodeError;
use crate::key::parse_key_label;
use crate::profile::Instrumentation;
use crate::quantize::{QuantizeOptions, quantize};
use crate::sequence::{Note, NoteSequence, TimeSignature, Voice};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Ticks per quarter note in MIDI output.
pub const DEFAULT_TICKS_PER_QUARTER: u16 = 480;

/// Tempo assumed by MIDI when a file carries no tempo event.
pub const MIDI_DEFAULT_TEMPO_BPM: f64 = 120.0;

const MAX_TICKS_PER_QUARTER: u16 = 0x7FFF;
const MAX_TEMPO_MICROS: f64 = 0xFF_FFFF as f64;
const MAX_TICK: u64 = 0x0FFF_FFFF;

/// How note tracks are laid out after the conductor track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackLayout {
    #[default]
    SplitByVoice,
    Merged,
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodeOptions {
    pub ticks_per_quarter: u16,
    /// Used by `encode_midi`; `encode_sequence` takes the sequence's own.
    pub time_signature: TimeSignature,
    pub layout: TrackLayout,
    /// Quantize notes before encoding.
    pub quantize: Option<QuantizeOptions>,
    /// Conductor track name; defaults to "MuseMap Composition in <key>".
    pub title: Option<String>,
    pub instrumentation: Instrumentation,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
            time_signature: TimeSignature::COMMON,
            layout: TrackLayout::SplitByVoice,
            quantize: None,
            title: None,
            instrumentation: Instrumentation::default(),
        }
    }
}

/// Encode bare notes with default options.
pub fn encode_midi(
    notes: &[Note],
    tempo_bpm: f64,
    time_signature: TimeSignature,
) -> Result<Vec<u8>, EncodeError> {
    let options = EncodeOptions {
        time_signature,
        ..EncodeOptions::default()
    };
    encode_notes(notes, tempo_bpm, None, &options)
}

/// Base64 form of `encode_midi`.
pub fn encode_midi_base64(
    notes: &[Note],
    tempo_bpm: f64,
    time_signature: TimeSignature,
) -> Result<String, EncodeError> {
    encode_midi(notes, tempo_bpm, time_signature).map(|bytes| STANDARD.encode(bytes))
}

/// Encode a full sequence, including its key signature.
pub fn encode_sequence(
    sequence: &NoteSequence,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let options = EncodeOptions {
        time_signature: sequence.time_signature,
        ..options.clone()
    };
    encode_notes(
        &sequence.notes,
        sequence.tempo_bpm,
        Some(sequence.key_label.as_str()),
        &options,
    )
}

/// Base64 form of `encode_sequence`.
pub fn encode_sequence_base64(
    sequence: &NoteSequence,
    options: &EncodeOptions,
) -> Result<String, EncodeError> {
    encode_sequence(sequence, options).map(|bytes| STANDARD.encode(bytes))
}

fn encode_notes(
    notes: &[Note],
    tempo_bpm: f64,
    key_label: Option<&str>,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let quantized;
    let notes = match &options.quantize {
        Some(q) => {
            quantized = quantize(notes, q);
            &quantized[..]
        }
        None => notes,
    };

    let title = match (&options.title, key_label) {
        (Some(title), _) => title.clone(),
        (None, Some(key)) => format!("MuseMap Composition in {key}"),
        (None, None) => "MuseMap Composition".to_string(),
    };

    let smf = build_smf(notes, tempo_bpm, key_label, &title, options)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    debug!(notes = notes.len(), tracks = smf.tracks.len(), bytes = buf.len(), "encoded MIDI");
    Ok(buf)
}

fn tempo_micros(tempo_bpm: f64) -> Result<u24, EncodeError> {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return Err(EncodeError::InvalidTempo(tempo_bpm));
    }
    let micros = (60_000_000.0 / tempo_bpm).round();
    if !(1.0..=MAX_TEMPO_MICROS).contains(&micros) {
        return Err(EncodeError::InvalidTempo(tempo_bpm));
    }
    Ok(u24::new(micros as u32))
}

/// Absolute on/off ticks for a note, validating it on the way.
fn note_ticks(index: usize, note: &Note, ticks_per_quarter: u16) -> Result<(u32, u32), EncodeError> {
    let bad_timing = || EncodeError::InvalidTiming {
        index,
        start: note.start_beats,
        duration: note.duration_beats,
    };
    if !note.start_beats.is_finite()
        || note.start_beats < 0.0
        || !note.duration_beats.is_finite()
        || note.duration_beats <= 0.0
    {
        return Err(bad_timing());
    }
    if note.pitch > 127 {
        return Err(EncodeError::PitchOutOfRange {
            pitch: i64::from(note.pitch),
        });
    }

    let tpq = f64::from(ticks_per_quarter);
    let start = (note.start_beats * tpq).round();
    let end = (note.end_beats() * tpq).round().max(start + 1.0);
    if end > MAX_TICK as f64 {
        return Err(bad_timing());
    }
    Ok((start as u32, end as u32))
}

/// Note-offs sort before note-ons at the same tick.
fn event_order_key(kind: &TrackEventKind) -> u8 {
    match kind {
        TrackEventKind::Midi { message, .. } => match message {
            MidiMessage::NoteOff { .. } => 0,
            MidiMessage::NoteOn { .. } => 1,
            _ => 2,
        },
        _ => 3,
    }
}

/// Sort absolute-tick events and convert them to a delta-timed track.
fn into_track<'a>(
    mut header: Track<'a>,
    mut events: Vec<(u32, TrackEventKind<'a>)>,
) -> Track<'a> {
    events.sort_by(|(ta, ea), (tb, eb)| {
        ta.cmp(tb)
            .then_with(|| event_order_key(ea).cmp(&event_order_key(eb)))
    });
    let mut last_tick = 0;
    for (tick, kind) in events {
        header.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind,
        });
        last_tick = tick;
    }
    header.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    header
}

fn meta(message: MetaMessage) -> TrackEvent {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(message),
    }
}

fn program_change<'a>(voice: Voice, instrumentation: &Instrumentation) -> TrackEvent<'a> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(voice.index() as u8),
            message: MidiMessage::ProgramChange {
                program: u7::new(instrumentation.program(voice).min(127)),
            },
        },
    }
}

fn build_smf<'a>(
    notes: &[Note],
    tempo_bpm: f64,
    key_label: Option<&str>,
    title: &'a str,
    options: &EncodeOptions,
) -> Result<Smf<'a>, EncodeError> {
    let tpq = options.ticks_per_quarter;
    if tpq == 0 || tpq > MAX_TICKS_PER_QUARTER {
        return Err(EncodeError::UnsupportedTiming);
    }
    let ts = options.time_signature;
    let ts = TimeSignature::new(ts.numerator, ts.denominator)?;
    let tempo = tempo_micros(tempo_bpm)?;

    // Gather note events per voice, validating every note first.
    let mut per_voice: BTreeMap<Voice, Vec<(u32, TrackEventKind<'a>)>> = BTreeMap::new();
    for (index, note) in notes.iter().enumerate() {
        let (start, end) = note_ticks(index, note, tpq)?;
        let channel = u4::new(note.voice.index() as u8);
        let key = u7::new(note.pitch);
        let vel = u7::new(note.velocity.clamp(1, 127));
        let events = per_voice.entry(note.voice).or_default();
        events.push((
            start,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            },
        ));
        events.push((
            end,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                },
            },
        ));
    }

    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(tpq))));

    // Track 0: conductor track
    let mut conductor: Track<'a> = vec![
        meta(MetaMessage::TrackName(title.as_bytes())),
        meta(MetaMessage::Tempo(tempo)),
        meta(MetaMessage::TimeSignature(
            ts.numerator,
            ts.denominator_exponent(),
            24,
            8,
        )),
    ];
    if let Some(key) = key_label.and_then(parse_key_label) {
        let (sharps, minor) = key.key_signature();
        conductor.push(meta(MetaMessage::KeySignature(sharps, minor)));
    }
    smf.tracks.push(into_track(conductor, Vec::new()));

    match options.layout {
        TrackLayout::SplitByVoice => {
            for (voice, events) in per_voice {
                let header = vec![
                    meta(MetaMessage::TrackName(voice.name().as_bytes())),
                    program_change(voice, &options.instrumentation),
                ];
                smf.tracks.push(into_track(header, events));
            }
        }
        TrackLayout::Merged => {
            if !per_voice.is_empty() {
                let mut header = vec![meta(MetaMessage::TrackName(b"Notes"))];
                header.extend(
                    per_voice
                        .keys()
                        .map(|&voice| program_change(voice, &options.instrumentation)),
                );
                let events = per_voice.into_values().flatten().collect();
                smf.tracks.push(into_track(header, events));
            }
        }
    }

    Ok(smf)
}

/// Notes and metadata read back from a MIDI file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMidi {
    /// Sorted by start time, then voice, then pitch.
    pub notes: Vec<Note>,
    /// First tempo event, or the MIDI default of 120.
    pub tempo_bpm: f64,
    /// First time signature event, or 4/4.
    pub time_signature: TimeSignature,
    pub key_signature: Option<(i8, bool)>,
    pub ticks_per_quarter: u16,
}

/// Decode base64 MIDI text.
pub fn decode_midi_base64(encoded: &str) -> Result<DecodedMidi, EncodeError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    decode_midi(&bytes)
}

/// Decode a Standard MIDI File into notes.
///
/// Note-ons pair with note-offs first-in first-out per (channel, key); a
/// note-on with velocity 0 counts as a note-off. Notes still sounding at
/// the end of their track end there. Channels 0..=3 map back to voices,
/// anything else is read as melody.
pub fn decode_midi(bytes: &[u8]) -> Result<DecodedMidi, EncodeError> {
    let smf = Smf::parse(bytes)?;
    let tpq = match smf.header.timing {
        Timing::Metrical(t) if t.as_int() > 0 => t.as_int(),
        _ => return Err(EncodeError::UnsupportedTiming),
    };
    // Absolute ticks are summed in u64: a track's deltas can add up past u32.
    let ticks_to_beats = |tick: u64| tick as f64 / f64::from(tpq);

    let mut tempo_bpm = None;
    let mut time_signature = None;
    let mut key_signature = None;
    let mut notes = Vec::new();

    for track in &smf.tracks {
        let mut tick: u64 = 0;
        let mut sounding: BTreeMap<(u8, u8), VecDeque<(u64, u8)>> = BTreeMap::new();
        let close = |notes: &mut Vec<Note>, channel: u8, key: u8, start: u64, vel: u8, end: u64| {
            notes.push(Note {
                pitch: key,
                start_beats: ticks_to_beats(start),
                duration_beats: ticks_to_beats(end.max(start + 1) - start),
                velocity: vel,
                voice: Voice::from_channel(channel).unwrap_or(Voice::Melody),
            });
        };

        for event in track {
            tick = tick.saturating_add(u64::from(event.delta.as_int()));
            match event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            sounding
                                .entry((channel, key.as_int()))
                                .or_default()
                                .push_back((tick, vel.as_int()));
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let key = key.as_int();
                            if let Some((start, vel)) = sounding
                                .get_mut(&(channel, key))
                                .and_then(VecDeque::pop_front)
                            {
                                close(&mut notes, channel, key, start, vel, tick);
                            }
                        }
                        _ => {}
                    }
                }
                TrackEventKind::Meta(MetaMessage::Tempo(micros)) if tempo_bpm.is_none() => {
                    if micros.as_int() > 0 {
                        tempo_bpm = Some(60_000_000.0 / f64::from(micros.as_int()));
                    }
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, den_exp, _, _))
                    if time_signature.is_none() && den_exp <= 6 =>
                {
                    time_signature = TimeSignature::new(num, 1 << den_exp).ok();
                }
                TrackEventKind::Meta(MetaMessage::KeySignature(sharps, minor))
                    if key_signature.is_none() =>
                {
                    key_signature = Some((sharps, minor));
                }
                _ => {}
            }
        }

        for ((channel, key), pending) in sounding {
            for (start, vel) in pending {
                close(&mut notes, channel, key, start, vel, tick);
            }
        }
    }

    notes.sort_by(|a, b| {
        a.start_beats
            .total_cmp(&b.start_beats)
            .then(a.voice.cmp(&b.voice))
            .then(a.pitch.cmp(&b.pitch))
    });

    Ok(DecodedMidi {
        notes,
        tempo_bpm: tempo_bpm.unwrap_or(MIDI_DEFAULT_TEMPO_BPM),
        time_signature: time_signature.unwrap_or_default(),
        key_signature,
        ticks_per_quarter: tpq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::generate_seeded;
    use crate::idea::MusicalIdea;

    fn note(pitch: u8, start: f64, duration: f64, voice: Voice) -> Note {
        Note {
            pitch,
            start_beats: start,
            duration_beats: duration,
            velocity: 90,
            voice,
        }
    }

    fn sequence(notes: Vec<Note>) -> NoteSequence {
        NoteSequence {
            notes,
            key_label: "F_major".into(),
            time_signature: TimeSignature::COMMON,
            tempo_bpm: 120.0,
        }
    }

    #[test]
    fn test_track_layouts() {
        let seq = sequence(vec![
            note(60, 0.0, 1.0, Voice::Melody),
            note(36, 0.0, 2.0, Voice::Bass),
        ]);
        let split = encode_sequence(&seq, &EncodeOptions::default()).unwrap();
        let smf = Smf::parse(&split).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::new(480)));
        // Conductor track plus one track per voice.
        assert_eq!(smf.tracks.len(), 3);

        let merged = EncodeOptions {
            layout: TrackLayout::Merged,
            ..EncodeOptions::default()
        };
        let bytes = encode_sequence(&seq, &merged).unwrap();
        assert_eq!(Smf::parse(&bytes).unwrap().tracks.len(), 2);
        assert_eq!(decode_midi(&bytes).unwrap().notes, decode_midi(&split).unwrap().notes);
    }

    #[test]
    fn test_conductor_track_metadata() {
        let seq = NoteSequence {
            tempo_bpm: 90.0,
            time_signature: TimeSignature::new(3, 4).unwrap(),
            ..sequence(vec![note(65, 0.0, 1.0, Voice::Melody)])
        };
        let bytes = encode_sequence(&seq, &EncodeOptions::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let kinds: Vec<TrackEventKind> = smf.tracks[0].iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds[0],
            TrackEventKind::Meta(MetaMessage::TrackName(b"MuseMap Composition in F_major"))
        );
        assert!(kinds.contains(&TrackEventKind::Meta(MetaMessage::Tempo(u24::new(666_667)))));
        assert!(kinds.contains(&TrackEventKind::Meta(MetaMessage::TimeSignature(3, 2, 24, 8))));
        assert!(kinds.contains(&TrackEventKind::Meta(MetaMessage::KeySignature(-1, false))));

        let decoded = decode_midi(&bytes).unwrap();
        assert!((decoded.tempo_bpm - 90.0).abs() < 1e-3);
        assert_eq!(decoded.time_signature, TimeSignature::new(3, 4).unwrap());
        assert_eq!(decoded.key_signature, Some((-1, false)));
    }

    #[test]
    fn test_program_changes_follow_instrumentation() {
        let seq = sequence(vec![note(36, 0.0, 1.0, Voice::Bass)]);
        let options = EncodeOptions {
            instrumentation: Instrumentation::for_genre("Jazz"),
            ..EncodeOptions::default()
        };
        let bytes = encode_sequence(&seq, &options).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let program = smf.tracks[1].iter().find_map(|e| match e.kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program },
            } => Some((channel.as_int(), program.as_int())),
            _ => None,
        });
        assert_eq!(program, Some((1, 32)));
    }

    #[test]
    fn test_generated_sequence_round_trips() {
        let idea = MusicalIdea::default()
            .with_genre("Jazz")
            .with_moods(["Happy"])
            .with_complexity(9);
        let seq = generate_seeded(&idea, 2024).unwrap();
        let bytes = encode_sequence(&seq, &EncodeOptions::default()).unwrap();
        let decoded = decode_midi(&bytes).unwrap();
        assert_eq!(decoded.notes.len(), seq.notes.len());

        let tick = 1.0 / 480.0;
        let mut expected = seq.notes.clone();
        expected.sort_by(|a, b| {
            a.start_beats
                .total_cmp(&b.start_beats)
                .then(a.voice.cmp(&b.voice))
                .then(a.pitch.cmp(&b.pitch))
        });
        for (orig, back) in expected.iter().zip(&decoded.notes) {
            assert_eq!((orig.pitch, orig.velocity, orig.voice), (back.pitch, back.velocity, back.voice));
            assert!((orig.start_beats - back.start_beats).abs() <= tick / 2.0 + 1e-9);
            assert!((orig.duration_beats - back.duration_beats).abs() <= tick + 1e-9);
        }
    }

    #[test]
    fn test_repeated_pitch_retriggers() {
        let notes = vec![
            note(60, 0.0, 0.5, Voice::Melody),
            note(60, 0.5, 0.5, Voice::Melody),
        ];
        let decoded = decode_midi(&encode_midi(&notes, 120.0, TimeSignature::COMMON).unwrap()).unwrap();
        assert_eq!(decoded.notes, notes);
    }

    #[test]
    fn test_tiny_notes_last_one_tick() {
        let notes = vec![note(60, 0.0, 0.0001, Voice::Melody)];
        let decoded = decode_midi(&encode_midi(&notes, 120.0, TimeSignature::COMMON).unwrap()).unwrap();
        assert_eq!(decoded.notes[0].duration_beats, 1.0 / 480.0);
    }

    #[test]
    fn test_quantize_option_applies() {
        let seq = sequence(vec![note(60, 0.23, 0.4, Voice::Melody)]);
        let options = EncodeOptions {
            quantize: Some(QuantizeOptions::straight(0.25).unwrap()),
            ..EncodeOptions::default()
        };
        let decoded = decode_midi(&encode_sequence(&seq, &options).unwrap()).unwrap();
        assert_eq!(decoded.notes[0].start_beats, 0.25);
        assert_eq!(decoded.notes[0].duration_beats, 0.375);
    }

    #[test]
    fn test_base64_round_trip() {
        let notes = vec![note(72, 1.0, 0.5, Voice::Melody)];
        let text = encode_midi_base64(&notes, 100.0, TimeSignature::COMMON).unwrap();
        // "MThd" header.
        assert!(text.starts_with("TVRoZA"));
        let decoded = decode_midi_base64(&text).unwrap();
        assert_eq!(decoded.notes, notes);
        assert!(decode_midi_base64("not base64!").is_err());
    }

    #[test]
    fn test_rejects_bad_input() {
        let good = vec![note(60, 0.0, 1.0, Voice::Melody)];
        for tempo in [0.0, -10.0, f64::NAN, 0.001] {
            assert!(matches!(
                encode_midi(&good, tempo, TimeSignature::COMMON),
                Err(EncodeError::InvalidTempo(_))
            ));
        }

        let odd = TimeSignature {
            numerator: 3,
            denominator: 5,
        };
        assert!(matches!(
            encode_midi(&good, 120.0, odd),
            Err(EncodeError::InvalidTimeSignature(_))
        ));

        let late = vec![good[0], note(60, -1.0, 1.0, Voice::Melody)];
        assert!(matches!(
            encode_midi(&late, 120.0, TimeSignature::COMMON),
            Err(EncodeError::InvalidTiming { index: 1, .. })
        ));
        let silent = vec![note(60, 0.0, 0.0, Voice::Melody)];
        assert!(encode_midi(&silent, 120.0, TimeSignature::COMMON).is_err());
        let high = vec![note(200, 0.0, 1.0, Voice::Melody)];
        assert!(matches!(
            encode_midi(&high, 120.0, TimeSignature::COMMON),
            Err(EncodeError::PitchOutOfRange { pitch: 200 })
        ));
        let bad_tpq = EncodeOptions {
            ticks_per_quarter: 0,
            ..EncodeOptions::default()
        };
        assert!(matches!(
            encode_sequence(&sequence(good), &bad_tpq),
            Err(EncodeError::UnsupportedTiming)
        ));
    }

    #[test]
    fn test_decode_velocity_zero_note_on_is_off() {
        let channel = u4::new(1);
        let on = |key: u8, vel: u8| TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        };
        let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(u15::new(96))));
        smf.tracks.push(vec![
            TrackEvent { delta: u28::new(0), kind: on(40, 100) },
            TrackEvent { delta: u28::new(0), kind: on(40, 90) },
            TrackEvent { delta: u28::new(96), kind: on(40, 0) },
            TrackEvent { delta: u28::new(96), kind: on(40, 0) },
            TrackEvent { delta: u28::new(0), kind: on(43, 70) },
            TrackEvent { delta: u28::new(0), kind: TrackEventKind::Meta(MetaMessage::EndOfTrack) },
        ]);
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();

        let decoded = decode_midi(&bytes).unwrap();
        assert_eq!(decoded.tempo_bpm, 120.0);
        assert_eq!(decoded.ticks_per_quarter, 96);
        let summary: Vec<(u8, f64, f64, u8, Voice)> = decoded
            .notes
            .iter()
            .map(|n| (n.pitch, n.start_beats, n.duration_beats, n.velocity, n.voice))
            .collect();
        // FIFO pairing: the first note-on is closed by the first note-off;
        // the dangling note ends one tick later at the end of the track.
        assert_eq!(
            summary,
            vec![
                (40, 0.0, 1.0, 100, Voice::Bass),
                (40, 0.0, 2.0, 90, Voice::Bass),
                (43, 2.0, 1.0 / 96.0, 70, Voice::Bass),
            ]
        );
    }

    #[test]
    fn test_decode_track_longer_than_u32_ticks() {
        let marker = TrackEvent {
            delta: u28::new(0x0FFF_FFFF),
            kind: TrackEventKind::Meta(MetaMessage::Marker(b"x")),
        };
        let key = |vel: u8| TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOn {
                key: u7::new(60),
                vel: u7::new(vel),
            },
        };
        let mut events = vec![marker; 17];
        events.push(TrackEvent { delta: u28::new(0), kind: key(80) });
        events.push(TrackEvent { delta: u28::new(96), kind: key(0) });
        events.push(TrackEvent { delta: u28::new(0), kind: TrackEventKind::Meta(MetaMessage::EndOfTrack) });
        let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(u15::new(96))));
        smf.tracks.push(events);
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();

        // 17 maximal deltas put the note past u32::MAX ticks.
        let start_tick = 17 * 0x0FFF_FFFF_u64;
        assert!(start_tick > u64::from(u32::MAX));
        let decoded = decode_midi(&bytes).unwrap();
        assert_eq!(decoded.notes.len(), 1);
        assert_eq!(decoded.notes[0].start_beats, start_tick as f64 / 96.0);
        assert_eq!(decoded.notes[0].duration_beats, 1.0);

        let text = STANDARD.encode(&bytes);
        let passed = crate::wire::encode_payload(
            crate::wire::WirePayload::Encoded(text.clone()),
            &EncodeOptions::default(),
            120.0,
        )
        .unwrap();
        assert_eq!(passed, text);
    }

    #[test]
    fn test_nested_same_pitch_pairs_first_in_first_out() {
        // An outer note with a shorter note of the same pitch inside it
        // cannot survive the trip: the inner note-off closes the outer note.
        let outer = note(60, 0.0, 4.0, Voice::Melody);
        let inner = Note {
            velocity: 50,
            ..note(60, 1.0, 1.0, Voice::Melody)
        };
        let bytes = encode_midi(&[outer, inner], 120.0, TimeSignature::COMMON).unwrap();
        let decoded = decode_midi(&bytes).unwrap();
        let summary: Vec<(f64, f64, u8)> = decoded
            .notes
            .iter()
            .map(|n| (n.start_beats, n.duration_beats, n.velocity))
            .collect();
        assert_eq!(summary, vec![(0.0, 2.0, 90), (1.0, 3.0, 50)]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_midi(b"nope"), Err(EncodeError::Midi(_))));
    }
}
