// Quantizer: snap note timing to a rhythmic grid, with optional swing.
//
// Start times go to the nearest grid line (halves round away from zero).
// Notes landing on an odd grid line are then shifted by
// `(swing - 0.5) * grid`, so swing 0.5 is straight time, above it is late
// (laid back) and below it early. The shift is limited to 0.45 of a grid
// step so a swung note is still nearest its own grid line.
//
// Durations snap to quarter-grid steps, never below the smallest step
// count covering `MIN_DURATION_BEATS`.
//
// Both limits together make quantizing an already quantized sequence a
// no-op. No randomness is involved.

use crate::error::QuantizeError;
use crate::sequence::{Note, NoteSequence};
use serde::{Deserialize, Serialize};

/// Shortest duration a quantized note may have.
pub const MIN_DURATION_BEATS: f64 = 0.1;

/// Largest swing displacement, as a fraction of the grid.
const MAX_SWING_SHIFT: f64 = 0.45;

/// Quarter-grid resolution for durations.
const DURATION_SUBDIVISIONS: f64 = 4.0;

/// Grid and swing settings. Only constructible with a usable grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuantizeOptions", rename_all = "camelCase")]
pub struct QuantizeOptions {
    grid_beats: f64,
    swing: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuantizeOptions {
    grid_beats: f64,
    #[serde(default = "straight_swing")]
    swing: f64,
}

fn straight_swing() -> f64 {
    0.5
}

impl TryFrom<RawQuantizeOptions> for QuantizeOptions {
    type Error = QuantizeError;

    fn try_from(raw: RawQuantizeOptions) -> Result<Self, Self::Error> {
        QuantizeOptions::new(raw.grid_beats, raw.swing)
    }
}

impl QuantizeOptions {
    /// Grid must be finite and positive; swing is clamped into [0, 1]
    /// (a non-finite swing counts as straight).
    pub fn new(grid_beats: f64, swing: f64) -> Result<Self, QuantizeError> {
        if !grid_beats.is_finite() || grid_beats <= 0.0 {
            return Err(QuantizeError::InvalidGrid(grid_beats));
        }
        let swing = if swing.is_finite() {
            swing.clamp(0.0, 1.0)
        } else {
            straight_swing()
        };
        Ok(QuantizeOptions { grid_beats, swing })
    }

    /// Straight (unswung) quantization.
    pub fn straight(grid_beats: f64) -> Result<Self, QuantizeError> {
        QuantizeOptions::new(grid_beats, straight_swing())
    }

    pub fn grid_beats(&self) -> f64 {
        self.grid_beats
    }

    pub fn swing(&self) -> f64 {
        self.swing
    }

    fn swing_shift(&self) -> f64 {
        let limit = MAX_SWING_SHIFT * self.grid_beats;
        ((self.swing - 0.5) * self.grid_beats).clamp(-limit, limit)
    }

    fn min_duration_steps(&self, step: f64) -> f64 {
        // The epsilon keeps exact multiples (0.1 / 0.025) from rounding up.
        (MIN_DURATION_BEATS / step - 1e-9).ceil().max(1.0)
    }
}

impl Default for QuantizeOptions {
    /// Straight sixteenth notes.
    fn default() -> Self {
        QuantizeOptions {
            grid_beats: 0.25,
            swing: straight_swing(),
        }
    }
}

/// Quantize one note.
pub fn quantize_note(note: &Note, options: &QuantizeOptions) -> Note {
    let grid = options.grid_beats;
    let line = (note.start_beats / grid).round();
    let mut start = line * grid;
    if line.rem_euclid(2.0) == 1.0 {
        start += options.swing_shift();
    }

    let step = grid / DURATION_SUBDIVISIONS;
    let steps = (note.duration_beats / step)
        .round()
        .max(options.min_duration_steps(step));

    Note {
        start_beats: start.max(0.0),
        duration_beats: steps * step,
        ..*note
    }
}

/// Quantize every note, preserving order.
pub fn quantize(notes: &[Note], options: &QuantizeOptions) -> Vec<Note> {
    notes.iter().map(|n| quantize_note(n, options)).collect()
}

/// Quantized copy of a whole sequence.
pub fn quantize_sequence(sequence: &NoteSequence, options: &QuantizeOptions) -> NoteSequence {
    NoteSequence {
        notes: quantize(&sequence.notes, options),
        ..sequence.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Voice;

    fn note(start: f64, duration: f64) -> Note {
        Note {
            pitch: 60,
            start_beats: start,
            duration_beats: duration,
            velocity: 90,
            voice: Voice::Melody,
        }
    }

    #[test]
    fn test_rejects_bad_grid() {
        for grid in [0.0, -0.25, f64::NAN, f64::INFINITY] {
            assert!(QuantizeOptions::new(grid, 0.5).is_err());
        }
        let opts = QuantizeOptions::new(0.5, 3.0).unwrap();
        assert_eq!(opts.swing(), 1.0);
        assert_eq!(QuantizeOptions::new(0.5, f64::NAN).unwrap().swing(), 0.5);
    }

    #[test]
    fn test_snaps_to_nearest_line() {
        let opts = QuantizeOptions::straight(0.5).unwrap();
        assert_eq!(quantize_note(&note(0.2, 0.5), &opts).start_beats, 0.0);
        assert_eq!(quantize_note(&note(0.26, 0.5), &opts).start_beats, 0.5);
        assert_eq!(quantize_note(&note(1.9, 0.5), &opts).start_beats, 2.0);
        // Exactly halfway rounds away from zero.
        assert_eq!(quantize_note(&note(0.75, 0.5), &opts).start_beats, 1.0);
    }

    #[test]
    fn test_swing_moves_odd_lines_only() {
        let late = QuantizeOptions::new(0.5, 0.75).unwrap();
        assert_eq!(quantize_note(&note(1.0, 0.5), &late).start_beats, 1.0);
        assert_eq!(quantize_note(&note(0.5, 0.5), &late).start_beats, 0.625);
        let early = QuantizeOptions::new(0.5, 0.25).unwrap();
        assert_eq!(quantize_note(&note(1.5, 0.5), &early).start_beats, 1.375);
    }

    #[test]
    fn test_swing_shift_is_limited() {
        let full = QuantizeOptions::new(1.0, 1.0).unwrap();
        let q = quantize_note(&note(1.0, 1.0), &full);
        assert!((q.start_beats - 1.45).abs() < 1e-12);
    }

    #[test]
    fn test_durations_snap_with_floor() {
        let opts = QuantizeOptions::straight(0.5).unwrap();
        // Quarter-grid step is 0.125.
        assert_eq!(quantize_note(&note(0.0, 0.45), &opts).duration_beats, 0.5);
        assert_eq!(quantize_note(&note(0.0, 0.3), &opts).duration_beats, 0.25);
        assert_eq!(quantize_note(&note(0.0, 0.01), &opts).duration_beats, 0.125);

        // With a 0.1-beat grid the step is 0.025; the floor is four steps.
        let fine = QuantizeOptions::straight(0.1).unwrap();
        let q = quantize_note(&note(0.0, 0.001), &fine);
        assert!((q.duration_beats - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_keeps_identity_fields() {
        let opts = QuantizeOptions::default();
        let original = Note {
            pitch: 41,
            velocity: 77,
            voice: Voice::Bass,
            ..note(0.3, 1.2)
        };
        let q = quantize_note(&original, &opts);
        assert_eq!((q.pitch, q.velocity, q.voice), (41, 77, Voice::Bass));
    }

    #[test]
    fn test_idempotent() {
        let notes: Vec<Note> = (0..40)
            .map(|i| note(i as f64 * 0.37, 0.05 + i as f64 * 0.11))
            .collect();
        for swing in [0.0, 0.3, 0.5, 0.66, 1.0] {
            let opts = QuantizeOptions::new(0.25, swing).unwrap();
            let once = quantize(&notes, &opts);
            let twice = quantize(&once, &opts);
            assert_eq!(once, twice, "swing {swing}");
        }
    }

    #[test]
    fn test_serde_validates() {
        let opts: QuantizeOptions =
            serde_json::from_str(r#"{"gridBeats": 0.5, "swing": 0.6}"#).unwrap();
        assert_eq!(opts.grid_beats(), 0.5);
        let straight: QuantizeOptions = serde_json::from_str(r#"{"gridBeats": 0.25}"#).unwrap();
        assert_eq!(straight.swing(), 0.5);
        assert!(serde_json::from_str::<QuantizeOptions>(r#"{"gridBeats": 0}"#).is_err());
        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(json, r#"{"gridBeats":0.5,"swing":0.6}"#);
    }
}
