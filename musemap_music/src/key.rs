// Key resolution: from an optional "<Root>_<scale>" string to a KeyContext.
//
// A `KeyContext` is derived once per generation request and owned by it.
// It pins the root pitch class, the scale, and the MIDI note of the root
// in the melody register (middle C plus the root offset).
//
// Fallback rules:
// - no key, or a key whose root cannot be parsed: root C, scale chosen
//   from the mood set (`ScaleTable::mood_fallback`);
// - a parsable root with an unknown scale id: keep the root, use major,
//   and log a warning.
// Resolution never fails.

use crate::pitch::{parse_pitch_class, pitch_class_name};
use crate::scale::{ScaleDefinition, ScaleTable, ScaleType};
use std::collections::BTreeSet;
use tracing::warn;

/// MIDI note of C in the melody register (middle C).
pub const MIDDLE_C: u8 = 60;

/// Root, scale and melody-register base note for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContext {
    pub root_pitch_class: u8,
    pub scale: ScaleDefinition,
    pub base_midi_note: u8,
}

impl KeyContext {
    pub fn new(root_pitch_class: u8, scale: ScaleDefinition) -> Self {
        let root_pitch_class = root_pitch_class % 12;
        KeyContext {
            root_pitch_class,
            scale,
            base_midi_note: MIDDLE_C + root_pitch_class,
        }
    }

    /// Resolve a key string against a scale table, falling back on moods.
    pub fn resolve<S: AsRef<str>>(
        key: Option<&str>,
        moods: &BTreeSet<S>,
        table: &ScaleTable,
    ) -> Self {
        let mood_scale = || {
            let scale_type = table.mood_fallback(moods);
            table
                .get(scale_type.id())
                .cloned()
                .unwrap_or_else(|| ScaleDefinition::from_type(scale_type))
        };

        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            return KeyContext::new(0, mood_scale());
        };

        let Some((root_name, scale_id)) = key.split_once('_') else {
            warn!(key, "key is not of the form <Root>_<scale>, choosing scale from mood");
            return KeyContext::new(0, mood_scale());
        };
        let Some(root) = parse_pitch_class(root_name) else {
            warn!(key, root_name, "unknown key root, choosing scale from mood");
            return KeyContext::new(0, mood_scale());
        };

        let scale = match table.get(scale_id) {
            Some(scale) => scale.clone(),
            None => {
                warn!(key, scale_id, "unknown scale type, falling back to major");
                ScaleDefinition::from_type(ScaleType::Major)
            }
        };
        KeyContext::new(root, scale)
    }

    /// `"<Root>_<scale_id>"`, e.g. `"F#_harmonic_minor"`.
    pub fn label(&self) -> String {
        format!("{}_{}", pitch_class_name(self.root_pitch_class), self.scale.id())
    }

    /// MIDI pitch of an unwrapped scale degree.
    ///
    /// Degrees past the top of the scale climb into the next octave, so
    /// degree `len + 1` is the second degree an octave up. The result is
    /// clamped into 0..=127.
    pub fn degree_pitch(&self, degree: usize, octave_shift: i32) -> u8 {
        let len = self.scale.len().max(1);
        let offset = i32::from(self.scale.offsets()[degree % len]);
        let octave_rise = (degree / len) as i32;
        let pitch =
            i32::from(self.base_midi_note) + offset + 12 * (octave_rise + octave_shift);
        pitch.clamp(0, 127) as u8
    }

    /// MIDI key-signature pair: accidentals on the circle of fifths
    /// (positive sharps, negative flats) and the minor flag.
    pub fn key_signature(&self) -> (i8, bool) {
        let minor = self.scale.is_minor();
        // A minor key shares its signature with the major a minor third up.
        let major_pc = if minor {
            (self.root_pitch_class + 3) % 12
        } else {
            self.root_pitch_class
        };
        let fifths = ((u16::from(major_pc) * 7) % 12) as i8;
        let fifths = if fifths > 6 { fifths - 12 } else { fifths };
        (fifths, minor)
    }
}

/// Parse a key label back into a context using the built-in table.
///
/// Unlike `KeyContext::resolve` this is strict: unknown roots or scale ids
/// give `None`. Used when reading key metadata off a wire payload.
pub fn parse_key_label(label: &str) -> Option<KeyContext> {
    let (root_name, scale_id) = label.trim().split_once('_')?;
    let root = parse_pitch_class(root_name)?;
    let scale = ScaleTable::builtin().get(scale_id)?.clone();
    Some(KeyContext::new(root, scale))
}
