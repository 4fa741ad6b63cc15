use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ticks per quarter-note beat used for every generated sequence.
pub const TICKS_PER_BEAT: u16 = 480;

pub const DEFAULT_PITCH: i64 = 60;
pub const DEFAULT_START_TIME: i64 = 0;
pub const DEFAULT_DURATION: i64 = 480;
pub const DEFAULT_VELOCITY: i64 = 80;

/// One note as described by the model. Values are kept exactly as they were given,
/// bounds are only applied when the note is written out as MIDI.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteRecord {
    pub pitch: i64,
    pub start_time: i64,
    pub duration: i64,
    pub velocity: i64,
}

impl Default for NoteRecord {
    fn default() -> Self {
        Self {
            pitch: DEFAULT_PITCH,
            start_time: DEFAULT_START_TIME,
            duration: DEFAULT_DURATION,
            velocity: DEFAULT_VELOCITY,
        }
    }
}

impl NoteRecord {
    pub fn new(pitch: i64, start_time: i64, duration: i64, velocity: i64) -> Self {
        Self {
            pitch,
            start_time,
            duration,
            velocity,
        }
    }

    /// Builds a note from one element of the model's `notes` array, filling in defaults
    /// for anything missing. Returns `None` when the element isn't an object at all.
    pub fn from_json(value: &Value) -> Option<Self> {
        let Value::Object(fields) = value else {
            return None;
        };

        Some(Self {
            pitch: int_field(fields, "pitch", DEFAULT_PITCH),
            start_time: int_field(fields, "start_time", DEFAULT_START_TIME),
            duration: int_field(fields, "duration", DEFAULT_DURATION),
            velocity: int_field(fields, "velocity", DEFAULT_VELOCITY),
        })
    }

    pub fn end_time(&self) -> i64 {
        self.start_time.saturating_add(self.duration)
    }
}

fn int_field(fields: &Map<String, Value>, key: &str, default: i64) -> i64 {
    let Some(value) = fields.get(key) else {
        return default;
    };

    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64)),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        warn!(
            "Unusable value {} for field '{}', using default {}..!",
            value, key, default
        );
        default
    })
}
