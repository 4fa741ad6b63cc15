use crate::model::request::INSTRUMENT_PRESETS;
use log::info;

/// Resolves an instrument name or raw General MIDI program number.
pub fn parse_instrument(input: &str) -> u8 {
    let normalized = input.trim().to_lowercase();

    if let Ok(program) = normalized.parse::<u8>() {
        if program <= 127 {
            return program;
        }
        info!("Program {} is out of range, defaulting to 0 (Acoustic Grand Piano)..!", program);
        return 0;
    }

    match normalized.as_str() {
        "piano" | "grand" | "acoustic-piano" | "acoustic-grand-piano" => 0,
        "bright" | "bright-piano" | "bright-acoustic-piano" => 1,
        "electric-grand" | "electric-grand-piano" => 2,
        "ep" | "electric-piano" | "electric-piano-1" => 4,
        "guitar" | "nylon" | "nylon-guitar" | "acoustic-guitar" => 24,
        "jazz-guitar" | "electric-guitar" => 26,
        "lead" | "synth" | "synth-lead" => 80,
        other => {
            info!(
                "Unknown instrument '{}', defaulting to 0 (Acoustic Grand Piano)..!",
                other
            );
            0
        }
    }
}

/// Display name for a program number, if it is one of the presets.
pub fn instrument_name(program: u8) -> Option<&'static str> {
    INSTRUMENT_PRESETS
        .iter()
        .find(|(_, p)| *p == program)
        .map(|(name, _)| *name)
}
