use crate::error::GenerationError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Supported song lengths, in 4/4 bars.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarCount {
    #[value(name = "4")]
    Four,
    #[default]
    #[value(name = "8")]
    Eight,
    #[value(name = "16")]
    Sixteen,
    #[value(name = "32")]
    ThirtyTwo,
}

impl BarCount {
    pub fn bars(self) -> u32 {
        match self {
            BarCount::Four => 4,
            BarCount::Eight => 8,
            BarCount::Sixteen => 16,
            BarCount::ThirtyTwo => 32,
        }
    }

    pub fn beats(self) -> u32 {
        self.bars() * 4
    }

    pub fn from_bars(bars: u32) -> Option<Self> {
        match bars {
            4 => Some(BarCount::Four),
            8 => Some(BarCount::Eight),
            16 => Some(BarCount::Sixteen),
            32 => Some(BarCount::ThirtyTwo),
            _ => None,
        }
    }
}

impl fmt::Display for BarCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bars())
    }
}

/// Instrument presets offered to the user; any other program number is still accepted.
pub const INSTRUMENT_PRESETS: &[(&str, u8)] = &[
    ("Acoustic Grand Piano", 0),
    ("Bright Acoustic Piano", 1),
    ("Electric Grand Piano", 2),
    ("Electric Piano 1", 4),
    ("Acoustic Guitar (nylon)", 24),
    ("Electric Guitar (jazz)", 26),
    ("Synth Lead", 80),
];

/// Everything the user chose for one generation attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    style: String,
    bars: BarCount,
    program: u8,
}

impl GenerationRequest {
    pub fn new(style: &str, bars: BarCount, program: u8) -> Result<Self, GenerationError> {
        let style = style.trim();
        if style.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "a music style is required".into(),
            ));
        }

        if program > 127 {
            return Err(GenerationError::InvalidRequest(format!(
                "program number {} is outside 0..=127",
                program
            )));
        }

        Ok(Self {
            style: style.to_owned(),
            bars,
            program,
        })
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn bars(&self) -> BarCount {
        self.bars
    }

    pub fn program(&self) -> u8 {
        self.program
    }
}

/// Where one attempt currently is. Attempts only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Requesting,
    Recovering,
    Encoding,
    Done,
}

/// Terminal outcome of one attempt.
#[derive(Debug)]
pub enum GenerationResult {
    Success(PathBuf),
    Failure(GenerationError),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            GenerationResult::Success(path) => Some(path),
            GenerationResult::Failure(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_validation() {
        assert!(GenerationRequest::new("  jazz  ", BarCount::Four, 26).is_ok());
        assert_eq!(
            GenerationRequest::new("  jazz  ", BarCount::Four, 26)
                .unwrap()
                .style(),
            "jazz"
        );
        assert!(matches!(
            GenerationRequest::new("   ", BarCount::Four, 0),
            Err(GenerationError::InvalidRequest(_))
        ));
        assert!(matches!(
            GenerationRequest::new("funk", BarCount::Four, 128),
            Err(GenerationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn bar_counts() {
        assert_eq!(BarCount::default().bars(), 8);
        assert_eq!(BarCount::Sixteen.beats(), 64);
        assert_eq!(BarCount::from_bars(32), Some(BarCount::ThirtyTwo));
        assert_eq!(BarCount::from_bars(12), None);
    }
}
