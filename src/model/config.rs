use crate::encoder::TimingMode;
use crate::model::request::BarCount;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_OUTPUT_NAME: &str = "generated_music.mid";

#[derive(Parser, Debug)]
#[command(
    name = "MIDI_MUSE",
    about = "Ask a language model for a song in some style and save it as a MIDI file!"
)]
pub struct Args {
    /// Music style to ask for, e.g. "hip-hop", "jazz", "funky".
    pub style: String,

    /// Length of the piece in 4/4 bars.
    #[arg(short, long, value_enum, default_value_t = BarCount::Eight)]
    pub bars: BarCount,

    /// Instrument preset name (piano|bright-piano|electric-grand|electric-piano|nylon-guitar|jazz-guitar|synth-lead)
    /// or a raw General MIDI program number 0..=127.
    #[arg(short, long, default_value = "piano")]
    pub instrument: String,

    /// Directory the MIDI file is written to.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also copy the generated file to this path.
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// How chord members are laid out on the timeline.
    #[arg(long, value_enum, default_value_t = TimingMode::Reference)]
    pub timing: TimingMode,

    /// Skip the model call and recover notes from a saved response instead.
    #[arg(short, long)]
    pub response_file: Option<PathBuf>,

    /// Print the recovered notes and exit without writing a MIDI file.
    #[arg(short, long, default_value_t = false)]
    pub dry_run: bool,

    /// Chat-completion endpoint.
    #[arg(long, env = "MIDI_MUSE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Model identifier sent with each request.
    #[arg(long, env = "MIDI_MUSE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Bearer credential for the endpoint.
    #[arg(long, env = "MIDI_MUSE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Sampling temperature.
    #[arg(long, default_value_t = 0.3)]
    pub temperature: f32,

    /// Maximum number of tokens the model may produce.
    #[arg(long, default_value_t = 2000)]
    pub max_tokens: u32,

    /// Give up on the model call after this many seconds.
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Prints extra information to the terminal.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Connection settings for the remote model. Passed explicitly to the backend, never global.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            temperature: 0.3,
            max_tokens: 2000,
            timeout_secs: 120,
        }
    }
}

impl From<&Args> for ModelConfig {
    fn from(args: &Args) -> Self {
        Self {
            endpoint: args.endpoint.clone(),
            api_key: args.api_key.clone(),
            model: args.model.clone(),
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            timeout_secs: args.timeout_secs,
        }
    }
}

/// Where and how a generator writes its artifacts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub base_name: String,
    pub timing: TimingMode,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            base_name: DEFAULT_OUTPUT_NAME.to_owned(),
            timing: TimingMode::Reference,
        }
    }
}

impl From<&Args> for GeneratorConfig {
    fn from(args: &Args) -> Self {
        Self {
            output_dir: args.output_dir.clone(),
            base_name: DEFAULT_OUTPUT_NAME.to_owned(),
            timing: args.timing,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn args_map_onto_configs() {
        let args = Args::parse_from([
            "MIDI_MUSE",
            "lo-fi",
            "--bars",
            "16",
            "--model",
            "some-model",
            "--api-key",
            "secret",
            "--timing",
            "absolute",
            "--output-dir",
            "out",
        ]);

        assert_eq!(args.bars, BarCount::Sixteen);

        let model = ModelConfig::from(&args);
        assert_eq!(model.model, "some-model");
        assert_eq!(model.api_key.as_deref(), Some("secret"));
        assert_eq!(model.max_tokens, 2000);

        let generator = GeneratorConfig::from(&args);
        assert_eq!(generator.output_dir, PathBuf::from("out"));
        assert_eq!(generator.timing, TimingMode::Absolute);
        assert_eq!(generator.base_name, DEFAULT_OUTPUT_NAME);
    }

    #[test]
    fn rejects_unsupported_bar_counts() {
        assert!(Args::try_parse_from(["MIDI_MUSE", "jazz", "--bars", "12"]).is_err());
    }
}
