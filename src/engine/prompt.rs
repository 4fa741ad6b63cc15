use crate::engine::ChatMessage;
use crate::model::note::TICKS_PER_BEAT;
use crate::model::request::GenerationRequest;

pub const SYSTEM_PROMPT: &str =
    "You are a strict JSON MIDI note generator. Only output valid JSON.";

/// The example object shown to the model. Kept as a constant so tests can feed it back in.
pub const EXAMPLE_RESPONSE: &str = r#"{
  "notes": [
    {"pitch": 64, "start_time": 0, "duration": 480, "velocity": 80},
    {"pitch": 67, "start_time": 0, "duration": 480, "velocity": 70},
    {"pitch": 71, "start_time": 0, "duration": 480, "velocity": 60},
    {"pitch": 72, "start_time": 480, "duration": 240, "velocity": 80}
  ]
}"#;

pub fn user_prompt(request: &GenerationRequest) -> String {
    let bars = request.bars();

    format!(
        "You are a strict JSON MIDI note generator and may only output parseable JSON.\n\
         Style: {style}. Make the opening different every time, true to the style, and keep the \
         harmony consistent so the whole piece stays in one key.\n\
         Length: about {bars} bars of 4/4 ({ticks} ticks = 1 beat), roughly {beats} beats in total.\n\
         Write a note sequence with both melody and harmony (chords). Any pitch is fine, velocity 40 to 100.\n\
         Try varied chord combinations and rhythms so the music feels natural and layered, and do not \
         open with a plain do-re-mi.\n\
         Always put several notes on the same start_time to form chords.\n\
         Output strictly one JSON object with a single \"notes\" array whose elements have integer \
         \"pitch\", \"start_time\", \"duration\" and \"velocity\" fields, like this example (for \
         reference only, prioritise the style and length):\n\
         {example}\n\
         Output only the JSON, with no explanation.",
        style = request.style(),
        bars = bars.bars(),
        ticks = TICKS_PER_BEAT,
        beats = bars.beats(),
        example = EXAMPLE_RESPONSE,
    )
}

/// System instruction followed by the user prompt for `request`.
pub fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt(request)),
    ]
}
