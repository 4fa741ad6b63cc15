#![allow(non_snake_case)]

mod encoder;
mod engine;
mod error;
mod generator;
mod model;
mod recovery;
mod util;

pub use encoder::*;
pub use engine::http::HttpBackend;
pub use engine::prompt::{EXAMPLE_RESPONSE, SYSTEM_PROMPT, build_messages, user_prompt};
pub use engine::replay::ReplayBackend;
pub use engine::{ChatMessage, ModelBackend, Role};
pub use error::*;
pub use generator::*;
pub use model::config::*;
pub use model::note::*;
pub use model::request::*;
pub use recovery::*;
pub use util::*;
