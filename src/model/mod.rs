pub mod config;
pub mod note;
pub mod request;
