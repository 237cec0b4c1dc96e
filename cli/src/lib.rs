//! Terminal host for a [`burp_core::ChatSession`].

pub mod args;
pub mod input;
pub mod render;

pub use args::Cli;
pub use input::Command;
pub use render::Renderer;
pub use render::TerminalTranscript;
