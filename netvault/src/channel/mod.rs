//! Channel layer for prompt detection on an interactive shell.
//!
//! Output is accumulated in a [`PromptBuffer`] with terminal escapes
//! stripped; completion is decided by matching the last non-empty line
//! against the vendor's prompt pattern.

mod buffer;
mod patterns;

pub use buffer::PromptBuffer;
pub use patterns::{compile_prompt_pattern, last_non_empty_line};
