//! Terminal input.
//!
//! Maps `crossterm` key events into [`crate::types::InputAction`]. Overlays get
//! first refusal on raw keys; see `termworld_term::OverlayStack::handle_key`.

pub mod map;

pub use termworld_types as types;

pub use map::{handle_key_event, should_quit};
