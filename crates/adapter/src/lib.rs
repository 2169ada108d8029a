//! Boundary to the authoritative game-state service.
//!
//! The render pipeline never owns game state. It asks for it through a
//! [`GameStateHandle`] (an `mpsc` request channel with per-call `oneshot`
//! replies, every call bounded by a timeout) and hears about world-wide
//! changes through a `broadcast` of [`WorldEvent`]s.
//!
//! [`LocalGameService`] is an in-process implementation used by the demo
//! binary and the tests.

pub mod local;
pub mod protocol;
pub mod runtime;

pub use termworld_types as types;

pub use local::LocalGameService;
pub use protocol::{apply_move, GameRequest, WorldEvent};
pub use runtime::{AdapterError, GameStateHandle, VisiblePlayers};
