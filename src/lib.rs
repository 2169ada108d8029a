//! termworld (workspace facade crate).
//!
//! Re-exports the pipeline crates under `termworld::{types,core,term,input,adapter,engine}`
//! so the demo binary, integration tests and benches share one import path.

pub use termworld_adapter as adapter;
pub use termworld_core as core;
pub use termworld_engine as engine;
pub use termworld_input as input;
pub use termworld_term as term;
pub use termworld_types as types;
