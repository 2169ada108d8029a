//! Session engine: one rendering pipeline per connected player.
//!
//! - [`config`]: session settings and environment overrides
//! - [`session`]: input handling and the per-tick render path
//! - [`predict`]: speculative pre-rendering of the next move
//! - [`runner`]: async loop tying a session to input and the game service

pub mod config;
pub mod predict;
pub mod runner;
pub mod session;

pub use termworld_adapter as adapter;
pub use termworld_core as core;
pub use termworld_input as input;
pub use termworld_term as term;
pub use termworld_types as types;

pub use config::{parse_resolutions, SessionConfig};
pub use predict::{
    classify_motion, Motion, MotionModel, PredictionCache, PredictionEntry, PredictionKind,
    PredictionStats, Probabilities,
};
pub use runner::{adaptive_interval, run_session, SessionSummary};
pub use session::{ActionOutcome, FrameReport, Session};
