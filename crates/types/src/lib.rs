//! Core types module - shared data structures and constants
//!
//! This crate defines the data model shared by every layer of the rendering
//! pipeline: pixel grids, tiles, sprites and the visual state of players.
//! All types are plain data with no I/O, so they can be built by the content
//! loader, consumed by the compositor and shipped through the adapter alike.
//!
//! # Pixel model
//!
//! A [`PixelGrid`] is a rectangular, row-major grid of [`Pixel`] values.
//! `None` is the transparency sentinel, which keeps "nothing here" distinct
//! from black. Grids are immutable once built and are shared as
//! `Arc<PixelGrid>`.
//!
//! # Tuning constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `CHUNK_SIZE` | 16 | Tiles per chunk edge |
//! | `DEFAULT_CHUNK_CAPACITY` | 64 | Chunks kept per session before eviction |
//! | `BASE_TILE_SIZE` | 16 | Pixel size of base-resolution tiles |
//! | `ANIMATION_TICKS_PER_FRAME` | 15 | Render ticks per animation frame |
//! | `PREDICTION_FRESHNESS_MS` | 500 | Max age of a servable prediction |
//! | `DEFAULT_TICK_MS` | 50 | Base render interval |
//!
//! # Examples
//!
//! ```
//! use termworld_types::{Direction, PixelGrid, Rgb};
//!
//! let grid = PixelGrid::from_rows(vec![
//!     vec![Some(Rgb::new(255, 0, 0)), None],
//!     vec![None, Some(Rgb::new(0, 0, 0))],
//! ])
//! .unwrap();
//! assert_eq!(grid.width(), 2);
//! assert_eq!(grid.get(1, 0), Some(None));
//!
//! assert_eq!(Direction::Up.turn_right(), Direction::Right);
//! assert_eq!(Direction::Down.delta(), (0, 1));
//! ```

pub mod action;
pub mod asset;
pub mod pixel;
pub mod player;

pub use action::InputAction;
pub use asset::{DirectionalFrames, Sprite, Tile, TileAnimation};
pub use pixel::{Canvas, GridError, Pixel, PixelGrid, Rgb};
pub use player::{Direction, PlayerId, PlayerVisualState};

/// Tiles per chunk edge.
pub const CHUNK_SIZE: i32 = 16;

/// Chunks kept per session before least-recently-accessed eviction.
pub const DEFAULT_CHUNK_CAPACITY: usize = 64;

/// Pixel size of base-resolution tile and sprite art.
pub const BASE_TILE_SIZE: u16 = 16;

/// Supported precomputed resolutions, ascending.
pub const DEFAULT_RESOLUTIONS: [u16; 8] = [26, 32, 48, 64, 96, 128, 192, 256];

/// Render ticks per animation frame.
pub const ANIMATION_TICKS_PER_FRAME: u64 = 15;

/// Base render interval in milliseconds (20 FPS).
pub const DEFAULT_TICK_MS: u64 = 50;

/// Tile render size used when a session starts.
pub const DEFAULT_TILE_PX: u16 = 8;

/// Smallest and largest tile render sizes reachable by zooming.
pub const MIN_TILE_PX: u16 = 4;
pub const MAX_TILE_PX: u16 = 32;

/// Largest viewport edge in tiles; keeps pixel sizes well inside `u16`.
pub const MAX_VIEW_TILES: u16 = 255;

/// Predictions older than this are treated as misses.
pub const PREDICTION_FRESHNESS_MS: u64 = 500;

/// Recorded real movements used to learn transition probabilities.
pub const DEFAULT_MOTION_HISTORY: usize = 10;

/// Exponential moving average rate for transition probabilities.
pub const MOTION_LEARNING_RATE: f32 = 0.3;

/// Initial continue/stop weights; turn is always the remainder.
pub const INITIAL_CONTINUE_WEIGHT: f32 = 0.45;
pub const INITIAL_STOP_WEIGHT: f32 = 0.30;

/// Quantized brightness multipliers, ascending.
pub const BRIGHTNESS_LEVELS: [f32; 5] = [0.70, 0.85, 1.00, 1.15, 1.30];

/// Index of the neutral (1.0) brightness level.
pub const NEUTRAL_BRIGHTNESS_INDEX: usize = 2;

/// Brightness variants kept before eviction.
pub const DEFAULT_BRIGHTNESS_CAPACITY: usize = 2048;

/// Scaled grids kept before eviction.
pub const DEFAULT_SCALE_CAPACITY: usize = 1024;

/// Timeout for queries to the game-state service.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 40;
