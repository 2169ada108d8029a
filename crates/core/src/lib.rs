//! World module - procedural terrain and per-session world state
//!
//! This crate owns everything the renderer reads from the world. It has
//! **no dependencies** on terminals or networking, so it is:
//!
//! - **Deterministic**: the same seed produces identical terrain and rotations
//! - **Bounded**: chunks are generated lazily and evicted least-recently-used
//! - **Session-private**: one [`World`] per session, no locking
//!
//! # Module Structure
//!
//! - [`terrain`]: seeded noise fields, threshold classification, chunk generation
//! - [`chunk`]: chunk storage with access-time eviction
//! - [`rotation`]: coordinate hash deciding each tile's visual rotation
//! - [`world`]: the World Data Provider ([`WorldData`]) and player bookkeeping
//! - [`content`]: built-in art and the external content pack format
//! - [`rng`]: LCG used wherever seeded randomness is needed
//! - [`hash`]: stable FNV-1a hashing for anything derived from identifiers
//!
//! # Example
//!
//! ```
//! use termworld_core::{builtin_content, World, WorldConfig, WorldData};
//!
//! let mut world = World::new(WorldConfig::with_seed(42), "p1");
//! world.install(&builtin_content(&[32]));
//!
//! let a = world.tile(10, -4).unwrap();
//! let b = world.tile(10, -4).unwrap();
//! assert_eq!(a.id, b.id);
//! assert_eq!(a.pixels, b.pixels);
//! ```

pub mod chunk;
pub mod content;
pub mod hash;
pub mod rng;
pub mod rotation;
pub mod terrain;
pub mod world;

pub use termworld_types as types;

pub use chunk::{Chunk, ChunkCache, ChunkKey};
pub use content::{builtin_content, ContentError, ContentPack, DEFAULT_SPRITE_ID};
pub use hash::{fnv1a, stable_hash, Fnv1aHasher};
pub use rng::SimpleRng;
pub use rotation::{rotate_grid, rotated_tile, RotationHash};
pub use terrain::{chunk_coords, classify, generate_chunk, NoiseField, TerrainKind, TerrainThresholds};
pub use world::{World, WorldConfig, WorldData, VOID_TILE_ID};
