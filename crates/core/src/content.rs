//! Tile and sprite content.
//!
//! Art is produced by an external content pipeline and arrives as opaque
//! pixel grids. This module decodes that format and also provides a small
//! built-in pack so a world can render before any external content lands.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::hash::fnv1a;
use crate::rng::SimpleRng;
use crate::types::{
    DirectionalFrames, GridError, PixelGrid, Rgb, Sprite, Tile, TileAnimation, BASE_TILE_SIZE,
};
use crate::world::VOID_TILE_ID;

/// Sprite id of the built-in player character.
pub const DEFAULT_SPRITE_ID: &str = "default";

/// Largest resolution the built-in pack precomputes; bigger sizes are scaled
/// on demand by the compositor.
pub const MAX_PRECOMPUTED_SIZE: u16 = 64;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("content io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{asset}: {source}")]
    Grid {
        asset: String,
        #[source]
        source: GridError,
    },
}

/// Decoded tiles plus sprites keyed by sprite id.
#[derive(Debug, Clone, Default)]
pub struct ContentPack {
    pub tiles: Vec<Tile>,
    pub sprites: BTreeMap<String, Sprite>,
}

impl ContentPack {
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let raw: RawPack = serde_json::from_str(json)?;
        raw.decode()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add `other`'s assets, replacing same-id entries.
    pub fn merge(&mut self, other: ContentPack) {
        for tile in other.tiles {
            self.tiles.retain(|t| t.id != tile.id);
            self.tiles.push(tile);
        }
        self.sprites.extend(other.sprites);
    }

    pub fn tile(&self, id: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }
}

/// Rows of `[r, g, b]` triples; `null` is a transparent pixel.
type RawGrid = Vec<Vec<Option<[u8; 3]>>>;

#[derive(Debug, Deserialize)]
struct RawPack {
    #[serde(default)]
    tiles: Vec<RawTile>,
    #[serde(default)]
    sprites: Vec<RawSprite>,
}

#[derive(Debug, Deserialize)]
struct RawTile {
    id: String,
    name: Option<String>,
    #[serde(default = "default_walkable")]
    walkable: bool,
    pixels: RawGrid,
    #[serde(default)]
    resolutions: BTreeMap<u16, RawGrid>,
    animation: Option<RawAnimation>,
}

fn default_walkable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawAnimation {
    frames: Vec<RawGrid>,
    #[serde(default)]
    resolution_frames: BTreeMap<u16, Vec<RawGrid>>,
}

#[derive(Debug, Deserialize)]
struct RawSprite {
    id: String,
    frames: RawFrames,
    #[serde(default)]
    resolutions: BTreeMap<u16, RawFrames>,
}

#[derive(Debug, Deserialize)]
struct RawFrames {
    up: Vec<RawGrid>,
    down: Vec<RawGrid>,
    left: Vec<RawGrid>,
    right: Vec<RawGrid>,
}

impl RawPack {
    fn decode(self) -> Result<ContentPack, ContentError> {
        let mut pack = ContentPack::default();
        for raw in self.tiles {
            let asset = raw.id.clone();
            let mut tile = Tile::new(
                raw.id.clone(),
                raw.name.unwrap_or_else(|| raw.id.clone()),
                raw.walkable,
                grid(&asset, raw.pixels)?,
            );
            for (size, g) in raw.resolutions {
                tile = tile.with_resolution(size, grid(&asset, g)?);
            }
            if let Some(anim) = raw.animation {
                tile = tile.with_animation(TileAnimation {
                    frames: grids(&asset, anim.frames)?,
                    resolution_frames: anim
                        .resolution_frames
                        .into_iter()
                        .map(|(size, fs)| Ok((size, grids(&asset, fs)?)))
                        .collect::<Result<_, ContentError>>()?,
                });
            }
            pack.tiles.push(tile);
        }
        for raw in self.sprites {
            let asset = raw.id.clone();
            let frames = raw.frames.decode(&asset)?;
            let (width, height) = frames
                .down
                .first()
                .map_or((0, 0), |g| (g.width(), g.height()));
            let mut sprite = Sprite::new(width, height, frames);
            for (size, fs) in raw.resolutions {
                sprite.resolutions.insert(size, fs.decode(&asset)?);
            }
            pack.sprites.insert(raw.id, sprite);
        }
        Ok(pack)
    }
}

impl RawFrames {
    fn decode(self, asset: &str) -> Result<DirectionalFrames, ContentError> {
        Ok(DirectionalFrames {
            up: grids(asset, self.up)?,
            down: grids(asset, self.down)?,
            left: grids(asset, self.left)?,
            right: grids(asset, self.right)?,
        })
    }
}

fn grid(asset: &str, raw: RawGrid) -> Result<PixelGrid, ContentError> {
    let rows = raw
        .into_iter()
        .map(|row| row.into_iter().map(|p| p.map(|[r, g, b]| Rgb::new(r, g, b))).collect())
        .collect();
    PixelGrid::from_rows(rows).map_err(|source| ContentError::Grid {
        asset: asset.to_string(),
        source,
    })
}

fn grids(asset: &str, raw: Vec<RawGrid>) -> Result<Vec<Arc<PixelGrid>>, ContentError> {
    raw.into_iter().map(|g| grid(asset, g).map(Arc::new)).collect()
}

/// Built-in terrain tiles, a void tile and a `"default"` player sprite, with
/// resolution variants precomputed for each of `resolutions` up to
/// [`MAX_PRECOMPUTED_SIZE`].
pub fn builtin_content(resolutions: &[u16]) -> ContentPack {
    let sizes: Vec<u16> = resolutions
        .iter()
        .copied()
        .filter(|s| *s != BASE_TILE_SIZE && *s <= MAX_PRECOMPUTED_SIZE)
        .collect();

    let mut tiles = vec![
        speckled("sand", "Sand", true, Rgb::new(219, 201, 142)),
        speckled("stone", "Stone", true, Rgb::new(128, 128, 134)),
        speckled("dirt", "Dirt", true, Rgb::new(121, 86, 56)),
        speckled("grass", "Grass", true, Rgb::new(72, 148, 62)),
        speckled(VOID_TILE_ID, "Void", false, Rgb::new(12, 12, 18)),
        water(),
    ];
    for tile in &mut tiles {
        precompute_tile(tile, &sizes);
    }

    let mut sprite = default_sprite();
    for &size in &sizes {
        let scaled = scale_frames(&sprite.frames, size);
        sprite.resolutions.insert(size, scaled);
    }

    ContentPack {
        tiles,
        sprites: BTreeMap::from([(DEFAULT_SPRITE_ID.to_string(), sprite)]),
    }
}

fn precompute_tile(tile: &mut Tile, sizes: &[u16]) {
    for &size in sizes {
        let scaled = tile.pixels.resample_nearest(size, size);
        tile.resolutions.insert(size, Arc::new(scaled));
        if let Some(anim) = tile.animation.as_mut() {
            let frames = anim
                .frames
                .iter()
                .map(|f| Arc::new(f.resample_nearest(size, size)))
                .collect();
            anim.resolution_frames.insert(size, frames);
        }
    }
}

fn scale_frames(frames: &DirectionalFrames, size: u16) -> DirectionalFrames {
    let scale = |fs: &[Arc<PixelGrid>]| -> Vec<Arc<PixelGrid>> {
        fs.iter().map(|f| Arc::new(f.resample_nearest(size, size))).collect()
    };
    DirectionalFrames {
        up: scale(&frames.up),
        down: scale(&frames.down),
        left: scale(&frames.left),
        right: scale(&frames.right),
    }
}

fn name_seed(name: &str) -> u32 {
    fnv1a(name.as_bytes()) as u32
}

fn speckled(id: &str, name: &str, walkable: bool, base: Rgb) -> Tile {
    let mut rng = SimpleRng::new(name_seed(id));
    let size = BASE_TILE_SIZE;
    let grid = PixelGrid::from_fn(size, size, |x, y| {
        let jitter = 0.86 + rng.next_f64() as f32 * 0.28;
        // A darker top-left notch makes rotations visible.
        let notch = if x < 3 && y < 2 { 0.8 } else { 1.0 };
        Some(base.scaled(jitter * notch))
    });
    Tile::new(id, name, walkable, grid)
}

fn water() -> Tile {
    let size = BASE_TILE_SIZE;
    let deep = Rgb::new(38, 92, 196);
    let crest = Rgb::new(120, 170, 235);
    let frame = |phase: u16| {
        Arc::new(PixelGrid::from_fn(size, size, |x, y| {
            if (y + phase + x / 4) % 6 == 0 {
                Some(crest)
            } else {
                Some(deep)
            }
        }))
    };
    let frames = vec![frame(0), frame(3)];
    Tile {
        id: "water".to_string(),
        name: "Water".to_string(),
        walkable: false,
        pixels: Arc::clone(&frames[0]),
        resolutions: BTreeMap::new(),
        animation: Some(TileAnimation {
            frames,
            resolution_frames: BTreeMap::new(),
        }),
    }
}

const HAIR: Rgb = Rgb::new(84, 52, 30);
const SKIN: Rgb = Rgb::new(232, 190, 150);
const EYE: Rgb = Rgb::new(20, 20, 30);
const SHIRT: Rgb = Rgb::new(62, 104, 204);
const PANTS: Rgb = Rgb::new(48, 48, 70);

fn default_sprite() -> Sprite {
    let size = BASE_TILE_SIZE;
    let frames = DirectionalFrames {
        up: vec![character(None, 0), character(None, 1)],
        down: vec![character(Some(&[6, 9][..]), 0), character(Some(&[6, 9][..]), 1)],
        left: vec![character(Some(&[5][..]), 0), character(Some(&[5][..]), 1)],
        right: vec![character(Some(&[10][..]), 0), character(Some(&[10][..]), 1)],
    };
    Sprite::new(size, size, frames)
}

/// A 16×16 figure. `eyes` are eye columns (`None` = seen from behind);
/// `step` alternates the leg pose.
fn character(eyes: Option<&[u16]>, step: u16) -> Arc<PixelGrid> {
    let size = BASE_TILE_SIZE;
    Arc::new(PixelGrid::from_fn(size, size, |x, y| match y {
        1..=2 if (5..=10).contains(&x) => Some(HAIR),
        3..=6 if (5..=10).contains(&x) => {
            let face = eyes.is_some();
            if !face || (y == 3) {
                Some(HAIR)
            } else if y == 4 && eyes.is_some_and(|e| e.contains(&x)) {
                Some(EYE)
            } else {
                Some(SKIN)
            }
        }
        7..=11 if (4..=11).contains(&x) => Some(SHIRT),
        12..=14 => {
            let (l, r) = if step == 0 { (6, 9) } else { (5, 10) };
            (x == l || x == l + 1 || x == r || x == r - 1).then_some(PANTS)
        }
        _ => None,
    }))
}
