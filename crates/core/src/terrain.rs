//! Procedural terrain: noise sampling, classification and chunk generation.
//!
//! Everything here is a pure function of the world seed and integer tile
//! coordinates, so two sessions on the same seed see the same world.

use noise::{NoiseFn, Perlin};

use crate::chunk::Chunk;
use crate::rng::SimpleRng;
use crate::types::CHUNK_SIZE;

/// Terrain classes produced by generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainKind {
    Water,
    Sand,
    Stone,
    Dirt,
    Grass,
}

impl TerrainKind {
    pub const ALL: [TerrainKind; 5] = [
        TerrainKind::Water,
        TerrainKind::Sand,
        TerrainKind::Stone,
        TerrainKind::Dirt,
        TerrainKind::Grass,
    ];

    /// Tile registry id for this terrain.
    pub fn tile_id(self) -> &'static str {
        match self {
            TerrainKind::Water => "water",
            TerrainKind::Sand => "sand",
            TerrainKind::Stone => "stone",
            TerrainKind::Dirt => "dirt",
            TerrainKind::Grass => "grass",
        }
    }

    pub fn walkable(self) -> bool {
        !matches!(self, TerrainKind::Water)
    }
}

/// Classification cut-offs. Elevation and moisture are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainThresholds {
    /// Below this elevation: water.
    pub water: f64,
    /// Below this (and not water): sand.
    pub sand: f64,
    /// Above this elevation: stone.
    pub stone: f64,
    /// Below this moisture: dirt, otherwise grass.
    pub dry: f64,
}

impl Default for TerrainThresholds {
    fn default() -> Self {
        Self {
            water: 0.30,
            sand: 0.35,
            stone: 0.75,
            dry: 0.35,
        }
    }
}

impl TerrainThresholds {
    pub fn classify(&self, elevation: f64, moisture: f64) -> TerrainKind {
        if elevation < self.water {
            TerrainKind::Water
        } else if elevation < self.sand {
            TerrainKind::Sand
        } else if elevation > self.stone {
            TerrainKind::Stone
        } else if moisture < self.dry {
            TerrainKind::Dirt
        } else {
            TerrainKind::Grass
        }
    }
}

/// Classify with the default thresholds.
pub fn classify(elevation: f64, moisture: f64) -> TerrainKind {
    TerrainThresholds::default().classify(elevation, moisture)
}

const OCTAVES: u32 = 3;
/// World tiles per noise unit at the first octave.
const FEATURE_SCALE: f64 = 1.0 / 24.0;
/// Stretch fractal output so both tails reach the thresholds.
const CONTRAST: f64 = 1.6;

/// Two independent seeded noise fields: elevation and moisture.
#[derive(Debug, Clone)]
pub struct NoiseField {
    seed: u64,
    elevation: Perlin,
    moisture: Perlin,
    elevation_offset: (f64, f64),
    moisture_offset: (f64, f64),
    thresholds: TerrainThresholds,
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        Self::with_thresholds(seed, TerrainThresholds::default())
    }

    pub fn with_thresholds(seed: u64, thresholds: TerrainThresholds) -> Self {
        let mut rng = SimpleRng::from_world_seed(seed);
        let elevation = Perlin::new(rng.next_u32());
        let moisture = Perlin::new(rng.next_u32());
        let mut offset = || (rng.next_f64() * 4096.0, rng.next_f64() * 4096.0);
        let elevation_offset = offset();
        let moisture_offset = offset();
        Self {
            seed,
            elevation,
            moisture,
            elevation_offset,
            moisture_offset,
            thresholds,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn thresholds(&self) -> &TerrainThresholds {
        &self.thresholds
    }

    pub fn elevation(&self, x: i32, y: i32) -> f64 {
        fractal(&self.elevation, self.elevation_offset, x, y)
    }

    pub fn moisture(&self, x: i32, y: i32) -> f64 {
        fractal(&self.moisture, self.moisture_offset, x, y)
    }

    pub fn terrain_at(&self, x: i32, y: i32) -> TerrainKind {
        self.thresholds.classify(self.elevation(x, y), self.moisture(x, y))
    }
}

fn fractal(noise: &Perlin, offset: (f64, f64), x: i32, y: i32) -> f64 {
    let mut sum = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = FEATURE_SCALE;
    let mut norm = 0.0;
    for _ in 0..OCTAVES {
        let nx = x as f64 * frequency + offset.0;
        let ny = y as f64 * frequency + offset.1;
        sum += noise.get([nx, ny]) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    ((sum / norm) * CONTRAST * 0.5 + 0.5).clamp(0.0, 1.0)
}

/// Chunk coordinate and in-chunk offset for a world tile coordinate.
pub fn chunk_coords(x: i32, y: i32) -> ((i32, i32), (usize, usize)) {
    let key = (x.div_euclid(CHUNK_SIZE), y.div_euclid(CHUNK_SIZE));
    let local = (
        x.rem_euclid(CHUNK_SIZE) as usize,
        y.rem_euclid(CHUNK_SIZE) as usize,
    );
    (key, local)
}

/// Generate chunk `(cx, cy)`; a pure function of the field's seed.
pub fn generate_chunk(field: &NoiseField, cx: i32, cy: i32) -> Chunk {
    let size = CHUNK_SIZE as usize;
    let mut tiles = Vec::with_capacity(size * size);
    for ly in 0..CHUNK_SIZE {
        for lx in 0..CHUNK_SIZE {
            tiles.push(field.terrain_at(cx * CHUNK_SIZE + lx, cy * CHUNK_SIZE + ly));
        }
    }
    Chunk::new(tiles)
}
