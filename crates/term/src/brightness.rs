//! Lighting-adjusted copies of frequently drawn grids.
//!
//! Requests are snapped to one of [`BRIGHTNESS_LEVELS`] so a handful of
//! variants per source cover every lighting value.

use std::sync::Arc;

use crate::cache::{CacheStats, LruCache};
use crate::types::{PixelGrid, BRIGHTNESS_LEVELS, NEUTRAL_BRIGHTNESS_INDEX};

/// Distances closer than this count as a tie.
const TIE_EPSILON: f32 = 1e-4;

/// Index of the nearest level in [`BRIGHTNESS_LEVELS`]. Ties go to the
/// lower level, so 0.925 resolves to 0.85.
pub fn quantize(brightness: f32) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, level) in BRIGHTNESS_LEVELS.iter().enumerate() {
        let distance = (brightness - level).abs();
        if distance < best_distance - TIE_EPSILON {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// The quantized multiplier for `brightness`.
pub fn quantized_level(brightness: f32) -> f32 {
    BRIGHTNESS_LEVELS[quantize(brightness)]
}

type VariantKey = (usize, u8);

#[derive(Debug)]
pub struct BrightnessCache {
    cache: LruCache<VariantKey, (Arc<PixelGrid>, Arc<PixelGrid>)>,
}

impl BrightnessCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// `source` adjusted to the level nearest `brightness`. The neutral level
    /// hands back `source` itself.
    pub fn variant(&mut self, source: &Arc<PixelGrid>, brightness: f32) -> Arc<PixelGrid> {
        let level = quantize(brightness);
        if level == NEUTRAL_BRIGHTNESS_INDEX {
            return Arc::clone(source);
        }
        let key = (Arc::as_ptr(source) as usize, level as u8);
        let (_, variant) = self.cache.get_or_insert_with(key, || {
            let factor = BRIGHTNESS_LEVELS[level];
            (Arc::clone(source), Arc::new(source.map_opaque(|c| c.scaled(factor))))
        });
        variant
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
