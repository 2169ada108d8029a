//! Resolution selection and memoized nearest-neighbour scaling.

use std::sync::Arc;

use crate::cache::{CacheStats, LruCache};
use crate::types::PixelGrid;

/// Smallest candidate ≥ `size`, else the largest candidate. `None` only when
/// there are no candidates at all.
pub fn select_resolution(candidates: impl IntoIterator<Item = u16>, size: u16) -> Option<u16> {
    let mut best_above: Option<u16> = None;
    let mut largest: Option<u16> = None;
    for c in candidates {
        largest = Some(largest.map_or(c, |l| l.max(c)));
        if c >= size {
            best_above = Some(best_above.map_or(c, |b| b.min(c)));
        }
    }
    best_above.or(largest)
}

/// Nearest-neighbour resample. Returns `grid` itself when it already has the
/// requested size.
pub fn scale_nearest(grid: &Arc<PixelGrid>, width: u16, height: u16) -> Arc<PixelGrid> {
    if grid.width() == width && grid.height() == height {
        return Arc::clone(grid);
    }
    Arc::new(grid.resample_nearest(width, height))
}

/// Source identity is the source grid's allocation; each entry keeps its
/// source alive so an address can never be reused while it is a key.
type ScaleKey = (usize, u16, u16);

#[derive(Debug)]
pub struct ScaleCache {
    cache: LruCache<ScaleKey, (Arc<PixelGrid>, Arc<PixelGrid>)>,
}

impl ScaleCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn scale(&mut self, source: &Arc<PixelGrid>, width: u16, height: u16) -> Arc<PixelGrid> {
        if source.width() == width && source.height() == height {
            return Arc::clone(source);
        }
        let key = (Arc::as_ptr(source) as usize, width, height);
        let (_, scaled) = self.cache.get_or_insert_with(key, || {
            (Arc::clone(source), scale_nearest(source, width, height))
        });
        scaled
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    #[test]
    fn selects_smallest_at_or_above() {
        let keys = [26, 32, 48, 64, 256];
        assert_eq!(select_resolution(keys, 30), Some(32));
        assert_eq!(select_resolution(keys, 32), Some(32));
        assert_eq!(select_resolution(keys, 8), Some(26));
        assert_eq!(select_resolution(keys, 300), Some(256));
        assert_eq!(select_resolution([], 8), None);
    }

    #[test]
    fn selection_ignores_candidate_order() {
        assert_eq!(select_resolution([64, 16, 32], 20), Some(32));
    }

    #[test]
    fn scaling_to_own_size_is_identity() {
        let grid = Arc::new(PixelGrid::filled(4, 3, Some(Rgb::new(1, 2, 3))));
        let same = scale_nearest(&grid, 4, 3);
        assert!(Arc::ptr_eq(&grid, &same));

        let mut cache = ScaleCache::new(4);
        assert!(Arc::ptr_eq(&grid, &cache.scale(&grid, 4, 3)));
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_reuses_scaled_grid() {
        let grid = Arc::new(PixelGrid::filled(16, 16, None));
        let mut cache = ScaleCache::new(4);
        let a = cache.scale(&grid, 8, 8);
        let b = cache.scale(&grid, 8, 8);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!((a.width(), a.height()), (8, 8));
        assert_eq!(cache.stats().hits, 1);
    }
}
