//! Chunk storage with least-recently-accessed eviction.

use std::collections::HashMap;

use crate::terrain::TerrainKind;
use crate::types::CHUNK_SIZE;

/// Chunk coordinate (not tile coordinate).
pub type ChunkKey = (i32, i32);

/// A `CHUNK_SIZE`×`CHUNK_SIZE` block of generated terrain.
#[derive(Debug, Clone)]
pub struct Chunk {
    tiles: Box<[TerrainKind]>,
    last_access: u64,
}

impl Chunk {
    pub(crate) fn new(tiles: Vec<TerrainKind>) -> Self {
        debug_assert_eq!(tiles.len(), (CHUNK_SIZE * CHUNK_SIZE) as usize);
        Self {
            tiles: tiles.into_boxed_slice(),
            last_access: 0,
        }
    }

    pub fn tiles(&self) -> &[TerrainKind] {
        &self.tiles
    }

    #[inline(always)]
    pub fn get(&self, lx: usize, ly: usize) -> TerrainKind {
        self.tiles[ly * CHUNK_SIZE as usize + lx]
    }

    pub fn last_access(&self) -> u64 {
        self.last_access
    }
}

/// Capacity-bounded chunk cache.
///
/// Access times come from a logical clock bumped on every lookup, so ordering
/// is exact even when many lookups land in the same millisecond.
#[derive(Debug)]
pub struct ChunkCache {
    capacity: usize,
    chunks: HashMap<ChunkKey, Chunk>,
    clock: u64,
    evictions: u64,
}

impl ChunkCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            chunks: HashMap::with_capacity(capacity + 1),
            clock: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    /// Total chunks evicted since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn last_access(&self, key: ChunkKey) -> Option<u64> {
        self.chunks.get(&key).map(Chunk::last_access)
    }

    /// Look up `key`, generating it on first reference, and mark it accessed.
    pub fn get_or_insert_with(
        &mut self,
        key: ChunkKey,
        generate: impl FnOnce() -> Chunk,
    ) -> &Chunk {
        self.clock += 1;
        let now = self.clock;
        if !self.chunks.contains_key(&key) {
            // Make room first so the new chunk can never be the victim.
            self.evict_down_to(self.capacity - 1);
        }
        let chunk = self.chunks.entry(key).or_insert_with(generate);
        chunk.last_access = now;
        chunk
    }

    /// Change the capacity, evicting immediately if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_down_to(self.capacity);
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    fn evict_down_to(&mut self, target: usize) {
        if self.chunks.len() <= target {
            return;
        }
        let mut by_age: Vec<(u64, ChunkKey)> = self
            .chunks
            .iter()
            .map(|(k, c)| (c.last_access, *k))
            .collect();
        by_age.sort_unstable();
        let excess = self.chunks.len() - target;
        for (_, key) in by_age.into_iter().take(excess) {
            self.chunks.remove(&key);
            self.evictions += 1;
            tracing::trace!(chunk_x = key.0, chunk_y = key.1, "evicted chunk");
        }
    }
}
