//! Stable 64-bit FNV-1a hasher.
//!
//! `DefaultHasher` output is not guaranteed stable across Rust versions or
//! platforms, and placeholder colors and frame fingerprints must be.

use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// FNV-1a of raw bytes.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = Fnv1aHasher::new();
    h.write(bytes);
    h.finish()
}

/// FNV-1a of any `Hash` value.
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut h = Fnv1aHasher::new();
    value.hash(&mut h);
    h.finish()
}
