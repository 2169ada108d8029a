//! RNG module - seeded deterministic randomness
//!
//! Terrain must be bit-identical for a given world seed across runs and
//! platforms, so we avoid thread-local or OS-seeded generators here.

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Seed from a 64-bit world seed, folding both halves in.
    pub fn from_world_seed(seed: u64) -> Self {
        Self::new((seed as u32) ^ ((seed >> 32) as u32).rotate_left(16))
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        self.next_u32() % max
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        // High bits of an LCG are the well-distributed ones.
        (self.next_u32() >> 8) as f64 / (1u32 << 24) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_zero_seed() {
        let mut rng = SimpleRng::new(0);
        let first = rng.next_u32();
        assert_ne!(first, 0);
    }

    #[test]
    fn test_next_f64_in_unit_interval() {
        let mut rng = SimpleRng::from_world_seed(0xdead_beef_cafe);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_world_seed_uses_high_bits() {
        let mut a = SimpleRng::from_world_seed(7);
        let mut b = SimpleRng::from_world_seed(7 | (1 << 40));
        assert_ne!(a.next_u32(), b.next_u32());
    }
}
