//! Finite pack inventory.
//!
//! Power values `1..=N` are generated once at startup and bundled into packs
//! of [`PACK_SIZE`] consecutive values. Draws pick a random remaining pack,
//! so values leave the inventory without replacement. A value that does not
//! fill a whole pack is never issued.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use arena_types::constants::PACK_SIZE;

/// Three power values issued together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pack(pub [u64; PACK_SIZE]);

impl Pack {
    #[must_use]
    pub fn powers(&self) -> &[u64] {
        &self.0
    }
}

#[derive(Debug)]
pub struct PackInventory {
    packs: Vec<Pack>,
    rng: StdRng,
}

impl PackInventory {
    /// Build the inventory for values `1..=card_count`. A seed makes the
    /// draw order reproducible.
    #[must_use]
    pub fn generate(card_count: u64, seed: Option<u64>) -> Self {
        let values: Vec<u64> = (1..=card_count).collect();
        let packs: Vec<Pack> = values
            .chunks_exact(PACK_SIZE)
            .filter_map(|chunk| <[u64; PACK_SIZE]>::try_from(chunk).ok())
            .map(Pack)
            .collect();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        debug!(card_count, packs = packs.len(), seeded = seed.is_some(), "pack inventory generated");
        Self { packs, rng }
    }

    /// Remove and return a random pack. `None` once exhausted.
    pub fn draw(&mut self) -> Option<Pack> {
        if self.packs.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.packs.len());
        Some(self.packs.swap_remove(idx))
    }

    /// Put back a pack whose purchase did not go through.
    pub fn restore(&mut self, pack: Pack) {
        self.packs.push(pack);
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.packs.len()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.packs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn default_inventory_has_three_hundred_packs() {
        let inv = PackInventory::generate(900, Some(1));
        assert_eq!(inv.remaining(), 300);
    }

    #[test]
    fn draws_without_replacement_until_exhausted() {
        let mut inv = PackInventory::generate(30, Some(7));
        let mut seen = HashSet::new();
        while let Some(pack) = inv.draw() {
            for &v in pack.powers() {
                assert!((1..=30).contains(&v));
                assert!(seen.insert(v), "value {v} issued twice");
            }
        }
        assert_eq!(seen.len(), 30);
        assert!(inv.is_exhausted());
        assert!(inv.draw().is_none());
        assert!(inv.draw().is_none());
    }

    #[test]
    fn packs_are_consecutive_values() {
        let mut inv = PackInventory::generate(9, Some(3));
        let pack = inv.draw().unwrap();
        let [a, b, c] = pack.0;
        assert_eq!((b, c), (a + 1, a + 2));
        assert_eq!(a % 3, 1);
    }

    #[test]
    fn partial_tail_is_dropped() {
        let inv = PackInventory::generate(10, Some(0));
        assert_eq!(inv.remaining(), 3);
    }

    #[test]
    fn restore_returns_pack() {
        let mut inv = PackInventory::generate(3, Some(0));
        let pack = inv.draw().unwrap();
        assert!(inv.is_exhausted());
        inv.restore(pack);
        assert_eq!(inv.draw(), Some(pack));
    }

    #[test]
    fn same_seed_same_order() {
        let mut a = PackInventory::generate(90, Some(42));
        let mut b = PackInventory::generate(90, Some(42));
        for _ in 0..30 {
            assert_eq!(a.draw(), b.draw());
        }
    }
}
