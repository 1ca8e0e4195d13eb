//! Color key → shape lookup for hit decoding.
//!
//! Every live shape owns one random 24-bit key, unique within its `Scene`.
//! Keys are registered when the shape is created and released in the same
//! call that destroys it, so a stale key can only ever decode to "no hit".

use petgraph::stable_graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use strata_core::ColorKey;

#[derive(Debug, Clone)]
pub struct HitRegistry {
    shapes: HashMap<ColorKey, NodeIndex>,
    rng: StdRng,
}

impl Default for HitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HitRegistry {
    pub fn new() -> Self {
        Self {
            shapes: HashMap::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic key sequence, for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            shapes: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw random keys until one is free, then bind it to `shape`.
    pub fn allocate(&mut self, shape: NodeIndex) -> ColorKey {
        loop {
            let key = ColorKey::from_u32(self.rng.random_range(0..=ColorKey::MAX));
            if let std::collections::hash_map::Entry::Vacant(slot) = self.shapes.entry(key) {
                slot.insert(shape);
                return key;
            }
        }
    }

    pub fn release(&mut self, key: ColorKey) -> Option<NodeIndex> {
        self.shapes.remove(&key)
    }

    pub fn lookup(&self, key: ColorKey) -> Option<NodeIndex> {
        self.shapes.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique_and_resolvable() {
        let mut reg = HitRegistry::with_seed(7);
        let keys: Vec<_> = (0..500).map(|i| reg.allocate(NodeIndex::new(i))).collect();
        let distinct: HashSet<_> = keys.iter().copied().collect();
        assert_eq!(distinct.len(), keys.len());
        assert_eq!(reg.lookup(keys[42]), Some(NodeIndex::new(42)));
    }

    #[test]
    fn release_frees_the_key() {
        let mut reg = HitRegistry::with_seed(1);
        let key = reg.allocate(NodeIndex::new(0));
        assert_eq!(reg.release(key), Some(NodeIndex::new(0)));
        assert_eq!(reg.lookup(key), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn seeded_registries_agree() {
        let mut a = HitRegistry::with_seed(99);
        let mut b = HitRegistry::with_seed(99);
        assert_eq!(a.allocate(NodeIndex::new(0)), b.allocate(NodeIndex::new(0)));
    }
}
