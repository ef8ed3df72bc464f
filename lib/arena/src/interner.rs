use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::{Arena, Idx};

/// Structural hash-consing on top of [`Arena`]: interning the same `K` twice
/// returns the same [`Idx<K>`], so downstream equality on `Idx<K>` is
/// pointer-equality-cheap while still meaning structural equality. This is
/// the FoldingSet-like structure the constraint locator allocator is built
/// from.
pub struct Interner<K> {
    map: FxHashMap<K, Idx<K>>,
    arena: Arena<K>,
}

impl<K> Default for Interner<K> {
    fn default() -> Self {
        Interner { map: FxHashMap::default(), arena: Arena::new() }
    }
}

impl<K: Eq + Hash + Clone> Interner<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, key: K) -> Idx<K> {
        if let Some(idx) = self.map.get(&key) {
            return *idx;
        }
        let idx = self.arena.alloc(key.clone());
        self.map.insert(key, idx);
        idx
    }

    pub fn lookup(&self, idx: Idx<K>) -> &K {
        &self.arena[idx]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}
