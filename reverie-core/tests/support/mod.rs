//! Shared fixtures for integration tests.

#![allow(dead_code)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reverie_core::{ConceptStore, StoreConfig};

pub const DIM: usize = 8;

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

pub fn empty_store() -> ConceptStore {
    ConceptStore::new(StoreConfig {
        dim_vector: DIM,
        ..StoreConfig::default()
    })
    .unwrap()
}

/// Store holding the named concepts with random vectors and no relations.
pub fn store_with(names: &[&str]) -> ConceptStore {
    let mut rng = rng(99);
    let mut store = empty_store();
    for name in names {
        store.add_concept(name, None, &mut rng).unwrap();
    }
    store
}

/// A -> B (0.8), B -> C (0.5)
pub fn chain_store() -> ConceptStore {
    let mut store = store_with(&["A", "B", "C"]);
    store.relate("A", "B", 0.8, "fixture").unwrap();
    store.relate("B", "C", 0.5, "fixture").unwrap();
    store
}

pub fn trace(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}
