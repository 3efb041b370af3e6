//! Spreading activation behaviour observed through the public API.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

mod support;

use reverie_core::{ActivationParams, ActivationPropagator, ChainParams, ThoughtChainBuilder};
use std::time::Duration;
use support::{chain_store, rng, store_with};

fn propagator(depth: usize, temperature: f32) -> ActivationPropagator {
    ActivationPropagator::new(ActivationParams {
        depth,
        temperature,
        ..ActivationParams::default()
    })
    .unwrap()
}

#[test]
fn chain_decays_along_the_path() {
    let store = chain_store();
    let outcome = propagator(2, 0.0)
        .propagate(&store, &["A"], &mut rng(1))
        .unwrap();

    let b = outcome.activation_of("B");
    let c = outcome.activation_of("C");
    assert!(b > c, "B ({b}) should outrank C ({c})");
    assert!(c > 0.0);
    assert_eq!(outcome.activation.len(), 3);
    assert_eq!(outcome.activation_of("A"), 1.0);
}

#[test]
fn isolated_seed_stays_alone_at_any_depth() {
    let store = store_with(&["lonely", "other"]);
    for depth in [0, 1, 5] {
        let outcome = propagator(depth, 0.3)
            .propagate(&store, &["lonely"], &mut rng(depth as u64))
            .unwrap();
        assert_eq!(outcome.activation.len(), 1);
        assert_eq!(outcome.activation_of("lonely"), 1.0);
        assert_eq!(outcome.trace, vec!["lonely"]);
    }
}

#[test]
fn zero_temperature_is_bit_identical() {
    let store = chain_store();
    let first = propagator(3, 0.0)
        .propagate(&store, &["A"], &mut rng(42))
        .unwrap();
    let second = propagator(3, 0.0)
        .propagate(&store, &["A"], &mut rng(42))
        .unwrap();
    assert_eq!(first.trace, second.trace);
    for (name, value) in &first.activation {
        assert_eq!(value.to_bits(), second.activation[name].to_bits());
    }
}

#[test]
fn seeded_noise_is_reproducible() {
    let store = chain_store();
    let run = |seed| {
        propagator(3, 0.4)
            .propagate(&store, &["A"], &mut rng(seed))
            .unwrap()
    };
    assert_eq!(run(5), run(5));
}

#[test]
fn every_activation_stays_in_unit_range() {
    let mut store = store_with(&["hub", "a", "b", "c", "d", "e"]);
    for spoke in ["a", "b", "c", "d", "e"] {
        store.relate("hub", spoke, 1.0, "fan").unwrap();
        store.relate(spoke, "hub", 1.0, "fan").unwrap();
    }
    let outcome = propagator(4, 1.5)
        .propagate(&store, &["hub"], &mut rng(8))
        .unwrap();
    assert!(
        outcome
            .activation
            .values()
            .all(|v| (0.0..=1.0).contains(v))
    );
}

#[test]
fn exhausted_time_budget_truncates() {
    let store = chain_store();
    let propagator = ActivationPropagator::new(ActivationParams {
        depth: 3,
        temperature: 0.0,
        time_budget: Some(Duration::ZERO),
        ..ActivationParams::default()
    })
    .unwrap();
    let outcome = propagator.propagate(&store, &["A"], &mut rng(0)).unwrap();
    assert!(outcome.truncated);
    assert_eq!(outcome.rounds, 0);
    assert_eq!(outcome.activation.len(), 1);
}

#[test]
fn chain_follows_the_strongest_path() {
    let mut store = chain_store();
    store.add_concept("D", None, &mut rng(3)).unwrap();
    store.relate("A", "D", 0.3, "fixture").unwrap();
    let outcome = propagator(3, 0.0)
        .propagate(&store, &["A"], &mut rng(0))
        .unwrap();
    let builder = ThoughtChainBuilder::new(ChainParams {
        temperature: 0.0,
        ..ChainParams::default()
    })
    .unwrap();
    let chain = builder.build(&store, &outcome, &mut rng(0)).unwrap();
    assert_eq!(chain.concepts, vec!["A", "B", "C"]);
    assert_eq!(chain.to_string(), "A -> B -> C");
}
