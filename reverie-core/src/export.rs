//! Render-ready view of the graph for dashboards and force layouts.

use crate::activation::ActivationMap;
use crate::category::Category;
use crate::metrics::MetricsSnapshot;
use crate::store::ConceptStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const BASE_SIZE: f32 = 4.0;
const STRENGTH_SIZE: f32 = 8.0;
const USAGE_SIZE: f32 = 2.0;

/// One drawable concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub category: Category,
    pub size: f32,
    pub color: String,
    pub activation: f32,
    pub activation_count: u64,
    pub strength: f32,
    /// Distinct concepts linked in either direction
    pub neighbors: usize,
}

/// One drawable relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

/// Counters shown alongside the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetrics {
    #[serde(rename = "ciclos")]
    pub cycles: u64,
    #[serde(rename = "auto_modificaciones")]
    pub auto_modifications: u64,
    #[serde(rename = "emergencias")]
    pub emergences: u64,
}

impl From<MetricsSnapshot> for GraphMetrics {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            cycles: snapshot.cycles,
            auto_modifications: snapshot.auto_modifications,
            emergences: snapshot.emergences,
        }
    }
}

/// Whole-graph export consumed by the visualisation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    #[serde(rename = "metricas")]
    pub metrics: GraphMetrics,
    /// Concept count per category
    #[serde(rename = "categorias")]
    pub categories: BTreeMap<Category, usize>,
}

impl GraphView {
    /// Build a view of `store`. Activation levels come from `activation` when
    /// given and are zero otherwise.
    #[must_use]
    pub fn build(
        store: &ConceptStore,
        activation: Option<&ActivationMap>,
        metrics: MetricsSnapshot,
    ) -> Self {
        let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let links: Vec<GraphLink> = store
            .relations()
            .map(|relation| {
                adjacency
                    .entry(relation.source.as_str())
                    .or_default()
                    .insert(relation.target.as_str());
                adjacency
                    .entry(relation.target.as_str())
                    .or_default()
                    .insert(relation.source.as_str());
                GraphLink {
                    source: relation.source.clone(),
                    target: relation.target.clone(),
                    weight: relation.weight,
                }
            })
            .collect();

        let mut categories: BTreeMap<Category, usize> = BTreeMap::new();
        let nodes = store
            .concepts()
            .map(|concept| {
                *categories.entry(concept.category).or_default() += 1;
                GraphNode {
                    id: concept.name.clone(),
                    category: concept.category,
                    size: node_size(concept.strength, concept.activation_count),
                    color: concept.category.color().to_string(),
                    activation: activation
                        .and_then(|map| map.get(&concept.name).copied())
                        .unwrap_or(0.0),
                    activation_count: concept.activation_count,
                    strength: concept.strength,
                    neighbors: adjacency.get(concept.name.as_str()).map_or(0, BTreeSet::len),
                }
            })
            .collect();

        Self {
            nodes,
            links,
            metrics: metrics.into(),
            categories,
        }
    }
}

/// Grows linearly with strength and logarithmically with use.
fn node_size(strength: f32, activation_count: u64) -> f32 {
    let usage = (activation_count as f32).ln_1p();
    USAGE_SIZE.mul_add(usage, STRENGTH_SIZE.mul_add(strength, BASE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptSpec;
    use crate::store::StoreConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn store() -> ConceptStore {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut store = ConceptStore::new(StoreConfig {
            dim_vector: 4,
            ..StoreConfig::default()
        })
        .unwrap();
        store
            .add_concept_with(ConceptSpec::new("sea").with_category(Category::Place), &mut rng)
            .unwrap();
        store
            .add_concept_with(
                ConceptSpec::new("calm").with_category(Category::Emotion),
                &mut rng,
            )
            .unwrap();
        store
            .add_concept_with(
                ConceptSpec::new("storm").with_category(Category::Emotion),
                &mut rng,
            )
            .unwrap();
        store.relate("sea", "calm", 0.6, "test").unwrap();
        store.relate("storm", "sea", 0.3, "test").unwrap();
        store
    }

    #[test]
    fn nodes_links_and_categories() {
        let store = store();
        let view = GraphView::build(&store, None, MetricsSnapshot::default());
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.links.len(), 2);
        assert_eq!(view.categories.get(&Category::Emotion), Some(&2));
        let sea = view.nodes.iter().find(|n| n.id == "sea").unwrap();
        assert_eq!(sea.neighbors, 2);
        assert_eq!(sea.color, Category::Place.color());
        assert_eq!(sea.activation, 0.0);
    }

    #[test]
    fn size_grows_with_use() {
        assert!(node_size(0.5, 10) > node_size(0.5, 0));
        assert!(node_size(0.9, 0) > node_size(0.1, 0));
    }

    #[test]
    fn serialises_dashboard_field_names() {
        let store = store();
        let mut activation = ActivationMap::new();
        activation.insert("sea".to_string(), 1.0);
        let metrics = MetricsSnapshot {
            cycles: 2,
            auto_modifications: 5,
            emergences: 1,
            syntheses: 0,
        };
        let view = GraphView::build(&store, Some(&activation), metrics);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["metricas"]["ciclos"], 2);
        assert_eq!(json["metricas"]["auto_modificaciones"], 5);
        assert_eq!(json["categorias"]["emotion"], 2);
        assert_eq!(json["nodes"][0]["activation"], 0.0);
    }
}
