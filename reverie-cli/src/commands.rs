//! Subcommand implementations. Each command loads the persisted graph, runs
//! against it and writes it back when it changed anything.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reverie_core::{ActivationMap, Concept, FileSnapshotSink, SemanticNetwork, Thought};
use tracing::{debug, info};

use crate::config::CliConfig;

/// A network bound to the snapshot file it was loaded from
pub struct Session {
    network: SemanticNetwork,
    sink: FileSnapshotSink,
    rng: StdRng,
    dirty: bool,
}

impl Session {
    /// Open the snapshot at `snapshot`, starting empty when it does not exist yet.
    pub fn open(config: &CliConfig, snapshot: PathBuf, seed: Option<u64>) -> Result<Self> {
        let network = SemanticNetwork::new(config.network.clone())
            .context("failed to build network from configuration")?
            .with_categories(config.category_table()?);
        let sink = FileSnapshotSink::new(snapshot);
        let loaded = network
            .load_snapshot(&sink)
            .with_context(|| format!("failed to load snapshot {}", sink.path().display()))?;
        if !loaded {
            info!(path = %sink.path().display(), "starting a new graph");
        }
        let rng = match seed.or(config.session.seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            network,
            sink,
            rng,
            dirty: false,
        })
    }

    #[must_use]
    pub const fn network(&self) -> &SemanticNetwork {
        &self.network
    }

    /// Persist the graph if any command mutated it
    pub fn finish(self) -> Result<()> {
        if !self.dirty {
            debug!("graph unchanged; snapshot not rewritten");
            return Ok(());
        }
        self.network
            .save_snapshot(&self.sink)
            .with_context(|| format!("failed to write snapshot {}", self.sink.path().display()))
    }

    pub fn add(
        &mut self,
        name: &str,
        category: Option<&str>,
        vector: Option<&str>,
    ) -> Result<Concept> {
        let vector = vector.map(parse_vector).transpose()?;
        let concept = self.network.add_tagged_concept(
            name,
            category.unwrap_or("unknown"),
            vector,
            &mut self.rng,
        )?;
        self.dirty = true;
        Ok(concept)
    }

    pub fn relate(&mut self, source: &str, target: &str, weight: f32, context: &str) -> Result<f32> {
        let weight = self.network.relate(source, target, weight, context)?;
        self.dirty = true;
        Ok(weight)
    }

    pub fn activate(&mut self, seeds: &[String]) -> Result<ActivationMap> {
        let outcome = self.network.activate(seeds, &mut self.rng)?;
        self.dirty = true;
        Ok(outcome.activation)
    }

    pub fn think(&mut self, seeds: &[String], cycles: usize, synthesize: bool) -> Result<Vec<Thought>> {
        let mut thoughts = Vec::with_capacity(cycles);
        for _ in 0..cycles {
            thoughts.push(self.network.think(seeds, synthesize, &mut self.rng)?);
            self.dirty = true;
        }
        Ok(thoughts)
    }

    pub fn reinforce(&mut self, trace: &[String], window: Option<usize>) -> Result<usize> {
        let window = window.unwrap_or(self.network.config().reinforce_window);
        let report = self.network.reinforce(trace, window)?;
        self.dirty = true;
        Ok(report.modifications())
    }

    pub fn synthesize(
        &mut self,
        parents: &[String],
        name: Option<String>,
        novelty: Option<f32>,
    ) -> Result<Concept> {
        let novelty = novelty.unwrap_or(self.network.config().uncertainty_base);
        let concept = self.network.synthesize(
            parents,
            novelty,
            |parents| {
                name.unwrap_or_else(|| {
                    parents
                        .iter()
                        .map(|c| c.name.as_str())
                        .collect::<Vec<_>>()
                        .join("+")
                })
            },
            &mut self.rng,
        )?;
        self.dirty = true;
        Ok(concept)
    }

    pub fn decay(&mut self) -> Result<String> {
        let report = self.network.decay_pass()?;
        self.dirty = true;
        Ok(format!(
            "decayed {} concepts and {} relations; pruned {} concepts and {} relations",
            report.decayed_concepts,
            report.decayed_relations,
            report.pruned.removed_concepts.len(),
            report.pruned.removed_relations.len()
        ))
    }

    pub fn prune(&mut self) -> String {
        let report = self.network.prune();
        if !report.is_empty() {
            self.dirty = true;
        }
        format!(
            "pruned {} concepts and {} relations",
            report.removed_concepts.len(),
            report.removed_relations.len()
        )
    }

    /// Graph view as pretty JSON, overlaid with a fresh activation when seeds are given
    pub fn export(&mut self, seeds: &[String]) -> Result<String> {
        let activation = if seeds.is_empty() {
            None
        } else {
            Some(self.network.propagate(seeds, &mut self.rng)?.activation)
        };
        let view = self.network.graph_view(activation.as_ref());
        Ok(serde_json::to_string_pretty(&view)?)
    }

    pub fn stats(&self) -> Vec<String> {
        let (concepts, relations, age) = self
            .network
            .read(|store| (store.len(), store.relation_count(), store.age()));
        let view = self.network.graph_view(None);
        let mut lines = vec![
            format!("snapshot: {}", self.sink.path().display()),
            format!("age: {age}"),
            format!("concepts: {concepts}"),
            format!("relations: {relations}"),
        ];
        lines.extend(
            view.categories
                .iter()
                .map(|(category, count)| format!("  {category}: {count}")),
        );
        lines
    }
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Parse a comma-separated vector such as `0.1,-0.4,0.9`.
pub fn parse_vector(raw: &str) -> Result<Vec<f32>> {
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f32>()
                .with_context(|| format!("'{part}' is not a number"))
        })
        .collect::<Result<Vec<_>>>()?;
    if values.is_empty() {
        bail!("vector must contain at least one component");
    }
    Ok(values)
}

/// Activation map as `name  value` lines, strongest first
#[must_use]
pub fn format_activation(activation: &ActivationMap) -> Vec<String> {
    let mut ranked: Vec<(&String, &f32)> = activation.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .map(|(name, value)| format!("{name:<24} {value:.4}"))
        .collect()
}

/// One-paragraph rendering of a finished thought
#[must_use]
pub fn format_thought(thought: &Thought) -> Vec<String> {
    let mut lines = vec![format!("cycle {}: {}", thought.cycle, thought.chain)];
    for link in &thought.unexpected {
        lines.push(format!(
            "  unexpected: {} ({}) -> {} ({}) novelty {:.2}",
            link.source, link.source_category, link.target, link.target_category, link.novelty
        ));
    }
    lines.push(format!(
        "  reinforced {} relations, created {}",
        thought.reinforcement.reinforced, thought.reinforcement.created
    ));
    if let Some(name) = &thought.synthesized {
        lines.push(format!("  synthesized: {name}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_parse_with_whitespace() {
        assert_eq!(parse_vector(" 0.5, -1 ,2").unwrap(), vec![0.5, -1.0, 2.0]);
        assert!(parse_vector("").is_err());
        assert!(parse_vector("a,b").is_err());
    }

    #[test]
    fn activation_lines_are_ranked() {
        let mut map = ActivationMap::new();
        map.insert("low".to_string(), 0.1);
        map.insert("high".to_string(), 0.9);
        let lines = format_activation(&map);
        assert!(lines[0].starts_with("high"));
    }
}
