use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use reverie_core::{Category, CategoryTable, NetworkConfig};
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Everything the CLI reads from its TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    /// Provenance tag -> category
    pub categories: BTreeMap<String, Category>,
}

impl CliConfig {
    /// The configuration shipped inside the binary
    pub fn embedded() -> Result<Self> {
        let table = embedded_table()?;
        Self::from_table(table)
    }

    fn from_table(table: Table) -> Result<Self> {
        let config: Self = Value::Table(table)
            .try_into()
            .context("configuration does not match the expected layout")?;
        config
            .network
            .validate()
            .context("invalid [network] settings")?;
        Ok(config)
    }

    pub fn category_table(&self) -> Result<CategoryTable> {
        Ok(CategoryTable::new(
            self.categories.iter().map(|(tag, category)| (tag, *category)),
        )?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Empty selects the platform data directory
    pub snapshot_path: String,
}

impl StorageConfig {
    pub fn resolve_snapshot_path(&self) -> Result<PathBuf> {
        if !self.snapshot_path.is_empty() {
            return Ok(PathBuf::from(&self.snapshot_path));
        }
        let base =
            dirs::data_dir().ok_or_else(|| anyhow!("unable to determine data directory"))?;
        Ok(base.join("reverie").join("graph.snapshot"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
    /// Synthesize a concept at the end of every `think` cycle
    pub synthesize: bool,
}

/// Loads, edits and saves the CLI configuration file.
///
/// The raw TOML table is kept next to the typed view so `get`/`set` work on
/// dotted keys without a hand-written match per option.
pub struct ConfigManager {
    path: PathBuf,
    table: Table,
    config: CliConfig,
}

impl ConfigManager {
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        Self::load_with_path(path)
    }

    pub fn load_with_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let mut table = embedded_table()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            let user: Table = toml::from_str(&contents)
                .with_context(|| format!("invalid config at {}", path.display()))?;
            merge_tables(&mut table, user);
        }

        let config = CliConfig::from_table(table.clone())
            .with_context(|| format!("invalid config at {}", path.display()))?;
        Ok(Self {
            path,
            table,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }
        let toml = toml::to_string_pretty(&self.table)?;
        fs::write(&self.path, toml)
            .with_context(|| format!("failed to write config to {}", self.path.display()))?;
        Ok(())
    }

    /// Value at a dotted key such as `network.temperature`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        lookup(&self.table, key).map(render)
    }

    /// Set a dotted key. The new value takes the type of the value it
    /// replaces; the whole configuration is re-validated before it sticks.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| anyhow!("configuration keys look like section.name, got '{key}'"))?;
        let parsed = match lookup(&self.table, key) {
            Some(existing) => parse_like(existing, value)?,
            None if section == "categories" => Value::String(value.to_string()),
            None => infer(value),
        };

        let mut candidate = self.table.clone();
        let slot = candidate
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(section_table) = slot else {
            bail!("'{section}' is not a configuration section");
        };
        section_table.insert(field.to_string(), parsed);

        let config = CliConfig::from_table(candidate.clone())
            .with_context(|| format!("rejected value '{value}' for {key}"))?;
        self.table = candidate;
        self.config = config;
        Ok(())
    }

    /// Every leaf as `section.key = value`, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (section, value) in &self.table {
            match value {
                Value::Table(entries) => {
                    for (key, leaf) in entries {
                        lines.push(format!("{section}.{key} = {}", render(leaf)));
                    }
                }
                leaf => lines.push(format!("{section} = {}", render(leaf))),
            }
        }
        lines.sort();
        lines
    }
}

fn embedded_table() -> Result<Table> {
    toml::from_str(DEFAULT_CONFIG).context("embedded default config failed to parse")
}

/// Overlay `user` onto `base`, descending into tables and replacing leaves.
pub fn merge_tables(base: &mut Table, user: Table) {
    for (key, value) in user {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(overlay)) => merge_tables(existing, overlay),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = table.get(parts.next()?)?;
    for part in parts {
        current = current.as_table()?.get(part)?;
    }
    Some(current)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_like(existing: &Value, raw: &str) -> Result<Value> {
    Ok(match existing {
        Value::Boolean(_) => Value::Boolean(parse_bool(raw)?),
        Value::Integer(_) => Value::Integer(
            raw.parse()
                .with_context(|| format!("expected an integer, received '{raw}'"))?,
        ),
        Value::Float(_) => Value::Float(
            raw.parse()
                .with_context(|| format!("expected a number, received '{raw}'"))?,
        ),
        Value::String(_) => Value::String(raw.to_string()),
        other => bail!("cannot set a {} value from the command line", other.type_str()),
    })
}

fn infer(raw: &str) -> Value {
    if let Ok(flag) = parse_bool(raw) {
        Value::Boolean(flag)
    } else if let Ok(int) = raw.parse::<i64>() {
        Value::Integer(int)
    } else if let Ok(float) = raw.parse::<f64>() {
        Value::Float(float)
    } else {
        Value::String(raw.to_string())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("expected boolean value, received '{value}'")),
    }
}

fn default_config_path() -> Result<PathBuf> {
    let base =
        dirs::config_dir().ok_or_else(|| anyhow!("unable to determine configuration directory"))?;
    Ok(base.join("reverie").join("config.toml"))
}
