#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use reverie_cli::config::{CliConfig, ConfigManager};
use reverie_core::{Category, NetworkConfig};

#[test]
fn embedded_network_defaults_match_library_defaults() {
    let config = CliConfig::embedded().expect("embedded config");
    assert_eq!(config.network, NetworkConfig::default());
    assert!(!config.session.synthesize);
    assert_eq!(config.categories.get("mood"), Some(&Category::Emotion));
    config.category_table().expect("category table");
}

#[test]
fn user_file_overrides_single_keys() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "[network]\ntemperature = 0.0\n\n[categories]\ncity = \"place\"\n",
    )
    .unwrap();

    let manager = ConfigManager::load_with_path(&config_path).expect("load config");
    let config = manager.config();
    assert_eq!(config.network.temperature, 0.0);
    assert_eq!(config.network.depth, 3);
    assert_eq!(config.categories.get("city"), Some(&Category::Place));
    assert_eq!(config.categories.get("mood"), Some(&Category::Emotion));
}

#[test]
fn setting_values_persists() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let config_path = temp_dir.path().join("reverie").join("config.toml");

    let mut manager = ConfigManager::load_with_path(&config_path).expect("load default config");
    manager.set("network.depth", "5").expect("set depth");
    manager.set("session.seed", "42").expect("set seed");
    manager.set("session.synthesize", "on").expect("set flag");
    manager.save().expect("save config");

    let reloaded = ConfigManager::load_with_path(&config_path).expect("reload config");
    assert_eq!(reloaded.config().network.depth, 5);
    assert_eq!(reloaded.config().session.seed, Some(42));
    assert!(reloaded.config().session.synthesize);
    assert_eq!(reloaded.get("network.depth").as_deref(), Some("5"));
}

#[test]
fn invalid_values_are_rejected_and_not_applied() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let mut manager =
        ConfigManager::load_with_path(temp_dir.path().join("config.toml")).expect("load");

    assert!(manager.set("network.learning_rate", "1.5").is_err());
    assert!(manager.set("network.depth", "deep").is_err());
    assert!(manager.set("categories.town", "village").is_err());
    assert!(manager.set("nodots", "1").is_err());
    assert_eq!(manager.config().network.learning_rate, 0.1);
    assert_eq!(manager.get("network.learning_rate").as_deref(), Some("0.1"));
}

#[test]
fn list_is_flat_and_sorted() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let manager =
        ConfigManager::load_with_path(temp_dir.path().join("config.toml")).expect("load");
    let lines = manager.list();
    assert!(lines.iter().any(|l| l == "network.depth = 3"));
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);
}
