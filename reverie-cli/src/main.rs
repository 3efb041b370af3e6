//! Reverie CLI - drive a persistent self-modifying semantic network

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reverie_cli::commands::{Session, format_activation, format_thought, write_output};
use reverie_cli::config::ConfigManager;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Reverie semantic network CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file holding the graph
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Seed for every random draw in this run
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a concept
    Add {
        name: String,

        /// Category label or provenance tag
        #[arg(short = 'k', long)]
        category: Option<String>,

        /// Comma-separated base vector; random when omitted
        #[arg(short, long)]
        vector: Option<String>,
    },

    /// Create or merge a directed relation
    Relate {
        source: String,
        target: String,
        /// Weight in [0, 1]
        weight: f32,

        #[arg(long, default_value = "manual")]
        context: String,
    },

    /// Spread activation from seed concepts
    Activate {
        #[arg(required = true)]
        seeds: Vec<String>,
    },

    /// Run full thinking cycles from seed concepts
    Think {
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Number of cycles to run
        #[arg(short = 'n', long, default_value = "1")]
        cycles: usize,

        /// Mint a concept from each cycle's most active participants
        #[arg(long)]
        synthesize: bool,
    },

    /// Reinforce co-occurrences in an explicit trace
    Reinforce {
        #[arg(required = true)]
        trace: Vec<String>,

        /// Co-occurrence window; the configured one when omitted
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Blend parent concepts into a new one
    Synthesize {
        #[arg(required = true, num_args = 2..)]
        parents: Vec<String>,

        /// Name of the new concept; parents joined with '+' when omitted
        #[arg(long)]
        name: Option<String>,

        /// Noise scale added to the blended vector
        #[arg(long)]
        novelty: Option<f32>,
    },

    /// Decay idle concepts and relations, then prune
    Decay,

    /// Remove elements weak for longer than the retention window
    Prune,

    /// Write the graph view as JSON
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overlay the activation spread from these seeds
        #[arg(long)]
        seeds: Vec<String>,
    },

    /// Show graph statistics
    Stats,

    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print one value
    Get { key: String },
    /// Change one value and save the file
    Set { key: String, value: String },
    /// Print every value
    List,
    /// Print the configuration file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut manager = match &cli.config {
        Some(path) => ConfigManager::load_with_path(path)?,
        None => ConfigManager::load()?,
    };

    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Get { key } => match manager.get(key) {
                Some(value) => println!("{value}"),
                None => println!("unknown configuration key: {key}"),
            },
            ConfigAction::Set { key, value } => {
                manager.set(key, value)?;
                manager.save()?;
                info!(key = %key, value = %value, path = %manager.path().display(), "configuration saved");
            }
            ConfigAction::List => {
                for line in manager.list() {
                    println!("{line}");
                }
            }
            ConfigAction::Path => println!("{}", manager.path().display()),
        }
        return Ok(());
    }

    let config = manager.config();
    let snapshot = match cli.snapshot {
        Some(path) => path,
        None => config.storage.resolve_snapshot_path()?,
    };
    let mut session = Session::open(config, snapshot, cli.seed)?;

    match cli.command {
        Commands::Add {
            name,
            category,
            vector,
        } => {
            let concept = session.add(&name, category.as_deref(), vector.as_deref())?;
            println!("added {} ({})", concept.name, concept.category);
        }
        Commands::Relate {
            source,
            target,
            weight,
            context,
        } => {
            let weight = session.relate(&source, &target, weight, &context)?;
            println!("{source} -> {target}: {weight:.4}");
        }
        Commands::Activate { seeds } => {
            for line in format_activation(&session.activate(&seeds)?) {
                println!("{line}");
            }
        }
        Commands::Think {
            seeds,
            cycles,
            synthesize,
        } => {
            let synthesize = synthesize || config.session.synthesize;
            for thought in session.think(&seeds, cycles, synthesize)? {
                for line in format_thought(&thought) {
                    println!("{line}");
                }
            }
        }
        Commands::Reinforce { trace, window } => {
            let writes = session.reinforce(&trace, window)?;
            println!("{writes} relation writes");
        }
        Commands::Synthesize {
            parents,
            name,
            novelty,
        } => {
            let concept = session.synthesize(&parents, name, novelty)?;
            println!(
                "synthesized {} from {} (strength {:.3})",
                concept.name,
                concept
                    .parents
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                concept.strength
            );
        }
        Commands::Decay => println!("{}", session.decay()?),
        Commands::Prune => println!("{}", session.prune()),
        Commands::Export { output, seeds } => {
            let json = session.export(&seeds)?;
            match output {
                Some(path) => {
                    write_output(&path, &json)?;
                    info!(path = %path.display(), "graph view written");
                }
                None => println!("{json}"),
            }
        }
        Commands::Stats => {
            for line in session.stats() {
                println!("{line}");
            }
        }
        Commands::Config { .. } => {}
    }

    session.finish()
}
