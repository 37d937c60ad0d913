use anyhow::{Context, Result};
use authdex::AuthorSearch;
use authdex::index::{BuildOutcome, NameCatalog, persist, stats};
use authdex::output;
use authdex::utils::{EngineConfig, get_config_path, get_index_dir};
use clap::{Parser, Subcommand};
use log::warn;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "authdex")]
#[command(about = "Approximate author name search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a JSON file of author signatures
    Index {
        /// JSON array of {"author": <id>, "name": <raw name>}
        signatures: PathBuf,

        /// Directory to write the index to
        #[arg(short, long)]
        index_dir: Option<PathBuf>,

        /// Configuration file (defaults to the app data config)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Find the authors matching a name
    Search {
        /// Name to look up, e.g. "J Ellis"
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,

        /// Directory holding the index
        #[arg(short, long)]
        index_dir: Option<PathBuf>,

        /// Maximum number of authors to print
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Show index statistics
    Stats {
        /// Directory holding the index
        #[arg(short, long)]
        index_dir: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index {
            signatures,
            index_dir,
            config,
        } => {
            let index_dir = resolve_index_dir(index_dir)?;
            let config = match config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::load_default()?,
            };
            build(&signatures, &index_dir, config)?;
        }
        Commands::Search {
            query,
            index_dir,
            limit,
            json,
            no_color,
        } => {
            let index_dir = resolve_index_dir(index_dir)?;
            search(&query.join(" "), &index_dir, limit, json, !no_color)?;
        }
        Commands::Stats { index_dir } => {
            let index_dir = resolve_index_dir(index_dir)?;
            stats::show_stats(&index_dir)?;
        }
        Commands::Config => {
            let config = EngineConfig::load_default()?;
            println!("# {}", get_config_path()?.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn resolve_index_dir(index_dir: Option<PathBuf>) -> Result<PathBuf> {
    match index_dir {
        Some(dir) => Ok(dir),
        None => get_index_dir(),
    }
}

fn build(signatures: &Path, index_dir: &Path, config: EngineConfig) -> Result<()> {
    let catalog = NameCatalog::load_signatures(signatures)?;
    println!(
        "Loaded {} distinct names from {}",
        catalog.name_count(),
        signatures.display()
    );

    let engine = AuthorSearch::new(authdex::index::MemoryStore::new(), config);
    match engine.build_index(&catalog).context("Index build failed")? {
        BuildOutcome::Built {
            strings,
            qgrams,
            authors,
        } => {
            persist::save(engine.store(), index_dir, engine.config())?;
            println!(
                "Indexed {} strings ({} q-grams, {} authors) into {}",
                strings,
                qgrams,
                authors,
                index_dir.display()
            );
        }
        BuildOutcome::Empty => {
            println!("No confirmed names found, index not written");
        }
    }

    Ok(())
}

fn search(query: &str, index_dir: &Path, limit: usize, json: bool, color: bool) -> Result<()> {
    if !index_dir.join(persist::META_FILE).exists() {
        println!("index not ready");
        return Ok(());
    }

    let mut config = EngineConfig::load_default()?;
    let (store, meta) = persist::load(index_dir)?;
    if meta.qgram_len != config.qgram_len {
        warn!(
            "Index was built with q-gram length {}, overriding configured {}",
            meta.qgram_len, config.qgram_len
        );
        config.qgram_len = meta.qgram_len;
    }

    let engine = AuthorSearch::new(store, config);
    let Some(results) = engine.search(query)? else {
        println!("index not ready");
        return Ok(());
    };

    if json {
        output::print_json(&results, limit)?;
    } else {
        output::print_results(&results, limit, color)?;
    }

    Ok(())
}
