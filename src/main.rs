use std::path::PathBuf;
use std::sync::Arc;

use kbsearch::cli::{Cli, Commands, ConfigAction, SearchArgs};
use kbsearch::config::{Config, ConfigValidator};
use kbsearch::engine::TantivyIndex;
use kbsearch::error::{KbSearchError, Result};
use kbsearch::search::SearchBackends;
use kbsearch::storage::{ContentDump, StorageManager, StorageStats};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Search(args) => {
            cmd_search(cli.config, cli.profile, &args)?;
        }
        Commands::Import { file, no_reindex } => {
            cmd_import(cli.config, cli.profile, &file, no_reindex)?;
        }
        Commands::Reindex => {
            cmd_reindex(cli.config, cli.profile)?;
        }
        Commands::Stats { json } => {
            cmd_stats(cli.config, cli.profile, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "kbsearch=debug" } else { "kbsearch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Open the on-disk index for reading. A broken index is not fatal: searches
/// then go through the relational fallback.
fn open_engine(storage: &StorageManager, config: &Config) -> Result<TantivyIndex> {
    match storage.open_index(&config.engine) {
        Ok(index) => Ok(index),
        Err(e) => {
            tracing::warn!("Search index unavailable, using fallback search: {}", e);
            let mut index = TantivyIndex::in_memory(&config.engine)?;
            index.set_enabled(false);
            Ok(index)
        }
    }
}

fn cmd_search(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    args: &SearchArgs,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let params = args.to_params(config.search.default_flavor)?;

    let storage = StorageManager::open(&config.storage)?;
    let repository = Arc::new(storage.repository());
    let engine = Arc::new(open_engine(&storage, &config)?);
    let backends = SearchBackends::new(
        repository.clone(),
        engine,
        repository,
        config.search.clone(),
    );

    let caller = args.caller();
    let hits = backends
        .searcher(params)?
        .search(&args.query, caller.as_ref(), args.pagination())?;

    if args.json {
        let json = serde_json::to_string_pretty(&hits).map_err(|e| KbSearchError::Json {
            source: e,
            context: "Failed to serialize search results".to_string(),
        })?;
        println!("{}", json);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results for '{}'", args.query);
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>3}. {} #{}", rank + 1, hit.content_type, hit.id);
        for (field, snippet) in &hit.highlights {
            println!("       {}: {}", field, snippet);
        }
    }

    Ok(())
}

fn cmd_import(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    file: &std::path::Path,
    no_reindex: bool,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let storage = StorageManager::open(&config.storage)?;

    let dump = ContentDump::from_file(file)?;
    let stats = storage.database.import(&dump)?;

    println!("✓ Imported {}", file.display());
    println!("  Knowledge bases: {}", stats.knowledge_bases);
    println!("  Categories: {}", stats.categories);
    println!("  Answers: {}", stats.answers);
    println!("  Translations: {}", stats.translations);

    if !no_reindex {
        let mut index = storage.open_index(&config.engine)?;
        let count = storage.reindex(&mut index)?;
        println!("✓ Indexed {} documents", count);
    }

    Ok(())
}

fn cmd_reindex(config_path: Option<PathBuf>, profile: Option<String>) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let storage = StorageManager::open(&config.storage)?;

    let mut index = storage.open_index(&config.engine)?;
    let count = storage.reindex(&mut index)?;

    println!("✓ Indexed {} documents", count);
    Ok(())
}

fn cmd_stats(config_path: Option<PathBuf>, profile: Option<String>, json: bool) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let storage = StorageManager::open(&config.storage)?;

    let index = match storage.open_index(&config.engine) {
        Ok(index) => Some(index),
        Err(e) => {
            tracing::warn!("Cannot open search index: {}", e);
            None
        }
    };
    let stats = storage.stats(index.as_ref())?;

    if json {
        let output = serde_json::to_string_pretty(&stats).map_err(|e| KbSearchError::Json {
            source: e,
            context: "Failed to serialize statistics".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    println!("Database:");
    println!("  Knowledge bases: {}", stats.db.knowledge_base_count);
    println!("  Locales: {}", stats.db.locale_count);
    println!("  Categories: {}", stats.db.category_count);
    println!("  Answers: {}", stats.db.answer_count);
    println!("  Translations: {}", stats.db.translation_count);
    println!("  Category permissions: {}", stats.db.permission_count);
    println!("Index:");
    match stats.indexed_documents {
        Some(count) => println!("  Documents: {}", count),
        None => println!("  Documents: unavailable"),
    }
    println!("  Size: {}", StorageStats::format_size(stats.index_size));
    println!(
        "  Engine: {}",
        if config.engine.enabled { "enabled" } else { "disabled (fallback search)" }
    );

    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            let output = toml::to_string_pretty(&config)?;
            println!("{}", output);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = match profile {
                Some(profile) => Config::load_with_profile(&path, &profile)?,
                None => Config::load(&path)?,
            };
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| KbSearchError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'kbsearch config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
