use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use ruian_core::error::ExitCode;
use ruian_core::logging::{self, LogTarget};
use ruian_core::{
    AppConfig, ArchiveDownloader, Database, ImportOptions, LocalSuggestionSource, LookupContext,
    RuianError, RuianImporter, SuggestRequest, SuggestService, Suggestion, archive_tag,
    archive_url,
};
use ruian_tui::app::App;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ruian",
    about = "RUIAN address registry: import, lookup and the partner address form",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting RUIAN_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Read configuration from this file instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import RUIAN address CSV files (a file or a directory of .csv files).
    Import {
        path: PathBuf,
        /// Drop existing registry data first.
        #[arg(long)]
        replace: bool,
        /// Tag recorded in the import log (defaults to today's date).
        #[arg(long)]
        name: Option<String>,
    },

    /// Download the latest monthly address export from CUZK and import it.
    ImportUrl {
        /// Reference date, YYYY-MM-DD (defaults to today).
        #[arg(long)]
        date: Option<String>,
        /// Download from this URL instead of the CUZK export.
        #[arg(long)]
        url: Option<String>,
        /// Keep existing registry data instead of replacing it.
        #[arg(long)]
        keep: bool,
        /// Only print the archive URL.
        #[arg(long)]
        print_url: bool,
    },

    /// Look up suggestions the way the address field does.
    Suggest {
        query: String,
        /// Chosen street; switches the lookup to house numbers and towns.
        #[arg(long)]
        street_id: Option<i64>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List streets.
    Streets {
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// List towns.
    Towns {
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Show the import history.
    Logs {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show registry statistics.
    Stats,

    /// Run diagnostics.
    Doctor,

    /// Open the partner address form (default).
    Form,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Print the config file path.
    Path,
    /// Write the default config file if none exists.
    Init,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("RUIAN_JSON").as_deref() == Ok("1");

    if let Err(e) = run(cli, json_output) {
        let code = e
            .downcast_ref::<RuianError>()
            .map(RuianError::exit_code)
            .unwrap_or(ExitCode::GeneralError);
        if json_output {
            let _ = print_json(&serde_json::json!({
                "status": "error",
                "error": error_kind(code),
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(code as i32);
    }
}

fn run(cli: Cli, json_output: bool) -> Result<()> {
    let start = Instant::now();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);

    let command = cli.command.unwrap_or(Commands::Form);
    // The terminal belongs to the form, so it logs to a file.
    let log_file = config.log_file_path();
    let log_target = if matches!(command, Commands::Form) {
        LogTarget::File(&log_file)
    } else {
        LogTarget::Stderr
    };
    if let Err(e) = init_logging(&config, log_target) {
        eprintln!("Warning: {e}");
    }
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    match command {
        Commands::Form => run_form(&config)?,

        // ── Import ─────────────────────────────────────────────────────────

        Commands::Import {
            path,
            replace,
            name,
        } => {
            let db = open_db(&config)?;
            let mut options = ImportOptions::from_config(&config.import)?;
            options.replace = replace;
            options.name = name;

            let log = RuianImporter::new(&db, options).run(&path)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": log,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Import {} finished: {}", log.name, log.state.as_str());
                println!("  Files:    {}", log.progress());
                println!("  Rows:     {}", log.rows);
                println!("  Towns:    {}", log.towns);
                println!("  Streets:  {}", log.streets);
                println!("  Numbers:  {}", log.numbers);
                println!("  Warnings: {}", log.warnings);
            }
        }

        Commands::ImportUrl {
            date,
            url,
            keep,
            print_url,
        } => {
            let today = match date {
                Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
                    RuianError::ValidationError(format!("invalid date '{text}': {e}"))
                })?,
                None => Utc::now().date_naive(),
            };
            let url = url.unwrap_or_else(|| archive_url(today));

            if print_url {
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "url": url },
                        "meta": { "duration_ms": start.elapsed().as_millis() }
                    }))?;
                } else {
                    println!("{url}");
                }
                return Ok(());
            }

            let timeout = std::time::Duration::from_secs(config.import.download_timeout_secs);
            let downloader = ArchiveDownloader::new(timeout)?;
            let runtime =
                tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            let bytes = runtime.block_on(downloader.download(&url))?;

            let db = open_db(&config)?;
            let mut options = ImportOptions::from_config(&config.import)?;
            options.replace = !keep;
            options.name = Some(archive_tag(today));

            let log = RuianImporter::new(&db, options)
                .run_archive(std::io::Cursor::new(bytes), &url)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "url": url, "log": log },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Import {} finished: {}", log.name, log.state.as_str());
                println!("  Source:   {url}");
                println!("  Files:    {}", log.progress());
                println!("  Rows:     {}", log.rows);
                println!("  Towns:    {}", log.towns);
                println!("  Streets:  {}", log.streets);
                println!("  Numbers:  {}", log.numbers);
                println!("  Warnings: {}", log.warnings);
            }
        }

        // ── Lookup ─────────────────────────────────────────────────────────

        Commands::Suggest {
            query,
            street_id,
            limit,
        } => {
            let db = open_db(&config)?;
            let context = LookupContext {
                locale: config.autocomplete.locale.clone(),
                limit,
            };
            let request = SuggestRequest::new(query, street_id, context);
            let suggestions = SuggestService::new(&db, &config.autocomplete).suggest(&request)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "items": suggestions,
                        "total": suggestions.len(),
                        "stage": request.stage,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if suggestions.is_empty() {
                println!("No suggestions for: {}", request.query);
            } else {
                for suggestion in &suggestions {
                    match suggestion {
                        Suggestion::Street { payload, display } => {
                            println!("street   {:>8}  {display}", payload.id);
                        }
                        Suggestion::Address { payload, display } => {
                            println!("address  {:>8}  {display}", payload.id);
                        }
                    }
                }
            }
        }

        Commands::Streets { limit } => {
            let db = open_db(&config)?;
            let streets = db.list_streets(limit)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": streets, "total": streets.len(), "limit": limit },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if streets.is_empty() {
                println!("No streets imported. Use `ruian import` first.");
            } else {
                for street in &streets {
                    println!(
                        "{id:>8}  {name:<40}  {numbers} numbers",
                        id = street.id,
                        name = street.name,
                        numbers = street.number_count,
                    );
                }
            }
        }

        Commands::Towns { limit } => {
            let db = open_db(&config)?;
            let towns = db.list_towns(limit)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": towns, "total": towns.len(), "limit": limit },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if towns.is_empty() {
                println!("No towns imported. Use `ruian import` first.");
            } else {
                for town in &towns {
                    println!("{:>8}  {:<40}  {}", town.code, town.name, town.postal_code);
                }
            }
        }

        Commands::Logs { limit } => {
            let db = open_db(&config)?;
            let logs = db.list_import_logs(limit)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": logs, "total": logs.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if logs.is_empty() {
                println!("No imports recorded.");
            } else {
                let now = Utc::now();
                for log in &logs {
                    let timing = match log.duration() {
                        Some(d) => format!("{}s", d.num_seconds()),
                        None => log.eta(now),
                    };
                    println!(
                        "{id:>4}  {name:<10}  {state:<8}  {started}  {progress:<18}  {numbers:>8} numbers  {warnings} warnings  {timing}",
                        id = log.id,
                        name = log.name,
                        state = log.state.as_str(),
                        started = log.start_date.format("%Y-%m-%d %H:%M"),
                        progress = log.progress(),
                        numbers = log.numbers,
                        warnings = log.warnings,
                    );
                    if let Some(message) = &log.error_message {
                        println!("      error: {message}");
                    }
                }
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => match action {
            ConfigAction::List => {
                let dur = start.elapsed().as_millis();
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": config,
                        "meta": { "duration_ms": dur }
                    }))?;
                } else {
                    print!("{}", toml_string(&config)?);
                }
            }
            ConfigAction::Path => {
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "path": config_path },
                    }))?;
                } else {
                    println!("{}", config_path.display());
                }
            }
            ConfigAction::Init => {
                let created = !config_path.exists();
                if created {
                    AppConfig::default().save_to(&config_path)?;
                }
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "path": config_path, "created": created },
                    }))?;
                } else if created {
                    println!("Wrote default config to {}", config_path.display());
                } else {
                    println!("Config already exists: {}", config_path.display());
                }
            }
        },

        // ── Stats ──────────────────────────────────────────────────────────

        Commands::Stats => {
            let db = open_db(&config)?;
            let stats = db.stats()?;
            let latest = db.latest_import_log()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "registry": stats, "latest_import": latest },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Registry statistics:");
                println!("  Towns:   {}", stats.towns);
                println!("  Streets: {}", stats.streets);
                println!("  Numbers: {}", stats.numbers);
                match latest {
                    Some(log) => println!(
                        "  Last import: {} ({}, {})",
                        log.name,
                        log.state.as_str(),
                        log.start_date.format("%Y-%m-%d %H:%M")
                    ),
                    None => println!("  Last import: never"),
                }
            }
        }

        // ── Doctor ─────────────────────────────────────────────────────────

        Commands::Doctor => {
            if config_path.exists() {
                println!("✓ Config: {}", config_path.display());
            } else {
                println!("○ Config: not found (using defaults)");
            }

            let db_path = config.database_path();
            let mut issues = 0;
            match open_db(&config) {
                Ok(db) => {
                    let stats = db.stats().unwrap_or_default();
                    println!(
                        "✓ Database: {} ({} streets, {} numbers)",
                        db_path.display(),
                        stats.streets,
                        stats.numbers
                    );
                    if stats.streets == 0 {
                        println!("○ Registry: empty, run `ruian import`");
                    }
                    match db.latest_import_log() {
                        Ok(Some(log)) if log.error_message.is_some() => {
                            issues += 1;
                            println!(
                                "✗ Last import {} failed: {}",
                                log.name,
                                log.error_message.unwrap_or_default()
                            );
                        }
                        Ok(Some(log)) => {
                            println!("✓ Last import: {} ({})", log.name, log.state.as_str())
                        }
                        Ok(None) => println!("○ Last import: none"),
                        Err(e) => {
                            issues += 1;
                            println!("✗ Import log: {e}");
                        }
                    }
                }
                Err(e) => {
                    issues += 1;
                    println!("✗ Database: {e:#}");
                }
            }

            if let Err(e) = ImportOptions::from_config(&config.import) {
                issues += 1;
                println!("✗ Import settings: {e}");
            }

            if issues == 0 {
                println!("\nAll checks passed ✓");
            } else {
                println!("\n{issues} issues found");
                std::process::exit(ExitCode::GeneralError as i32);
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn run_form(config: &AppConfig) -> Result<()> {
    let db = Arc::new(open_db(config)?);
    let source = LocalSuggestionSource::new(db, config.autocomplete.clone());

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let _guard = runtime.enter();

    let mut app = App::new(Arc::new(source), &config.autocomplete);
    ruian_tui::run_tui(&mut app)?;

    if let Some(record) = app.record() {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn init_logging(config: &AppConfig, target: LogTarget<'_>) -> Result<()> {
    logging::init(&config.logging, target)?;
    Ok(())
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn open_db(config: &AppConfig) -> Result<Database> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Database::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))
}

fn toml_string(config: &AppConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

fn error_kind(code: ExitCode) -> &'static str {
    match code {
        ExitCode::NotFound => "not_found",
        ExitCode::InvalidArgs => "invalid_args",
        ExitCode::Success | ExitCode::GeneralError => "error",
    }
}
