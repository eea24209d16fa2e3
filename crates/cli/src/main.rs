//! litmark management CLI.
//!
//! Local administration of the highlight store: list/search, export,
//! import, delete, clear, summarize, and the persisted option set.
//! Logging goes to stderr so stdout stays clean for command output.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use litmark_core::model::EXPORT_VERSION;
use litmark_core::{AppConfig, StoreDb};
use litmark_service::ServiceHandle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "litmark")]
#[command(about = "Manage durable text highlights", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the database path from configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored highlights, newest first
    List(ListArgs),

    /// Write all highlights to a JSON export file
    Export(ExportArgs),

    /// Import highlights from a JSON export file or bare array
    Import(ImportArgs),

    /// Delete one highlight by id
    Delete(DeleteArgs),

    /// Remove every stored highlight
    Clear(ClearArgs),

    /// Summarize one stored highlight
    Summarize(SummarizeArgs),

    /// Show or update the persisted option set
    Config(ConfigArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Case-insensitive substring filter over text, title, and url
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ExportArgs {
    /// Output file path
    #[arg(long, short = 'o')]
    out: PathBuf,
}

#[derive(Args)]
struct ImportArgs {
    /// Input file: a litmark export payload or a bare highlight array
    file: PathBuf,

    /// Keep existing highlights, skipping colliding ids
    #[arg(long)]
    merge: bool,

    /// Confirm a replace-mode import (it discards all existing data)
    #[arg(long)]
    yes: bool,
}

#[derive(Args)]
struct DeleteArgs {
    /// Highlight id
    id: String,
}

#[derive(Args)]
struct ClearArgs {
    /// Confirm deletion of every stored highlight
    #[arg(long)]
    yes: bool,
}

#[derive(Args)]
struct SummarizeArgs {
    /// Highlight id
    id: String,
}

#[derive(Args)]
struct ConfigArgs {
    /// KEY=VALUE pairs to store (recognized keys only)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }

    let db = StoreDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open store at {}", config.db_path.display()))?;
    let (service, task) = litmark_service::spawn(db, config).await;

    let result = match cli.command {
        Commands::List(args) => run_list(&service, args).await,
        Commands::Export(args) => run_export(&service, args).await,
        Commands::Import(args) => run_import(&service, args).await,
        Commands::Delete(args) => run_delete(&service, args).await,
        Commands::Clear(args) => run_clear(&service, args).await,
        Commands::Summarize(args) => run_summarize(&service, args).await,
        Commands::Config(args) => run_config(&service, args).await,
    };

    drop(service);
    task.await.ok();
    result
}

async fn run_list(service: &ServiceHandle, args: ListArgs) -> Result<()> {
    let mut highlights = service.get_highlights().await?;

    if let Some(query) = &args.query {
        let needle = query.to_lowercase();
        highlights.retain(|h| {
            h.text.to_lowercase().contains(&needle)
                || h.title.to_lowercase().contains(&needle)
                || h.url.to_lowercase().contains(&needle)
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&highlights)?);
        return Ok(());
    }

    if highlights.is_empty() {
        eprintln!("no highlights");
        return Ok(());
    }
    for h in &highlights {
        let text = if h.text.chars().count() > 60 {
            let head: String = h.text.chars().take(57).collect();
            format!("{head}...")
        } else {
            h.text.clone()
        };
        println!("{}  {}  {}", h.id, h.url, text);
    }
    eprintln!("{} highlight(s)", highlights.len());
    Ok(())
}

async fn run_export(service: &ServiceHandle, args: ExportArgs) -> Result<()> {
    let payload = service.export_highlights().await?;
    let count = payload.highlights.len();

    std::fs::write(&args.out, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    eprintln!("exported {} highlight(s) to {}", count, args.out.display());
    Ok(())
}

async fn run_import(service: &ServiceHandle, args: ImportArgs) -> Result<()> {
    if !args.merge && !args.yes {
        bail!("replace-mode import discards all existing highlights; pass --yes to confirm or --merge to keep them");
    }

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw).context("input is not valid JSON")?;

    // Accept a versioned export payload or a bare array of records.
    let records = match &value {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(obj) => {
            if let Some(version) = obj.get("version").and_then(serde_json::Value::as_u64)
                && version > u64::from(EXPORT_VERSION)
            {
                bail!("export file version {version} is newer than this tool understands");
            }
            match obj.get("highlights") {
                Some(serde_json::Value::Array(items)) => items.clone(),
                _ => bail!("expected a \"highlights\" array in the export payload"),
            }
        }
        _ => bail!("expected an export payload or an array of highlight records"),
    };

    let report = service.import_highlights(records, args.merge).await?;
    eprintln!(
        "imported {} highlight(s), skipped {} duplicate(s), {} invalid",
        report.imported, report.skipped_duplicates, report.skipped_invalid
    );
    Ok(())
}

async fn run_delete(service: &ServiceHandle, args: DeleteArgs) -> Result<()> {
    service.delete_highlight(&args.id).await?;
    eprintln!("deleted {}", args.id);
    Ok(())
}

async fn run_clear(service: &ServiceHandle, args: ClearArgs) -> Result<()> {
    if !args.yes {
        bail!("this removes every stored highlight; pass --yes to confirm");
    }
    service.clear_all().await?;
    eprintln!("cleared all highlights");
    Ok(())
}

async fn run_summarize(service: &ServiceHandle, args: SummarizeArgs) -> Result<()> {
    let highlights = service.get_highlights().await?;
    let Some(highlight) = highlights.into_iter().find(|h| h.id == args.id) else {
        bail!("no highlight with id {}", args.id);
    };

    match service.summarize_highlight(highlight).await {
        Ok(summary) => {
            println!("{summary}");
            Ok(())
        }
        Err(e) => {
            tracing::debug!("summarization failed: {e}");
            bail!("{}", e.user_message());
        }
    }
}

async fn run_config(service: &ServiceHandle, args: ConfigArgs) -> Result<()> {
    if !args.set.is_empty() {
        let mut updates: BTreeMap<String, String> = service.get_config().await?;
        for pair in &args.set {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("expected KEY=VALUE, got {pair:?}");
            };
            updates.insert(key.trim().to_string(), value.trim().to_string());
        }
        service.save_config(updates).await?;
    }

    let config = service.get_config().await?;
    if config.is_empty() {
        eprintln!("no persisted options");
        return Ok(());
    }
    for (key, value) in &config {
        // Never print credentials in full.
        if key == "OPENAI_API_KEY" {
            let tail: String = value.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            println!("{key}=...{tail}");
        } else {
            println!("{key}={value}");
        }
    }
    Ok(())
}
