//! FileDock CLI: upload, list, delete, preview and download stored files.
//!
//! Reads `config.json` from the FileDock config directory; `FILEDOCK_API_URL`
//! and `FILEDOCK_TOKEN` override it.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use filedock_cli::config::{AppConfig, ConfigUpdate, ENV_API_URL, ENV_TOKEN, config_path};
use filedock_cli::init_tracing;
use filedock_cli::workspace::Workspace;
use filedock_library::{SortKey, ViewQuery};
use filedock_protocol::{FileRecord, MediaCategory};
use filedock_transfer::{CandidateFile, TransferState};
use filedock_upload::UploadEvent;

#[derive(Parser)]
#[command(name = "filedock", version, about = "FileDock storage client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List stored files
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,
        /// Category: image, document, archive, audio, video, other
        #[arg(long, value_parser = parse_category)]
        category: Option<MediaCategory>,
        /// Sort order: newest, oldest, name, size
        #[arg(long, default_value = "newest")]
        sort: SortKey,
    },
    /// Delete a stored file
    Delete {
        /// File ID
        id: String,
    },
    /// Preview a file inline, or save the preview with --out
    Preview {
        /// File ID
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download a file
    Download {
        /// File ID
        id: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Show storage usage by category
    Stats,
    /// Show or change the configuration
    Config {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// Simultaneous uploads
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

fn parse_category(s: &str) -> Result<MediaCategory, String> {
    MediaCategory::parse(s).ok_or_else(|| format!("unknown category '{s}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::Config {
        base_url,
        token,
        user,
        concurrency,
    } = cli.command
    {
        return configure(ConfigUpdate {
            base_url,
            token,
            user_name: user,
            upload_concurrency: concurrency,
        });
    }

    let config = AppConfig::load().context("failed to load configuration")?;
    let mut ws = Workspace::connect(&config)?;
    let result = run(&mut ws, cli.command).await;
    ws.sign_out();
    result
}

async fn run(ws: &mut Workspace, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Upload { files } => upload(ws, files).await,
        Commands::List {
            search,
            category,
            sort,
        } => {
            ws.refresh().await?;
            let query = ViewQuery {
                search: search.unwrap_or_default(),
                category,
                sort,
            };
            let files = ws.files(&query);
            if files.is_empty() {
                println!("no files");
            }
            for record in &files {
                print_record(record);
            }
            Ok(())
        }
        Commands::Delete { id } => {
            ws.refresh().await?;
            let record = ws.delete(&id).await?;
            println!("deleted {}", record.name);
            Ok(())
        }
        Commands::Preview { id, out } => {
            ws.refresh().await?;
            let mut slot = ws.preview_slot();
            let handle = ws.preview(&mut slot, &id).await?;
            if !handle.has_inline_preview() {
                println!(
                    "{}: no inline preview available ({})",
                    handle.record().name,
                    handle.record().media_type
                );
                return Ok(());
            }
            println!("{} -> {}", handle.record().name, handle.url());
            let content = match slot.content() {
                Some(content) => content?,
                None => return Ok(()),
            };
            match out {
                Some(path) => {
                    tokio::fs::write(&path, &content)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("saved preview to {}", path.display());
                }
                None if content.is_ascii() => print!("{}", String::from_utf8_lossy(&content)),
                None => println!("{} bytes (use --out to save)", content.len()),
            }
            Ok(())
        }
        Commands::Download { id, out } => {
            ws.refresh().await?;
            let (record, content) = ws.download(&id).await?;
            tokio::fs::write(&out, &content)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("downloaded {} to {}", record.name, out.display());
            Ok(())
        }
        Commands::Stats => {
            ws.refresh().await?;
            let stats = ws.stats();
            println!("{} files, {}", stats.count, human_size(stats.total_bytes));
            for (category, count) in stats.by_category {
                if count > 0 {
                    println!("  {:<10} {count}", category.label());
                }
            }
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn upload(ws: &mut Workspace, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let mut candidates = Vec::with_capacity(paths.len());
    for path in &paths {
        match CandidateFile::from_path(path).await {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => eprintln!("{}: {e}", path.display()),
        }
    }

    for (name, reason) in ws.stage(candidates) {
        eprintln!("{name}: {reason}");
    }
    if ws.batch().is_empty() {
        anyhow::bail!("nothing to upload");
    }

    let mut events = ws
        .take_upload_events()
        .context("upload events already taken")?;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                UploadEvent::Started { name, .. } => println!("uploading {name}"),
                UploadEvent::Progress {
                    task,
                    progress,
                    bytes_per_second,
                } => tracing::debug!(%task, progress, bytes_per_second, "progress"),
                UploadEvent::Succeeded { record, .. } => println!("  done {}", record.name),
                UploadEvent::Failed { .. } => {}
                UploadEvent::BatchFinished { .. } => break,
            }
        }
    });

    let outcome = ws.upload_all().await;
    let _ = printer.await;

    for task in ws.batch().snapshot() {
        if let TransferState::Failed(failure) = task.state() {
            eprintln!("  failed {}: {failure}", task.name());
        }
    }
    println!("{outcome}");
    Ok(())
}

fn configure(update: ConfigUpdate) -> anyhow::Result<()> {
    let path = config_path()?;
    let changed = !update.is_empty();
    let config = AppConfig::update_file(&path, update).context("failed to update configuration")?;
    if changed {
        println!("saved {}", path.display());
    }

    println!("base URL:     {}", config.base_url);
    println!("token:        {}", config.masked_token());
    println!(
        "user:         {}",
        if config.user_name.is_empty() {
            "(not set)"
        } else {
            &config.user_name
        }
    );
    println!("concurrency:  {}", config.upload_concurrency);
    println!("timeout:      {}s", config.request_timeout.as_secs());
    for var in [ENV_API_URL, ENV_TOKEN] {
        if std::env::var_os(var).is_some_and(|v| !v.is_empty()) {
            println!("note: {var} is set and overrides the stored value");
        }
    }
    Ok(())
}

fn print_record(record: &FileRecord) {
    println!(
        "{:<24} {:>10}  {}  {}{}",
        record.id,
        human_size(record.size),
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.name,
        if record.encrypted { "  [encrypted]" } else { "" }
    );
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
