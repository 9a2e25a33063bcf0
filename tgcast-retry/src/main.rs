//! tgcast-retry - Manage and replay flood retry files
//!
//! Non-interactive companion to tgcast-send for the handles that Telegram
//! flood-limited during an earlier run.

use clap::{Parser, Subcommand};
use libtgcast::client::telegram::TelegramClient;
use libtgcast::config::resolve_retry_dir;
use libtgcast::handles::load_handles_from_file;
use libtgcast::interactive::progress_line;
use libtgcast::logging::LoggingConfig;
use libtgcast::report::{
    find_retry_files, latest_retry_file, prune_retry_files, DEFAULT_RETRY_FILES_KEPT,
};
use libtgcast::{Config, Result, SendingService, TgcastError};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tgcast-retry")]
#[command(version)]
#[command(about = "Manage and replay flood retry files")]
#[command(long_about = "\
tgcast-retry - Manage and replay flood retry files

DESCRIPTION:
    tgcast-send writes the handles Telegram flood-limited to files named
    retry_peer_flood_<timestamp>.txt. tgcast-retry lists those files, sends
    a message to the handles in one of them, or deletes old ones.

COMMANDS:
    run     Send a message to the handles in a retry file
    list    List retry files, newest first
    prune   Delete all but the most recent retry files

USAGE EXAMPLES:
    # Resend to the most recent retry file
    tgcast-retry run --message \"Hello again\"

    # Resend to a specific file
    tgcast-retry run --file retry_peer_flood_2024-01-15T10-30-45-123Z.txt --message \"Hi\"

    # Keep only the three newest retry files
    tgcast-retry prune --keep 3

CONFIGURATION:
    Retry files live in the current directory unless TGCAST_RETRY_DIR or
    retry_dir in the config file says otherwise.

EXIT CODES:
    0 - Success
    1 - Operation failed or configuration error
    2 - Authentication error (run tgcast-setup)
    3 - Invalid input (no retry file, empty message, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a message to the handles in a retry file
    Run {
        /// Retry file to use (default: the most recent one)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Message to send
        #[arg(short, long)]
        message: String,
    },

    /// List retry files, newest first
    List,

    /// Delete all but the most recent retry files
    Prune {
        /// Number of files to keep
        #[arg(short, long, default_value_t = DEFAULT_RETRY_FILES_KEPT)]
        keep: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env("error", cli.verbose).init();

    if let Err(e) = run(cli).await {
        error!("tgcast-retry failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { file, message } => run_retry(file, &message).await,
        Commands::List => list(&resolve_retry_dir()?),
        Commands::Prune { keep } => prune(&resolve_retry_dir()?, keep),
    }
}

async fn run_retry(file: Option<PathBuf>, message: &str) -> Result<()> {
    let config = Config::load()?;

    let path = match file {
        Some(path) => path,
        None => latest_retry_file(&config.retry_dir)?.ok_or_else(|| {
            TgcastError::InvalidInput(format!(
                "No retry files found in {}",
                config.retry_dir.display()
            ))
        })?,
    };

    let handles = load_handles_from_file(&path);
    if handles.is_empty() {
        return Err(TgcastError::InvalidInput(format!(
            "No handles in {}",
            path.display()
        )));
    }

    println!("📄 Using retry file: {}", path.display());
    println!("📨 Sending message to {} handles...", handles.len());

    let client = TelegramClient::new(&config, None);
    let mut service = SendingService::from_config(client, &config);
    let outcome = service
        .run(&handles, message, |result, i, n| {
            println!("{}", progress_line(result, i, n))
        })
        .await?;

    info!(
        "Retry run finished: {}/{} delivered",
        outcome.report.successful.len(),
        outcome.report.total()
    );

    print!("{}", outcome.report.summary());
    for saved in &outcome.saved {
        println!("{}", saved.announcement());
    }
    if let Some(save_error) = &outcome.save_error {
        error!("Could not save retry lists: {}", save_error);
        eprintln!("⚠️  Could not save retry lists: {}", save_error);
    }

    Ok(())
}

fn list(dir: &Path) -> Result<()> {
    let files = existing_retry_files(dir)?;
    info!("Found {} retry files in {}", files.len(), dir.display());

    if files.is_empty() {
        println!("No retry files found in {}", dir.display());
        return Ok(());
    }

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("{}\t{} handles", name, load_handles_from_file(&path).len());
    }

    Ok(())
}

fn prune(dir: &Path, keep: usize) -> Result<()> {
    if !dir.is_dir() {
        println!("No retry files found in {}", dir.display());
        return Ok(());
    }

    let removed = prune_retry_files(dir, keep)?;
    info!("Pruned {} retry files in {}", removed.len(), dir.display());
    for path in &removed {
        println!("🗑  Deleted {}", path.display());
    }
    println!("Removed {} retry file(s), kept at most {}", removed.len(), keep);

    Ok(())
}

fn existing_retry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    find_retry_files(dir)
}
