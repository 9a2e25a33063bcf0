//! tgcast-send - Send one message to many Telegram users

use clap::Parser;
use libtgcast::client::telegram::TelegramClient;
use libtgcast::interactive::{run_interactive, InteractiveOutcome, Prompter};
use libtgcast::logging::{LogFormat, LoggingConfig};
use libtgcast::{Config, SendingService};
use std::io;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tgcast-send")]
#[command(version)]
#[command(about = "Send one message to many Telegram users, one at a time", long_about = None)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log output format: text, json or pretty
    #[arg(long, value_name = "FORMAT", env = "TGCAST_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = std::env::var("TGCAST_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    LoggingConfig::new(cli.log_format, level, cli.verbose).init();

    println!("🚀 Telegram Mass Messenger");
    println!("=========================");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    let client = TelegramClient::new(&config, None);
    let mut service = SendingService::from_config(client, &config);

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    match run_interactive(&mut prompter, &mut service, &config.retry_dir).await {
        Ok(InteractiveOutcome::Completed(outcome)) => {
            info!(
                "Run finished: {}/{} delivered",
                outcome.report.successful.len(),
                outcome.report.total()
            );
        }
        Ok(InteractiveOutcome::Failed(e)) => error!("Run failed: {}", e),
        Ok(InteractiveOutcome::Aborted) => info!("Nothing sent"),
        Err(e) => {
            error!("Interactive session ended: {}", e);
            eprintln!("\n❌ Error: {}", e);
        }
    }
}
