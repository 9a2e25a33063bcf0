use anyhow::{Context, Result};
use clap::Parser;
use libtgcast::client::telegram::{LoginPrompts, TelegramClient};
use libtgcast::logging::LoggingConfig;
use libtgcast::{Config, MessagingClient};
use std::io::{self, Write};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tgcast-setup")]
#[command(version)]
#[command(about = "Log in to Telegram and create a session for tgcast", long_about = None)]
struct Cli {
    /// Print the session string without writing the session file
    #[arg(long)]
    no_save: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    LoggingConfig::from_env(log_level, cli.verbose).init();

    info!("Starting tgcast setup");

    if let Err(e) = run_setup(&cli).await {
        error!("Setup failed: {}", e);
        eprintln!("\n❌ Setup failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_setup(cli: &Cli) -> Result<()> {
    println!("\n🔐 Telegram Authentication Setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    println!("You will receive a login code in your Telegram app.\n");

    let config = Config::load().context("Could not load configuration")?;

    let mut client = TelegramClient::new(&config, None);
    let mut prompts = TerminalPrompts;
    let session = client.login(&mut prompts).await?;

    println!("\n✅ Authentication successful!");

    if cli.no_save {
        println!("ℹ️  Session file not written (--no-save)");
    } else {
        std::fs::create_dir_all(&config.retry_dir).with_context(|| {
            format!("Could not create directory {}", config.retry_dir.display())
        })?;
        let path = config.session_file();
        std::fs::write(&path, format!("{}\n", session))
            .with_context(|| format!("Could not write session file {}", path.display()))?;
        println!("💾 Session saved to {}", path.display());
    }

    if let Err(e) = client.disconnect().await {
        error!("Failed to disconnect cleanly: {}", e);
    }

    display_session(&session);
    Ok(())
}

fn display_session(session: &str) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Session string");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    println!("{}\n", session);
    println!("To use it on another machine, add this line to your .env file:");
    println!("  SESSION_STRING={}\n", session);
    println!("⚠️  Anyone with this string can act as your account. Keep it secret.\n");
    println!("Next step:");
    println!("  tgcast-send\n");
}

/// Reads login answers from the terminal
struct TerminalPrompts;

impl TerminalPrompts {
    fn read_line(prompt: &str) -> io::Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }
}

impl LoginPrompts for TerminalPrompts {
    fn phone_number(&mut self, default: &str) -> libtgcast::Result<String> {
        if default.is_empty() {
            return Ok(Self::read_line("📱 Enter your phone number: ")?);
        }

        let input = Self::read_line(&format!("📱 Phone number [{}]: ", default))?;
        Ok(if input.is_empty() {
            default.to_string()
        } else {
            input
        })
    }

    fn login_code(&mut self) -> libtgcast::Result<String> {
        Ok(Self::read_line("📨 Enter the code you received: ")?)
    }

    fn password(&mut self, hint: Option<&str>) -> libtgcast::Result<String> {
        let prompt = match hint {
            Some(hint) => format!("🔑 Two-step verification password (hint: {}): ", hint),
            None => "🔑 Two-step verification password: ".to_string(),
        };

        // Hidden input only works on a terminal
        if atty::is(atty::Stream::Stdin) {
            Ok(rpassword::prompt_password(prompt)?)
        } else {
            Ok(Self::read_line(&prompt)?)
        }
    }
}
