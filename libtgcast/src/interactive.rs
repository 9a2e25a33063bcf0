//! Interactive orchestration
//!
//! Prompts for a handle source, the message and a confirmation, then runs a
//! [`SendingService`]. Input and output are generic so the whole flow can be
//! driven from memory in tests.

use std::io::{BufRead, Write};
use std::path::Path;
use tracing::warn;

use crate::client::MessagingClient;
use crate::error::{ClientError, Result, TgcastError};
use crate::handles::{load_handles_from_file, parse_handles};
use crate::report::find_retry_files;
use crate::service::{RunOutcome, SendingService};
use crate::types::SendResult;

/// Line-oriented prompt over any reader/writer pair
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print a line
    pub fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    /// Print `prompt` and read one line, without its line terminator
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the input is exhausted.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(TgcastError::InvalidInput("Input closed".to_string()));
        }

        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// `y` or `yes`, any case
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Where the recipient list comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSource {
    Manual,
    File,
    RetryFile,
}

impl HandleSource {
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(HandleSource::Manual),
            "2" => Some(HandleSource::File),
            "3" => Some(HandleSource::RetryFile),
            _ => None,
        }
    }
}

/// What the user agreed to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendPlan {
    pub handles: Vec<String>,
    pub message: String,
}

/// How an interactive session ended
#[derive(Debug)]
pub enum InteractiveOutcome {
    /// The user supplied nothing to send or declined the confirmation
    Aborted,
    /// The run could not start or connect
    Failed(TgcastError),
    Completed(RunOutcome),
}

/// Progress line printed after each handle, e.g. `[2/5] ❌ bob (PEER_FLOOD)`
pub fn progress_line(result: &SendResult, index: usize, total: usize) -> String {
    format!("[{}/{}] {}", index, total, result)
}

/// Ask for a handle source until a usable one is chosen
pub fn prompt_for_handles<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    retry_dir: &Path,
) -> Result<Vec<String>> {
    loop {
        prompter.say("\nChoose how to provide handles:")?;
        prompter.say("1. Type handles manually")?;
        prompter.say("2. Load from file")?;
        prompter.say("3. Retry PEER_FLOOD handles")?;

        let choice = prompter.ask("Enter choice (1, 2, or 3): ")?;
        match HandleSource::from_choice(&choice) {
            Some(HandleSource::Manual) => {
                let input = prompter.ask("Enter handles (comma/space/newline separated): ")?;
                return Ok(parse_handles(&input));
            }
            Some(HandleSource::File) => {
                let path = prompter.ask("Enter file path: ")?;
                return Ok(load_handles_from_file(Path::new(path.trim())));
            }
            Some(HandleSource::RetryFile) => {
                if let Some(handles) = prompt_for_retry_file(prompter, retry_dir)? {
                    return Ok(handles);
                }
            }
            None => prompter.say("Invalid choice. Please try again.")?,
        }
    }
}

/// Offer the flood retry files, newest first; `None` when there are none
///
/// An empty answer picks the most recent file.
fn prompt_for_retry_file<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    retry_dir: &Path,
) -> Result<Option<Vec<String>>> {
    let files = find_retry_files(retry_dir).unwrap_or_else(|e| {
        warn!("Cannot list retry files in {}: {}", retry_dir.display(), e);
        Vec::new()
    });

    if files.is_empty() {
        prompter.say("❌ No retry files found. Run a mass message first to generate retry files.")?;
        return Ok(None);
    }

    prompter.say("\nAvailable retry files:")?;
    for (i, file) in files.iter().enumerate() {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        prompter.say(&format!("{}. {}", i + 1, name))?;
    }

    loop {
        let choice = prompter.ask(&format!("Enter file number (1-{}): ", files.len()))?;
        let index = match choice.trim() {
            "" => Some(0),
            other => other
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=files.len()).contains(n))
                .map(|n| n - 1),
        };

        match index {
            Some(index) => {
                let path = &files[index];
                prompter.say(&format!("📄 Using retry file: {}", path.display()))?;
                return Ok(Some(load_handles_from_file(path)));
            }
            None => prompter.say("Invalid choice. Please try again.")?,
        }
    }
}

/// Gather handles, message and confirmation; `None` means abort
pub fn collect_plan<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    retry_dir: &Path,
) -> Result<Option<SendPlan>> {
    let handles = prompt_for_handles(prompter, retry_dir)?;
    if handles.is_empty() {
        prompter.say("❌ No valid handles provided. Exiting.")?;
        return Ok(None);
    }

    prompter.say(&format!("\n📋 Found {} handles: {}", handles.len(), handles.join(", ")))?;

    let message = prompter.ask("\n📝 Enter your message: ")?;
    if message.trim().is_empty() {
        prompter.say("❌ Empty message. Exiting.")?;
        return Ok(None);
    }

    prompter.say("\n📊 Summary:")?;
    prompter.say(&format!("📤 Recipients: {}", handles.len()))?;
    prompter.say(&format!("📝 Message: \"{}\"", message))?;

    let confirm = prompter.ask("\n❓ Send messages? (y/N): ")?;
    if !is_affirmative(&confirm) {
        prompter.say("❌ Cancelled.")?;
        return Ok(None);
    }

    Ok(Some(SendPlan { handles, message }))
}

/// Full interactive session: prompts, sending, progress and report
///
/// # Errors
///
/// Only prompt I/O errors are returned; send failures end up in the
/// outcome.
pub async fn run_interactive<R, W, C>(
    prompter: &mut Prompter<R, W>,
    service: &mut SendingService<C>,
    retry_dir: &Path,
) -> Result<InteractiveOutcome>
where
    R: BufRead,
    W: Write,
    C: MessagingClient,
{
    let plan = match collect_plan(prompter, retry_dir)? {
        Some(plan) => plan,
        None => return Ok(InteractiveOutcome::Aborted),
    };

    prompter.say(&format!("📨 Sending message to {} handles...", plan.handles.len()))?;

    let output = prompter.output();
    let result = service
        .run(&plan.handles, &plan.message, |result, index, total| {
            let _ = writeln!(output, "{}", progress_line(result, index, total));
        })
        .await;

    match result {
        Ok(outcome) => {
            write!(prompter.output(), "{}", outcome.report.summary())?;
            if !outcome.saved.is_empty() {
                prompter.say("")?;
            }
            for saved in &outcome.saved {
                prompter.say(&saved.announcement())?;
            }
            if let Some(error) = &outcome.save_error {
                prompter.say(&format!("⚠️  Could not save retry lists: {}", error))?;
            }
            Ok(InteractiveOutcome::Completed(outcome))
        }
        Err(e) => {
            prompter.say(&format!("❌ Error: {}", e))?;
            if matches!(e, TgcastError::Client(ClientError::Authentication(_))) {
                prompter.say("\n💡 Run \"tgcast-setup\" to authenticate first")?;
            }
            Ok(InteractiveOutcome::Failed(e))
        }
    }
}
