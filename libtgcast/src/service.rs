//! Sending service
//!
//! Runs one complete send: connect, dispatch to every handle, classify the
//! results, persist retry lists, and disconnect. Disconnect happens whether
//! or not the earlier steps succeeded.
//!
//! # Example
//!
//! ```no_run
//! use libtgcast::client::telegram::TelegramClient;
//! use libtgcast::service::SendingService;
//! use libtgcast::Config;
//!
//! # async fn example() -> libtgcast::Result<()> {
//! let config = Config::load()?;
//! let client = TelegramClient::new(&config, None);
//! let mut service = SendingService::from_config(client, &config);
//!
//! let handles = vec!["@alice".to_string(), "bob".to_string()];
//! let outcome = service
//!     .run(&handles, "Hello!", |result, i, n| println!("[{}/{}] {}", i, n, result))
//!     .await?;
//! print!("{}", outcome.report.summary());
//! # Ok(())
//! # }
//! ```

use chrono::Utc;
use std::path::PathBuf;
use tracing::{error, warn};

use crate::client::MessagingClient;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Result, TgcastError};
use crate::messenger::Messenger;
use crate::report::{RunReport, SavedList};
use crate::types::SendResult;

/// Everything produced by one run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// One result per handle, in dispatch order
    pub results: Vec<SendResult>,
    pub report: RunReport,
    /// Retry lists written to disk
    pub saved: Vec<SavedList>,
    /// Set when the retry directory or any retry list could not be written
    pub save_error: Option<String>,
}

pub struct SendingService<C> {
    messenger: Messenger<C>,
    dispatcher: Dispatcher,
    retry_dir: PathBuf,
}

impl<C: MessagingClient> SendingService<C> {
    pub fn new(client: C, dispatcher: Dispatcher, retry_dir: impl Into<PathBuf>) -> Self {
        Self {
            messenger: Messenger::new(client),
            dispatcher,
            retry_dir: retry_dir.into(),
        }
    }

    pub fn from_config(client: C, config: &Config) -> Self {
        Self::new(client, Dispatcher::from_config(config), config.retry_dir.clone())
    }

    pub fn messenger(&self) -> &Messenger<C> {
        &self.messenger
    }

    /// Send `message` to every handle and report the results
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty handle list or a blank message
    /// (nothing is connected in that case), or the connection error when
    /// connecting fails. Per-handle failures never abort the run.
    pub async fn run<F>(
        &mut self,
        handles: &[String],
        message: &str,
        on_progress: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&SendResult, usize, usize),
    {
        if handles.is_empty() {
            return Err(TgcastError::InvalidInput("No valid handles provided".to_string()));
        }
        if message.trim().is_empty() {
            return Err(TgcastError::InvalidInput("Empty message".to_string()));
        }

        let outcome = self.connect_and_send(handles, message, on_progress).await;

        if let Err(e) = self.messenger.disconnect().await {
            warn!("Failed to disconnect cleanly: {}", e);
        }

        outcome
    }

    async fn connect_and_send<F>(
        &mut self,
        handles: &[String],
        message: &str,
        on_progress: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&SendResult, usize, usize),
    {
        self.messenger.connect().await?;

        let results = self
            .dispatcher
            .send_to_all(&self.messenger, handles, message, on_progress)
            .await;

        let report = RunReport::from_results(&results);
        let lists = report.save_retry_lists(&self.retry_dir, Utc::now());
        let save_error = lists.error.map(|e| {
            error!("Failed to save retry lists: {}", e);
            e.to_string()
        });

        Ok(RunOutcome {
            results,
            report,
            saved: lists.saved,
            save_error,
        })
    }
}
