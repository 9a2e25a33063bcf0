//! Mock client implementation for testing
//!
//! A deterministic in-memory client that can be scripted per recipient:
//! deliver, reject with a given error text a number of times, or reject
//! forever. Every send attempt is recorded with the (tokio) instant it
//! happened so tests can check pacing and backoff under a paused clock.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::client::MessagingClient;
use crate::error::{ClientError, Result};

/// What the mock does for one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Deliver,
    Reject(String),
}

/// A recorded send attempt
#[derive(Debug, Clone)]
pub struct SendAttempt {
    pub recipient: String,
    pub text: String,
    pub at: Instant,
}

/// Configuration for mock client behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Client name
    pub name: String,

    /// Whether connect should succeed
    pub connect_succeeds: bool,

    /// Error to return on connect failure
    pub connect_error: Option<String>,

    /// Delay before completing each operation (simulates network latency)
    pub delay: Duration,

    /// Session token reported once connected
    pub session: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            connect_succeeds: true,
            connect_error: None,
            delay: Duration::from_millis(0),
            session: Some("mock-session".to_string()),
        }
    }
}

/// Mock client for testing
pub struct MockClient {
    config: MockConfig,
    connected: bool,
    scripts: Mutex<HashMap<String, VecDeque<MockOutcome>>>,
    fallbacks: HashMap<String, MockOutcome>,
    attempts: Arc<Mutex<Vec<SendAttempt>>>,
    connect_calls: usize,
    disconnect_calls: usize,
}

impl MockClient {
    /// Create a new mock client with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            connected: false,
            scripts: Mutex::new(HashMap::new()),
            fallbacks: HashMap::new(),
            attempts: Arc::new(Mutex::new(Vec::new())),
            connect_calls: 0,
            disconnect_calls: 0,
        }
    }

    /// Create a mock client that delivers everything
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock client whose connect fails
    pub fn connect_failure(error: &str) -> Self {
        Self::new(MockConfig {
            connect_succeeds: false,
            connect_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock client with simulated latency
    pub fn with_delay(delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..Default::default()
        })
    }

    /// Queue outcomes for a recipient, consumed one per attempt
    ///
    /// Once the queue is exhausted the recipient falls back to its permanent
    /// outcome, or delivery.
    pub fn script(self, recipient: &str, outcomes: Vec<MockOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(recipient.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    /// Reject the first `times` attempts for a recipient, then deliver
    pub fn fail_times(self, recipient: &str, error: &str, times: usize) -> Self {
        let outcomes = vec![MockOutcome::Reject(error.to_string()); times];
        self.script(recipient, outcomes)
    }

    /// Reject every attempt for a recipient
    pub fn always_fail(mut self, recipient: &str, error: &str) -> Self {
        self.fallbacks
            .insert(recipient.to_string(), MockOutcome::Reject(error.to_string()));
        self
    }

    /// Whether connect has succeeded and disconnect not yet been called
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Get the number of times connect was called
    pub fn connect_call_count(&self) -> usize {
        self.connect_calls
    }

    /// Get the number of times disconnect was called
    pub fn disconnect_call_count(&self) -> usize {
        self.disconnect_calls
    }

    /// All send attempts in order
    pub fn attempts(&self) -> Vec<SendAttempt> {
        self.attempts.lock().unwrap().clone()
    }

    /// Send attempts for one recipient
    pub fn attempts_for(&self, recipient: &str) -> Vec<SendAttempt> {
        self.attempts()
            .into_iter()
            .filter(|a| a.recipient == recipient)
            .collect()
    }

    fn next_outcome(&self, recipient: &str) -> MockOutcome {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(recipient)
            .and_then(|queue| queue.pop_front());

        scripted
            .or_else(|| self.fallbacks.get(recipient).cloned())
            .unwrap_or(MockOutcome::Deliver)
    }
}

#[async_trait]
impl MessagingClient for MockClient {
    async fn connect(&mut self) -> Result<()> {
        self.connect_calls += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.connect_succeeds {
            self.connected = true;
            Ok(())
        } else {
            let error_msg = self
                .config
                .connect_error
                .clone()
                .unwrap_or_else(|| "Mock connection failed".to_string());
            Err(ClientError::Connection(error_msg).into())
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.disconnect_calls += 1;
        self.connected = false;
        Ok(())
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        if !self.connected {
            return Err(ClientError::NotConnected.into());
        }

        self.attempts.lock().unwrap().push(SendAttempt {
            recipient: recipient.to_string(),
            text: text.to_string(),
            at: Instant::now(),
        });

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        match self.next_outcome(recipient) {
            MockOutcome::Deliver => Ok(()),
            MockOutcome::Reject(error) => Err(ClientError::Rejected(error).into()),
        }
    }

    fn session_string(&self) -> Option<String> {
        if self.connected {
            self.config.session.clone()
        } else {
            None
        }
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
