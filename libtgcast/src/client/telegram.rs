//! Telegram client implementation on top of grammers (MTProto)

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use grammers_client::{Client, Config as GrammersConfig, InitParams, SignInError};
use grammers_session::Session;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::client::MessagingClient;
use crate::config::Config;
use crate::error::{ClientError, Result};

const SETUP_HINT: &str = "Please run setup first: tgcast-setup";

/// Where the session used for a connection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Supplied,
    Configured,
    File,
    Fresh,
}

/// Answers needed during an interactive login
pub trait LoginPrompts {
    fn phone_number(&mut self, default: &str) -> Result<String>;
    fn login_code(&mut self) -> Result<String>;
    fn password(&mut self, hint: Option<&str>) -> Result<String>;
}

pub struct TelegramClient {
    api_id: i32,
    api_hash: SecretString,
    phone_number: String,
    supplied_session: Option<SecretString>,
    configured_session: Option<SecretString>,
    session_file: PathBuf,
    client: Option<Client>,
}

impl TelegramClient {
    /// Create a client; `session` takes precedence over every configured session
    pub fn new(config: &Config, session: Option<SecretString>) -> Self {
        Self {
            api_id: config.api_id,
            api_hash: config.api_hash.clone(),
            phone_number: config.phone_number.clone(),
            supplied_session: session,
            configured_session: config.session_string.clone(),
            session_file: config.session_file(),
            client: None,
        }
    }

    /// Pick the session token: supplied, configured, session file, else fresh
    fn resolve_session(&self) -> (Option<String>, SessionSource) {
        if let Some(token) = &self.supplied_session {
            return (Some(token.expose_secret().to_string()), SessionSource::Supplied);
        }
        if let Some(token) = &self.configured_session {
            return (Some(token.expose_secret().to_string()), SessionSource::Configured);
        }
        match std::fs::read_to_string(&self.session_file) {
            Ok(content) if !content.trim().is_empty() => {
                (Some(content.trim().to_string()), SessionSource::File)
            }
            _ => (None, SessionSource::Fresh),
        }
    }

    async fn open(&self) -> Result<Client> {
        let (token, source) = self.resolve_session();
        debug!("Using {:?} session", source);

        let session = match token {
            Some(token) => decode_session(&token)?,
            None => Session::new(),
        };

        Client::connect(GrammersConfig {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.expose_secret().to_string(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| ClientError::Connection(e.to_string()).into())
    }

    /// Run the interactive login flow and return the new session token
    ///
    /// Always starts from a fresh session.
    pub async fn login(&mut self, prompts: &mut dyn LoginPrompts) -> Result<String> {
        let client = Client::connect(GrammersConfig {
            session: Session::new(),
            api_id: self.api_id,
            api_hash: self.api_hash.expose_secret().to_string(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| ClientError::Connection(e.to_string()))?;

        let phone = prompts.phone_number(&self.phone_number)?;
        let token = client
            .request_login_code(&phone)
            .await
            .map_err(|e| ClientError::Authentication(format!("Failed to request login code: {}", e)))?;

        let code = prompts.login_code()?;
        match client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompts.password(password_token.hint())?;
                client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| ClientError::Authentication(e.to_string()))?;
            }
            Err(e) => return Err(ClientError::Authentication(e.to_string()).into()),
        }

        info!("Authentication successful");
        let saved = encode_session(&client.session().save());
        self.client = Some(client);
        Ok(saved)
    }
}

#[async_trait]
impl MessagingClient for TelegramClient {
    async fn connect(&mut self) -> Result<()> {
        if self.client.is_some() {
            return Ok(());
        }

        let client = self.open().await?;

        let authorized = client
            .is_authorized()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        if !authorized {
            return Err(ClientError::Authentication(SETUP_HINT.to_string()).into());
        }

        self.client = Some(client);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // Dropping the last handle closes the connection
        if self.client.take().is_some() {
            debug!("Telegram connection closed");
        }
        Ok(())
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        let client = self.client.as_ref().ok_or(ClientError::NotConnected)?;

        let chat = client
            .resolve_username(recipient)
            .await
            .map_err(|e| ClientError::Rejected(e.to_string()))?
            .ok_or_else(|| {
                ClientError::Rejected(format!("No user has \"{}\" as username", recipient))
            })?;

        client
            .send_message(chat.pack(), text)
            .await
            .map_err(|e| {
                warn!("Send to {} rejected: {}", recipient, e);
                ClientError::Rejected(e.to_string())
            })?;

        Ok(())
    }

    fn session_string(&self) -> Option<String> {
        self.client
            .as_ref()
            .map(|client| encode_session(&client.session().save()))
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

/// Encode a serialized session as a portable token
pub fn encode_session(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn decode_session(token: &str) -> Result<Session> {
    let bytes = STANDARD.decode(token.trim()).map_err(|e| {
        ClientError::Authentication(format!("Session string is not valid base64: {}", e))
    })?;

    Session::load(&bytes)
        .map_err(|e| ClientError::Authentication(format!("Session string is corrupt: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        FileConfig, ENV_API_HASH, ENV_API_ID, ENV_PHONE_NUMBER, ENV_RETRY_DIR, ENV_SESSION_STRING,
    };
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, session_string: Option<&str>) -> Config {
        let retry_dir = dir.path().to_string_lossy().to_string();
        let session = session_string.map(str::to_string);
        Config::from_lookup(FileConfig::default(), move |name| match name {
            ENV_API_ID => Some("1".to_string()),
            ENV_API_HASH => Some("hash".to_string()),
            ENV_PHONE_NUMBER => Some("+1".to_string()),
            ENV_RETRY_DIR => Some(retry_dir.clone()),
            ENV_SESSION_STRING => session.clone(),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_session_precedence() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, Some("configured"));
        std::fs::write(config.session_file(), "from-file\n").unwrap();

        let supplied = TelegramClient::new(&config, Some(SecretString::from("supplied")));
        assert_eq!(
            supplied.resolve_session(),
            (Some("supplied".to_string()), SessionSource::Supplied)
        );

        let configured = TelegramClient::new(&config, None);
        assert_eq!(
            configured.resolve_session(),
            (Some("configured".to_string()), SessionSource::Configured)
        );

        let file_config = config_in(&dir, None);
        let from_file = TelegramClient::new(&file_config, None);
        assert_eq!(
            from_file.resolve_session(),
            (Some("from-file".to_string()), SessionSource::File)
        );
    }

    #[test]
    fn test_fresh_session_without_any_token() {
        let dir = TempDir::new().unwrap();
        let client = TelegramClient::new(&config_in(&dir, None), None);
        assert_eq!(client.resolve_session(), (None, SessionSource::Fresh));
    }

    #[test]
    fn test_invalid_session_token_is_authentication_error() {
        let err = match decode_session("not base64 !!") {
            Err(e) => e,
            Ok(_) => panic!("garbage token decoded into a session"),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let dir = TempDir::new().unwrap();
        let client = TelegramClient::new(&config_in(&dir, None), None);

        let err = client.send("durov", "hi").await.unwrap_err();
        assert!(err.to_string().contains("not connected"));
        assert!(client.session_string().is_none());
    }
}
