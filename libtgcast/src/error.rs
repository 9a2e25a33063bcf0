//! Error types for Tgcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TgcastError>;

#[derive(Error, Debug)]
pub enum TgcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TgcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TgcastError::InvalidInput(_) => 3,
            TgcastError::Client(ClientError::Authentication(_)) => 2,
            TgcastError::Client(_) => 1,
            TgcastError::Config(_) => 1,
            TgcastError::Io(_) => 1,
        }
    }

    /// Text recorded against a handle when this error ends its delivery.
    ///
    /// Client rejections keep the delegated client's wording so that
    /// failure classification can match on it.
    pub fn delivery_text(&self) -> String {
        let text = match self {
            TgcastError::Client(client_error) => client_error.to_string(),
            other => other.to_string(),
        };

        if text.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            text
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variables: {0}")]
    MissingVariable(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Client not connected. Call connect() first.")]
    NotConnected,

    /// The platform refused a single send; carries its error text verbatim.
    #[error("{0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = TgcastError::InvalidInput("Empty message".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = TgcastError::Client(ClientError::Authentication(
            "Please run setup first".to_string(),
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let connection = TgcastError::Client(ClientError::Connection("refused".to_string()));
        assert_eq!(connection.exit_code(), 1);

        let config = TgcastError::Config(ConfigError::MissingVariable("API_ID".to_string()));
        assert_eq!(config.exit_code(), 1);

        let io = TgcastError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn test_rejected_displays_raw_text() {
        let error = ClientError::Rejected("PEER_FLOOD".to_string());
        assert_eq!(error.to_string(), "PEER_FLOOD");
    }

    #[test]
    fn test_delivery_text_strips_wrapper_for_client_errors() {
        let error: TgcastError = ClientError::Rejected("USERNAME_INVALID".to_string()).into();
        assert_eq!(error.delivery_text(), "USERNAME_INVALID");
        assert_eq!(error.to_string(), "Client error: USERNAME_INVALID");
    }

    #[test]
    fn test_delivery_text_falls_back_to_unknown_error() {
        let error: TgcastError = ClientError::Rejected("   ".to_string()).into();
        assert_eq!(error.delivery_text(), "Unknown error");
    }

    #[test]
    fn test_error_message_formatting_config() {
        let error = TgcastError::Config(ConfigError::InvalidValue {
            name: "RATE_LIMIT".to_string(),
            reason: "must be a positive integer".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid value for RATE_LIMIT: must be a positive integer"
        );
    }

    #[test]
    fn test_not_connected_message() {
        let error = ClientError::NotConnected;
        assert!(error.to_string().contains("connect()"));
    }

    #[test]
    fn test_error_conversion_from_client_error() {
        let error: TgcastError = ClientError::Connection("test".to_string()).into();

        match error {
            TgcastError::Client(_) => {
                // Success - correct conversion
            }
            _ => panic!("Expected TgcastError::Client"),
        }
    }

    #[test]
    fn test_client_error_clone() {
        let original = ClientError::Rejected("PEER_FLOOD".to_string());
        let cloned = original.clone();

        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
