//! Core types for Tgcast

/// Outcome of delivering the message to one handle
///
/// Exactly one result exists per handle per run; flood-control retries
/// inside a handle never produce intermediate results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// Handle as the user supplied it (a leading `@` is kept)
    pub handle: String,
    pub success: bool,
    pub error: Option<String>,
}

impl SendResult {
    pub fn success(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(handle: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            success: false,
            error: Some(error.into()),
        }
    }

    /// Error text, or an empty string for successes
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

impl std::fmt::Display for SendResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error {
            Some(error) => write!(f, "❌ {} ({})", self.handle, error),
            None if self.success => write!(f, "✅ {}", self.handle),
            None => write!(f, "❌ {}", self.handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_no_error() {
        let result = SendResult::success("@alice");
        assert!(result.success);
        assert_eq!(result.handle, "@alice");
        assert_eq!(result.error_text(), "");
        assert_eq!(result.to_string(), "✅ @alice");
    }

    #[test]
    fn test_failure_display_includes_error() {
        let result = SendResult::failure("bob", "PEER_FLOOD");
        assert!(!result.success);
        assert_eq!(result.error_text(), "PEER_FLOOD");
        assert_eq!(result.to_string(), "❌ bob (PEER_FLOOD)");
    }
}
