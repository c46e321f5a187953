//! Error types for the chatforge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; crates further out
//! (rules, pipeline, agent) define their own and wrap these.

use thiserror::Error;

/// The top-level error type for core-level operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Tokenizer errors ---
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Failures of the key-value persistence capability.
///
/// A read miss is not an error (`Ok(None)`); these variants cover I/O and
/// encoding failures only.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Failed to read {space}/{key}: {reason}")]
    Read { space: String, key: String, reason: String },

    #[error("Failed to write {space}/{key}: {reason}")]
    Write { space: String, key: String, reason: String },

    #[error("Record not found: {space}/{key}")]
    NotFound { space: String, key: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Error)]
pub enum TokenizerError {
    #[error("Failed to load vocabulary from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn store_error_names_the_location() {
        let err = Error::Store(StoreError::Write {
            space: "DynPrompt".into(),
            key: "DynPromptSets".into(),
            reason: "disk full".into(),
        });
        let text = err.to_string();
        assert!(text.contains("DynPrompt/DynPromptSets"));
        assert!(text.contains("disk full"));
    }

    #[test]
    fn tool_error_wraps_store_error() {
        let err: ToolError = StoreError::InvalidKey("".into()).into();
        assert!(matches!(err, ToolError::Store(_)));
    }
}
