//! Lazily (re)built tokenizer keyed by the configured vocabulary path.
//!
//! The path is read from `Tokenize/local_vocab_path` on every use, falling
//! back to the process configuration. The tokenizer is only rebuilt when
//! the path changes; with no path at all the 4-bytes-per-token estimate is
//! used.

use chatforge_core::error::{StoreError, TokenizerError};
use chatforge_core::{EstimateTokenizer, KvStore, Tokenizer};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const TOKENIZE_SPACE: &str = "Tokenize";
pub const VOCAB_PATH_KEY: &str = "local_vocab_path";

/// Builds a tokenizer from a vocabulary file.
pub trait TokenizerLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Arc<dyn Tokenizer>, TokenizerError>;
}

/// Loader used when no vocabulary support is compiled in: ignores the path
/// and estimates.
#[derive(Debug, Default)]
pub struct EstimateLoader;

impl TokenizerLoader for EstimateLoader {
    fn load(&self, path: &str) -> Result<Arc<dyn Tokenizer>, TokenizerError> {
        warn!(path, "Vocabulary files are not supported in this build, estimating tokens");
        Ok(Arc::new(EstimateTokenizer))
    }
}

/// Loader backed by a HuggingFace `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
#[derive(Debug, Default)]
pub struct HfTokenizerLoader;

#[cfg(feature = "hf-tokenizer")]
struct HfTokenizer(tokenizers::Tokenizer);

#[cfg(feature = "hf-tokenizer")]
impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        self.0
            .encode(text, true)
            .map(|encoding| encoding.get_ids().to_vec())
            .map_err(|e| TokenizerError::Encode(e.to_string()))
    }
}

#[cfg(feature = "hf-tokenizer")]
impl TokenizerLoader for HfTokenizerLoader {
    fn load(&self, path: &str) -> Result<Arc<dyn Tokenizer>, TokenizerError> {
        let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| TokenizerError::Load {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Arc::new(HfTokenizer(tokenizer)))
    }
}

/// The loader matching the enabled features.
pub fn default_loader() -> Arc<dyn TokenizerLoader> {
    #[cfg(feature = "hf-tokenizer")]
    {
        Arc::new(HfTokenizerLoader)
    }
    #[cfg(not(feature = "hf-tokenizer"))]
    {
        Arc::new(EstimateLoader)
    }
}

/// Caches the tokenizer for the current vocabulary path.
pub struct TokenizerCache {
    kv: Arc<dyn KvStore>,
    loader: Arc<dyn TokenizerLoader>,
    fallback_path: Option<String>,
    current: Mutex<Option<(String, Arc<dyn Tokenizer>)>>,
}

impl TokenizerCache {
    pub fn new(kv: Arc<dyn KvStore>, loader: Arc<dyn TokenizerLoader>, fallback_path: Option<String>) -> Self {
        Self {
            kv,
            loader,
            fallback_path,
            current: Mutex::new(None),
        }
    }

    async fn vocab_path(&self) -> Result<Option<String>, StoreError> {
        let stored = self.kv.read(TOKENIZE_SPACE, VOCAB_PATH_KEY).await?;
        Ok(stored
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| self.fallback_path.clone()))
    }

    /// The tokenizer for the currently configured path.
    pub async fn get(&self) -> Result<Arc<dyn Tokenizer>, crate::ModifierError> {
        let Some(path) = self.vocab_path().await? else {
            return Ok(Arc::new(EstimateTokenizer));
        };

        let mut current = self.current.lock().await;
        if let Some((loaded, tokenizer)) = current.as_ref() {
            if *loaded == path {
                return Ok(Arc::clone(tokenizer));
            }
        }

        let tokenizer = self.loader.load(&path)?;
        info!(path = %path, "Tokenizer loaded");
        *current = Some((path, Arc::clone(&tokenizer)));
        Ok(tokenizer)
    }
}
