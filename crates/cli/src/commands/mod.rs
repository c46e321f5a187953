pub mod assemble;
pub mod dynprompt;
pub mod init;
pub mod modifiers;
pub mod rule;
pub mod tools;

use chatforge_config::AppConfig;
use chatforge_core::KvStore;
use chatforge_pipeline::tokenizer::default_loader;
use chatforge_pipeline::{ContextPipeline, PipelineError, TokenizerCache, builtin_registry};
use chatforge_store::FileKvStore;
use chatforge_tools::{RegistryToolService, default_registry};
use std::sync::Arc;

/// Loaded config plus the store it points at.
pub struct Workspace {
    pub config: AppConfig,
    pub kv: Arc<dyn KvStore>,
}

impl Workspace {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::new(config.data_dir.clone()));
        Ok(Self { config, kv })
    }

    pub fn pipeline(&self) -> Result<ContextPipeline, PipelineError> {
        let tokenizers = Arc::new(TokenizerCache::new(
            self.kv.clone(),
            default_loader(),
            self.config.tokenizer.vocab_path.clone(),
        ));
        let registry = builtin_registry(self.kv.clone(), tokenizers, self.config.user.username.clone())?;
        Ok(ContextPipeline::new(registry, self.kv.clone()))
    }

    pub fn tools(&self) -> RegistryToolService {
        RegistryToolService::new(default_registry(self.kv.clone()), self.kv.clone())
    }
}

#[cfg(test)]
pub(crate) fn in_memory_workspace() -> Workspace {
    Workspace {
        config: AppConfig::default(),
        kv: Arc::new(chatforge_store::InMemoryKvStore::new()),
    }
}
