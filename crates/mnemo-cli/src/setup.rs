//! CLI setup module
//!
//! Builds the memory manager and the language model client for CLI usage.

use anyhow::{Result, bail};
use mnemo_ai::{LlmClient, OpenAIClient};
use mnemo_core::{MemoryBackend, MemoryManager, RedbBackend};
use mnemo_storage::paths;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{CliConfig, OPENAI_API_KEY_ENV};

/// Database path priority: `--db-path` / `MNEMO_DB_PATH` > config file > ~/.mnemo/mnemo.db
pub fn resolve_db_path(cli_path: Option<String>, config: &CliConfig) -> Result<PathBuf> {
    match cli_path.or_else(|| config.default.db_path.clone()) {
        Some(path) => Ok(PathBuf::from(path)),
        None => paths::default_db_path(),
    }
}

/// Build the text-generation client from the config and environment.
pub fn build_llm(config: &CliConfig, model: Option<&str>) -> Result<Arc<dyn LlmClient>> {
    let api_key = std::env::var(OPENAI_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty());
    let Some(api_key) = api_key else {
        bail!("OpenAI API key not found: set {OPENAI_API_KEY_ENV} or api_keys.openai in the config file");
    };

    let mut client = OpenAIClient::new(api_key);
    if let Some(model) = model.or(config.default.model.as_deref()) {
        client = client.with_model(model);
    }
    if let Some(base_url) = &config.default.base_url {
        client = client.with_base_url(base_url);
    }
    Ok(Arc::new(client))
}

fn open_storage(db_path: &Path) -> Result<Arc<dyn MemoryBackend>> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(RedbBackend::open(db_path)?))
}

/// Manager with the full pipeline, for chat.
pub fn prepare_manager(
    config: &CliConfig,
    db_path: &Path,
    llm: Arc<dyn LlmClient>,
) -> Result<MemoryManager> {
    let storage = open_storage(db_path)?;
    Ok(MemoryManager::new(config.memory.clone(), storage, llm)?)
}

/// Manager for administrative commands: both pipelines are off, so the
/// client is never called and no API key is required.
pub fn prepare_admin_manager(config: &CliConfig, db_path: &Path) -> Result<MemoryManager> {
    let mut memory = config.memory.clone().synchronous();
    memory.enable_user_memories = false;
    memory.enable_session_summary = false;

    let api_key = std::env::var(OPENAI_API_KEY_ENV).unwrap_or_default();
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAIClient::new(api_key));
    let storage = open_storage(db_path)?;
    Ok(MemoryManager::new(memory, storage, llm)?)
}
