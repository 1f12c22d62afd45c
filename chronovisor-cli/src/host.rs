//! Interactive key selection for terminals.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chronovisor_core::{ApiKeySlot, Config, KeySelector};
use inquire::Password;
use std::path::PathBuf;
use tracing::info;

/// Prompts for a key on the terminal and persists it to the config file.
#[derive(Debug)]
pub struct TerminalKeySelector {
    slot: ApiKeySlot,
    config_path: PathBuf,
}

impl TerminalKeySelector {
    pub fn new(slot: ApiKeySlot, config_path: PathBuf) -> Self {
        Self { slot, config_path }
    }
}

#[async_trait]
impl KeySelector for TerminalKeySelector {
    async fn has_selected_api_key(&self) -> bool {
        self.slot.is_set()
    }

    async fn open_select_key(&self) -> Result<()> {
        let key = tokio::task::spawn_blocking(|| {
            Password::new("Gemini API key:")
                .without_confirmation()
                .with_help_message("Stored in the chronovisor config file")
                .prompt()
        })
        .await
        .context("Key selection prompt panicked")?
        .context("Key selection cancelled")?;

        let mut config = Config::load_from(&self.config_path)?;
        config.set_api_key(key);
        config.save_to(&self.config_path)?;

        self.slot.set(config.api_key.clone());
        info!(path = %self.config_path.display(), "API key saved");
        Ok(())
    }
}
