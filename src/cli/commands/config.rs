use anyhow::Result;
use std::path::PathBuf;

use super::Command;
use crate::config::SubdubConfig;

pub struct ConfigCommand {
    config: SubdubConfig,
    save: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn new(config: SubdubConfig) -> Self {
        Self { config, save: None }
    }

    pub fn with_save_path(mut self, save: Option<PathBuf>) -> Self {
        self.save = save;
        self
    }
}

impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        match &self.save {
            Some(path) => {
                self.config.save_to_file(path)?;
                println!("✅ Configuration written to {}", path.display());
            }
            None => {
                println!("⚙️  EFFECTIVE CONFIGURATION");
                println!("─────────────────────────");
                print!("{}", toml::to_string_pretty(&self.config)?);
            }
        }
        Ok(())
    }
}
