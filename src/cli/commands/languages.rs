use anyhow::Result;

use super::Command;
use crate::session::languages::SUPPORTED_LANGUAGES;
use crate::session::types::{DEFAULT_DUBBING_LANGUAGE, DEFAULT_SUBTITLE_LANGUAGE};

pub struct LanguagesCommand;

impl LanguagesCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self) -> String {
        let mut out = String::from("🌍 SUPPORTED LANGUAGES\n");
        out.push_str("─────────────────────\n");
        for language in SUPPORTED_LANGUAGES {
            let mut marks = Vec::new();
            if language.code == DEFAULT_SUBTITLE_LANGUAGE {
                marks.push("default subtitles");
            }
            if language.code == DEFAULT_DUBBING_LANGUAGE {
                marks.push("default dubbing");
            }
            if marks.is_empty() {
                out.push_str(&format!("  {:<4} {}\n", language.code, language.name));
            } else {
                out.push_str(&format!("  {:<4} {} ({})\n", language.code, language.name, marks.join(", ")));
            }
        }
        out
    }
}

impl Default for LanguagesCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for LanguagesCommand {
    async fn execute(&self) -> Result<()> {
        print!("{}", self.render());
        Ok(())
    }
}
