//! `lectio init`: write a default configuration file.
//!
//! The file gets one entry per built-in provider with an empty key, so the
//! user only has to paste credentials in.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use lectio_core::config::{get_config_path, save_config, Config, ProviderConfig};
use lectio_providers::BUILTIN_PROVIDERS;

/// Default config with a placeholder entry for every built-in provider.
pub fn default_config() -> Config {
    let mut config = Config::default();
    for spec in BUILTIN_PROVIDERS {
        config.providers.insert(
            spec.id.to_string(),
            ProviderConfig {
                model_name: spec.default_model.to_string(),
                ..ProviderConfig::default()
            },
        );
    }
    config
}

/// Run the init command.
pub fn run(path: Option<&Path>, force: bool) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    println!();
    println!("{}", "📖 Lectio — Setup".cyan().bold());
    println!();

    if config_path.exists() && !force {
        println!(
            "  {} config already exists at {} (use --force to overwrite)",
            "✓".green(),
            config_path.display()
        );
        println!();
        return Ok(());
    }

    save_config(&default_config(), Some(&config_path))
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    println!("  {} created config at {}", "✓".green(), config_path.display());
    println!();
    println!(
        "  Add an API key under {} for each provider you use,",
        "providers.<id>.apiKey".bold()
    );
    println!(
        "  or set {} in the environment.",
        "LECTIO_PROVIDERS__<ID>__API_KEY".bold()
    );
    println!();
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lectio_core::config::load_config;

    #[test]
    fn default_config_lists_every_provider() {
        let config = default_config();
        assert_eq!(config.providers.len(), BUILTIN_PROVIDERS.len());
        let openai = config.provider("openai").unwrap();
        assert_eq!(openai.model_name, "gpt-4o-mini");
        assert!(!openai.is_configured());
    }

    #[test]
    fn init_writes_and_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        run(Some(&path), false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"defaultTranslation\""));

        std::fs::write(&path, "{}").unwrap();
        run(Some(&path), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        run(Some(&path), true).unwrap();
        let config = load_config(Some(&path));
        assert!(config.provider("esv").is_some());
    }
}
