//! `lectio status`: show configuration and provider status.
//!
//! Configures the built-in providers exactly as a query would, without any
//! network traffic, and reports what ended up usable.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use lectio_core::config::{get_config_path, load_config};
use lectio_providers::BUILTIN_PROVIDERS;
use lectio_service::{ScriptureService, ServiceState};

/// Run the status command.
pub fn run(path: Option<&Path>) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let config = load_config(Some(&config_path));
    let service = ScriptureService::from_config(&config);

    println!();
    println!("{}", "📖 Lectio Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );
    println!("  {:<18} {}", "Translation:".bold(), config.default_translation);
    println!(
        "  {:<18} {}",
        "Retry:".bold(),
        format!(
            "{} attempts, {}ms → {}ms",
            config.retry.max_attempts, config.retry.initial_delay_ms, config.retry.max_delay_ms
        )
        .dimmed()
    );

    let state = match service.state() {
        ServiceState::Ready => "ready".green(),
        other => other.to_string().yellow(),
    };
    println!("  {:<18} {}", "Service:".bold(), state);

    println!();
    println!("  {}", "Providers (in fallback order):".bold());

    let errors = service
        .last_configuration()
        .map(|s| s.outcome.errors)
        .unwrap_or_default();

    for spec in BUILTIN_PROVIDERS {
        let available = service
            .registry()
            .get(spec.id)
            .is_some_and(|p| p.is_available());
        let model = config
            .provider(spec.id)
            .map(|p| p.model_name.trim())
            .filter(|m| !m.is_empty())
            .unwrap_or(spec.default_model);

        let status = if available {
            format!("{} ready", "✓".green())
        } else if let Some((_, message)) = errors.iter().find(|(id, _)| id == spec.id) {
            format!("{} {}", "✗".red(), message.dimmed())
        } else {
            format!("{} (set {})", "· not configured".dimmed(), spec.env_hint)
        };

        println!(
            "    {:>3}  {:<16} {:<26} {}",
            spec.priority,
            spec.display_name,
            model.dimmed(),
            status
        );
    }

    let unknown: Vec<_> = errors
        .iter()
        .filter(|(id, _)| lectio_providers::find_by_id(id).is_none())
        .map(|(id, _)| id.as_str())
        .collect();
    if !unknown.is_empty() {
        println!();
        println!(
            "  {} unknown provider ids in config: {}",
            "!".yellow(),
            unknown.join(", ")
        );
    }

    println!();
    Ok(())
}
