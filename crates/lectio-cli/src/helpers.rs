//! Shared CLI helpers: path expansion and result printing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use lectio_core::{ScoreResult, VerseReference, VerseText};

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print any serializable result as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{text}");
    Ok(())
}

fn print_heading(title: &str) {
    println!();
    println!("{}", format!("📖 {title}").cyan().bold());
}

pub fn print_verses(reference: &VerseReference, translation: &str, verses: &[VerseText]) {
    print_heading(&format!("{reference} ({translation})"));
    for verse in verses {
        println!("  {} {}", format!("{:>3}", verse.verse_number).dimmed(), verse.text);
    }
    println!();
}

pub fn print_text(title: &str, text: &str) {
    print_heading(title);
    if text.is_empty() {
        println!("  {}", "(no response)".dimmed());
    } else {
        println!("  {text}");
    }
    println!();
}

pub fn print_score(reference: &VerseReference, score: &ScoreResult) {
    print_heading(&format!("Score for {reference}"));
    let value = format!("{}/100", score.context_score);
    let value = match score.context_score {
        70.. => value.green(),
        40..=69 => value.yellow(),
        _ => value.red(),
    };
    println!("  {:<14} {}", "Context:".bold(), value.bold());
    println!("  {:<14} {}", "Explanation:".bold(), score.context_explanation);
    if !score.application_feedback.is_empty() {
        println!("  {:<14} {}", "Application:".bold(), score.application_feedback);
    }
    println!();
}

pub fn print_verdict(reference: &VerseReference, valid: bool) {
    print_heading(&format!("Takeaway for {reference}"));
    if valid {
        println!("  {} fits the passage", "✓".green());
    } else {
        println!("  {} does not fit the passage", "✗".red());
    }
    println!();
}

pub fn print_references(description: &str, references: &[VerseReference]) {
    print_heading(&format!("Passages for \"{description}\""));
    if references.is_empty() {
        println!("  {}", "(none found)".dimmed());
    }
    for reference in references {
        println!("  • {reference}");
    }
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/lectio/config.json");
        assert!(result.ends_with("lectio/config.json"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_absolute() {
        assert_eq!(expand_tilde("/etc/lectio.json"), PathBuf::from("/etc/lectio.json"));
    }

    #[test]
    fn expand_tilde_relative() {
        assert_eq!(expand_tilde("conf.json"), PathBuf::from("conf.json"));
    }
}
