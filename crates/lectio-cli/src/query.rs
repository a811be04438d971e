//! Operation commands: `fetch`, `takeaway`, `score`, `validate`, `search`.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use lectio_core::config::{load_config, Config};
use lectio_core::VerseReference;
use lectio_service::ScriptureService;

use crate::helpers;

fn load(path: Option<&Path>) -> (Config, ScriptureService) {
    let config = load_config(path);
    let service = ScriptureService::from_config(&config);
    info!(state = %service.state(), "service ready for query");
    (config, service)
}

fn parse_reference(reference: &str) -> Result<VerseReference> {
    reference
        .parse()
        .with_context(|| format!("could not read '{reference}' as a verse reference"))
}

pub async fn fetch(
    path: Option<&Path>,
    reference: &str,
    translation: Option<&str>,
    as_json: bool,
) -> Result<()> {
    let reference = parse_reference(reference)?;
    let (config, service) = load(path);
    let translation = translation.unwrap_or(&config.default_translation);

    let verses = service
        .fetch_scripture(&reference, translation)
        .await
        .with_context(|| format!("failed to fetch {reference}"))?;

    if as_json {
        helpers::print_json(&json!({
            "reference": reference.to_string(),
            "translation": translation,
            "verses": verses,
        }))
    } else {
        helpers::print_verses(&reference, translation, &verses);
        Ok(())
    }
}

pub async fn takeaway(path: Option<&Path>, reference: &str, as_json: bool) -> Result<()> {
    let reference = parse_reference(reference)?;
    let (_, service) = load(path);

    let takeaway = service
        .key_takeaway(&reference)
        .await
        .with_context(|| format!("failed to get a takeaway for {reference}"))?;

    if as_json {
        helpers::print_json(&json!({ "reference": reference.to_string(), "takeaway": takeaway }))
    } else {
        helpers::print_text(&format!("Takeaway for {reference}"), &takeaway);
        Ok(())
    }
}

pub async fn score(path: Option<&Path>, reference: &str, comment: &str, as_json: bool) -> Result<()> {
    let reference = parse_reference(reference)?;
    let (_, service) = load(path);

    let score = service
        .ai_score(&reference, comment)
        .await
        .with_context(|| format!("failed to score the comment on {reference}"))?;

    if as_json {
        helpers::print_json(&score)
    } else {
        helpers::print_score(&reference, &score);
        Ok(())
    }
}

pub async fn validate(
    path: Option<&Path>,
    reference: &str,
    takeaway: &str,
    as_json: bool,
) -> Result<()> {
    let reference = parse_reference(reference)?;
    let (_, service) = load(path);

    let valid = service
        .validate_takeaway(&reference, takeaway)
        .await
        .with_context(|| format!("failed to validate the takeaway for {reference}"))?;

    if as_json {
        helpers::print_json(&json!({ "reference": reference.to_string(), "isValid": valid }))
    } else {
        helpers::print_verdict(&reference, valid);
        Ok(())
    }
}

pub async fn search(path: Option<&Path>, description: &str, as_json: bool) -> Result<()> {
    let (_, service) = load(path);

    let references = service
        .find_verses_by_description(description)
        .await
        .context("failed to search for passages")?;

    if as_json {
        let refs: Vec<String> = references.iter().map(ToString::to_string).collect();
        helpers::print_json(&refs)
    } else {
        helpers::print_references(description, &references);
        Ok(())
    }
}
