//! ESV API scripture provider: authoritative text lookup.
//!
//! `GET {base}/passage/text/?q=John 3:16-18` with `Authorization: Token <key>`.
//! The reply is `{ "query": …, "passages": ["[16] For God so loved … [17] …"] }`;
//! inline `[n]` markers are split into one [`VerseText`] per verse.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use lectio_core::config::ProviderConfig;
use lectio_core::utils::squash_whitespace;
use lectio_core::{OperationResult, ProviderError, VerseReference, VerseText};

use crate::http::{decode_envelope, send_for_text};
use crate::settings::SettingsSlot;
use crate::traits::{Provider, ProviderDescriptor, ScriptureProvider};

/// Public ESV API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.esv.org/v3";

/// Translations this backend serves.
pub const SUPPORTED_TRANSLATIONS: &[&str] = &["ESV"];

static VERSE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("verse marker regex is valid"));

/// Query flags: keep verse numbers, drop everything else around the text.
const PASSAGE_FLAGS: &[(&str, &str)] = &[
    ("include-passage-references", "false"),
    ("include-verse-numbers", "true"),
    ("include-first-verse-numbers", "true"),
    ("include-footnotes", "false"),
    ("include-footnote-body", "false"),
    ("include-headings", "false"),
    ("include-short-copyright", "false"),
];

#[derive(Debug, Deserialize)]
struct PassageResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    passages: Vec<String>,
}

/// Scripture lookup against the ESV API.
pub struct EsvProvider {
    descriptor: ProviderDescriptor,
    client: reqwest::Client,
    settings: SettingsSlot,
    timeout: Duration,
}

impl std::fmt::Debug for EsvProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsvProvider")
            .field("id", &self.descriptor.id)
            .field("configured", &self.settings.is_set())
            .finish()
    }
}

impl EsvProvider {
    pub fn new(descriptor: ProviderDescriptor, timeout: Duration) -> Self {
        Self {
            descriptor,
            client: reqwest::Client::new(),
            settings: SettingsSlot::new(),
            timeout,
        }
    }

    fn passage_url(api_base: &str) -> String {
        format!("{}/passage/text/", api_base)
    }
}

impl Provider for EsvProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn configure(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        self.settings
            .configure(config, &self.descriptor, DEFAULT_API_BASE)
    }

    fn is_available(&self) -> bool {
        self.settings.is_set()
    }
}

#[async_trait]
impl ScriptureProvider for EsvProvider {
    fn supported_translations(&self) -> &[&'static str] {
        SUPPORTED_TRANSLATIONS
    }

    async fn fetch_scripture(&self, reference: &VerseReference) -> OperationResult<Vec<VerseText>> {
        let settings = self.settings.require(&self.descriptor)?;
        let query = reference.lookup_query();

        debug!(provider = %self.descriptor.id, query = %query, "fetching passage");

        let request = self
            .client
            .get(Self::passage_url(&settings.api_base))
            .header("Authorization", format!("Token {}", settings.api_key))
            .query(&[("q", query.as_str())])
            .query(PASSAGE_FLAGS);

        let body = send_for_text(request, self.timeout, &self.descriptor.id).await?;
        let response: PassageResponse = decode_envelope(&body)?;

        let passage = response.passages.join(" ");
        let verses = split_verses(&passage, reference.start_verse());
        if verses.is_empty() {
            return Err(ProviderError::MalformedResponse(format!(
                "no passage text returned for '{}'",
                if response.query.is_empty() { &query } else { &response.query }
            )));
        }
        Ok(verses)
    }
}

/// Split passage text on `[n]` markers.
///
/// Text without any marker is treated as a single verse numbered
/// `first_verse`. Blank segments are dropped.
pub fn split_verses(passage: &str, first_verse: u32) -> Vec<VerseText> {
    let markers: Vec<(u32, usize, usize)> = VERSE_MARKER
        .captures_iter(passage)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let number = cap.get(1)?.as_str().parse().ok()?;
            Some((number, whole.start(), whole.end()))
        })
        .collect();

    if markers.is_empty() {
        let text = squash_whitespace(passage);
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![VerseText::new(first_verse, text)]
        };
    }

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, &(number, _, text_start))| {
            let text_end = markers.get(i + 1).map_or(passage.len(), |m| m.1);
            let text = squash_whitespace(&passage[text_start..text_end]);
            (!text.is_empty()).then(|| VerseText::new(number, text))
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
