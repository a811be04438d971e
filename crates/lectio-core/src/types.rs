//! Core value types passed between the service, the providers, and callers.
//!
//! All of these are plain values created per call; none hold shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

// ─────────────────────────────────────────────
// VerseReference
// ─────────────────────────────────────────────

/// A contiguous range of verses within one chapter, e.g. `John 3:16-18`.
///
/// Constructed through [`VerseReference::new`] or parsed from a string, so
/// `chapter >= 1`, `start_verse >= 1` and `end_verse >= start_verse` always hold.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawVerseReference")]
pub struct VerseReference {
    book: String,
    chapter: u32,
    start_verse: u32,
    end_verse: u32,
}

impl VerseReference {
    /// Create a validated reference.
    pub fn new(
        book: impl Into<String>,
        chapter: u32,
        start_verse: u32,
        end_verse: u32,
    ) -> Result<Self, ProviderError> {
        let book = book.into().trim().to_string();
        if book.is_empty() {
            return Err(ProviderError::BadRequest("book name is empty".into()));
        }
        if chapter == 0 || start_verse == 0 {
            return Err(ProviderError::BadRequest(format!(
                "chapter and verse numbers must be positive ({book} {chapter}:{start_verse})"
            )));
        }
        if end_verse < start_verse {
            return Err(ProviderError::BadRequest(format!(
                "end verse {end_verse} precedes start verse {start_verse}"
            )));
        }
        Ok(Self {
            book,
            chapter,
            start_verse,
            end_verse,
        })
    }

    /// Shorthand for a single verse (`start == end`).
    pub fn single(book: impl Into<String>, chapter: u32, verse: u32) -> Result<Self, ProviderError> {
        Self::new(book, chapter, verse, verse)
    }

    pub fn book(&self) -> &str {
        &self.book
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn start_verse(&self) -> u32 {
        self.start_verse
    }

    pub fn end_verse(&self) -> u32 {
        self.end_verse
    }

    /// Number of verses covered by this reference.
    pub fn verse_count(&self) -> u32 {
        self.end_verse - self.start_verse + 1
    }

    /// Query string understood by scripture lookup services: `"John 3:16-18"`.
    ///
    /// Always includes the end verse, even for a single verse.
    pub fn lookup_query(&self) -> String {
        format!(
            "{} {}:{}-{}",
            self.book, self.chapter, self.start_verse, self.end_verse
        )
    }
}

/// Unchecked wire form; deserialization goes through [`VerseReference::new`].
#[derive(Deserialize)]
struct RawVerseReference {
    book: String,
    chapter: u32,
    start_verse: u32,
    end_verse: u32,
}

impl TryFrom<RawVerseReference> for VerseReference {
    type Error = ProviderError;

    fn try_from(raw: RawVerseReference) -> Result<Self, Self::Error> {
        Self::new(raw.book, raw.chapter, raw.start_verse, raw.end_verse)
    }
}

impl fmt::Display for VerseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_verse == self.end_verse {
            write!(f, "{} {}:{}", self.book, self.chapter, self.start_verse)
        } else {
            write!(
                f,
                "{} {}:{}-{}",
                self.book, self.chapter, self.start_verse, self.end_verse
            )
        }
    }
}

impl FromStr for VerseReference {
    type Err = ProviderError;

    /// Parse `"John 3:16"`, `"1 John 1:5-7"`, or `"Song of Songs 2:1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProviderError::BadRequest(format!("invalid verse reference '{s}'"));

        let trimmed = s.trim();
        let (book, location) = trimmed.rsplit_once(char::is_whitespace).ok_or_else(invalid)?;
        let (chapter, verses) = location.split_once(':').ok_or_else(invalid)?;
        let chapter: u32 = chapter.trim().parse().map_err(|_| invalid())?;

        let (start, end) = match verses.split_once('-') {
            Some((start, end)) => (start, end),
            None => (verses, verses),
        };
        let start: u32 = start.trim().parse().map_err(|_| invalid())?;
        let end: u32 = end.trim().parse().map_err(|_| invalid())?;

        Self::new(book, chapter, start, end)
    }
}

// ─────────────────────────────────────────────
// VerseText
// ─────────────────────────────────────────────

/// One verse of returned scripture text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseText {
    pub verse_number: u32,
    pub text: String,
}

impl VerseText {
    pub fn new(verse_number: u32, text: impl Into<String>) -> Self {
        Self {
            verse_number,
            text: text.into(),
        }
    }
}

// ─────────────────────────────────────────────
// ScoreResult
// ─────────────────────────────────────────────

/// Highest possible context score.
pub const MAX_SCORE: u8 = 100;

/// Evaluation of a user's comment on a passage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// How well the comment fits the passage context, 0–100.
    pub context_score: u8,
    pub context_explanation: String,
    /// Filled by a second provider call; empty when that call failed.
    #[serde(default)]
    pub application_feedback: String,
}

impl ScoreResult {
    /// Build a score, clamping any out-of-range value into `0..=100`.
    pub fn new(score: i64, explanation: impl Into<String>) -> Self {
        Self {
            context_score: score.clamp(0, MAX_SCORE as i64) as u8,
            context_explanation: explanation.into(),
            application_feedback: String::new(),
        }
    }

    /// Conservative result used when a reply could not be parsed.
    pub fn fallback() -> Self {
        Self::new(
            0,
            "The response could not be evaluated. Please try again.",
        )
    }
}

// ─────────────────────────────────────────────
// Prompt
// ─────────────────────────────────────────────

/// A system/user instruction pair sent to a generative backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
