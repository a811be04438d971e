//! Prompts sent to generative providers.
//!
//! Every backend receives the same instructions, so the shape of each reply
//! is defined here once and parsed by `lectio_providers::normalize`.

use lectio_core::{Prompt, VerseReference};

const SYSTEM_SCRIPTURE: &str = "You are a precise Bible text assistant. \
Quote scripture exactly as published in the requested translation. \
Reply with JSON only, without commentary or markdown.";

const SYSTEM_STUDY: &str = "You are a thoughtful Bible study companion. \
Stay faithful to the passage and its context. \
Reply with JSON only, without commentary or markdown.";

/// Verse text for `reference` in `translation`.
pub fn scripture(reference: &VerseReference, translation: &str) -> Prompt {
    let user = format!(
        "Return the text of {reference} in the {translation} translation.\n\
         Respond with a JSON array containing one object per verse, in order, \
         with the fields \"verse_num\" (integer) and \"verse_string\" (string).\n\
         Include only verses {start} through {end} of chapter {chapter}. \
         Do not include verse numbers, headings or footnotes inside \"verse_string\".",
        start = reference.start_verse(),
        end = reference.end_verse(),
        chapter = reference.chapter(),
    );
    Prompt::new(SYSTEM_SCRIPTURE, user)
}

/// One- or two-sentence takeaway for a passage.
pub fn key_takeaway(reference: &str) -> Prompt {
    let user = format!(
        "What is the key takeaway of {reference}?\n\
         Answer in one or two plain sentences a reader can remember.\n\
         Respond as {{\"takeaway\": \"...\"}}."
    );
    Prompt::new(SYSTEM_STUDY, user)
}

/// Contextual score for a user's comment on a passage.
pub fn score(reference: &str, user_comment: &str) -> Prompt {
    let user = format!(
        "A reader wrote this reflection on {reference}:\n\n\
         \"\"\"\n{user_comment}\n\"\"\"\n\n\
         Score from 0 to 100 how well the reflection fits the meaning of the \
         passage in its context, and explain the score in two or three sentences.\n\
         Respond as {{\"context_score\": <integer>, \"context_explanation\": \"...\"}}."
    );
    Prompt::new(SYSTEM_STUDY, user)
}

/// Follow-up turn asking for application feedback after [`score`].
pub fn application_feedback() -> &'static str {
    "Now give the reader brief, encouraging feedback on how they could apply \
     this passage in daily life, building on their reflection.\n\
     Respond as {\"feedback\": \"...\"}."
}

/// Whether `takeaway` is a faithful summary of the passage.
pub fn validate_takeaway(reference: &str, takeaway: &str) -> Prompt {
    let user = format!(
        "Is the following a faithful takeaway of {reference}?\n\n\
         \"\"\"\n{takeaway}\n\"\"\"\n\n\
         It is valid if it is consistent with the passage and its context, \
         even if worded loosely.\n\
         Respond as {{\"is_valid\": true}} or {{\"is_valid\": false}}."
    );
    Prompt::new(SYSTEM_STUDY, user)
}

/// Up to five references matching a free-text description.
pub fn find_verses(description: &str) -> Prompt {
    let user = format!(
        "Find up to five Bible passages that match this description:\n\n\
         \"\"\"\n{description}\n\"\"\"\n\n\
         Respond with a JSON array of references such as [\"John 3:16\", \"Psalm 23:1-4\"], \
         best match first."
    );
    Prompt::new(SYSTEM_STUDY, user)
}
