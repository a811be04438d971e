//! Response normalizer: turns free-form model replies into typed results.
//!
//! Models are asked for JSON but routinely wrap it in markdown fences, add
//! prose around it, or leave unescaped quotation marks inside quoted text.
//! Everything here is a pure `&str -> value` function:
//!
//! 1. [`strip_code_fences`] removes ```` ```json ```` / ```` ``` ```` markers.
//! 2. [`extract_json_span`] keeps only the outermost balanced `{…}` / `[…]`.
//! 3. [`repair_free_text_fields`] fixes quoting inside known prose fields.
//! 4. The `parse_*` functions decode the expected shape, fall back narrowly
//!    when the reply is plain text, and drop items that break invariants.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use lectio_core::utils::squash_whitespace;

use crate::esv::split_verses;
use lectio_core::{OperationResult, ProviderError, ScoreResult, VerseReference, VerseText};

/// JSON keys whose values are prose and may be repaired.
pub const FREE_TEXT_FIELDS: &[&str] = &[
    "verse_string",
    "verse_text",
    "text",
    "takeaway",
    "key_takeaway",
    "context_explanation",
    "explanation",
    "feedback",
    "application_feedback",
];

const VERSE_NUMBER_KEYS: &[&str] = &["verse_num", "verse_number", "verse", "number"];
const VERSE_TEXT_KEYS: &[&str] = &["verse_string", "verse_text", "text", "content"];
const TAKEAWAY_KEYS: &[&str] = &["takeaway", "key_takeaway", "text"];
const FEEDBACK_KEYS: &[&str] = &["feedback", "application_feedback", "text"];
const SCORE_KEYS: &[&str] = &["context_score", "score"];
const EXPLANATION_KEYS: &[&str] = &["context_explanation", "explanation"];
const VALID_KEYS: &[&str] = &["is_valid", "isValid", "valid"];
const LIST_KEYS: &[&str] = &["verses", "references", "results"];

// ─────────────────────────────────────────────
// Text cleanup
// ─────────────────────────────────────────────

/// Remove markdown code-fence markers and their language tags.
pub fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Return the outermost balanced `{…}` or `[…]` span, ignoring brackets
/// inside JSON strings.
///
/// If stray quotes make the span unbalanced, the span runs to the last
/// matching closer (or the end of the text) so repair can still try.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    match text.rfind(close) {
        Some(end) if end > start => Some(&text[start..=end]),
        _ => Some(&text[start..]),
    }
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\u{201C}' | '\u{201D}')
}

/// Whether a quote followed by `after` ends a string value.
fn closes_value(after: &str) -> bool {
    let t = after.trim_start();
    match t.chars().next() {
        None | Some('}') | Some(']') => true,
        Some(',') => {
            let next = t[1..].trim_start();
            next.is_empty() || next.starts_with(['"', '{', '}', ']', '\u{201C}'])
        }
        _ => false,
    }
}

/// Clean one string value. With `detect_close`, stops at the first quote that
/// ends the value and returns the byte offset just past it.
fn clean_value(segment: &str, detect_close: bool) -> (String, Option<usize>) {
    let mut cleaned = String::with_capacity(segment.len());
    let mut chars = segment.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&(_, n)) if "\"\\/bfnrtu".contains(n) => {
                    cleaned.push('\\');
                    cleaned.push(n);
                    chars.next();
                }
                _ => {}
            },
            c if is_quote(c) => {
                let after = i + c.len_utf8();
                if detect_close && closes_value(&segment[after..]) {
                    return (cleaned, Some(after));
                }
            }
            '\n' | '\r' | '\t' => cleaned.push(' '),
            c if c.is_control() => {}
            c => cleaned.push(c),
        }
    }
    (cleaned, None)
}

/// Repair string values of the given prose fields so they decode as JSON.
///
/// Interior unescaped quotes (straight or typographic) are removed, raw
/// control characters become spaces, and a missing closing quote is added
/// before the next `}` / `]`. Keys, numbers and structural characters
/// elsewhere are left untouched.
pub fn repair_free_text_fields(json: &str, fields: &[&str]) -> String {
    let mut out = String::with_capacity(json.len());
    let mut rest = json;

    loop {
        let next_key = fields
            .iter()
            .filter_map(|f| {
                let pattern = format!("\"{f}\"");
                rest.find(&pattern).map(|pos| (pos, pos + pattern.len()))
            })
            .min_by_key(|(pos, _)| *pos);
        let Some((_, key_end)) = next_key else { break };

        let after_key = &rest[key_end..];
        let colon_rel = after_key.len() - after_key.trim_start().len();
        if !after_key[colon_rel..].starts_with(':') {
            out.push_str(&rest[..key_end]);
            rest = &rest[key_end..];
            continue;
        }
        let after_colon = &after_key[colon_rel + 1..];
        let ws = after_colon.len() - after_colon.trim_start().len();
        let value_head = &after_colon[ws..];
        let Some(open) = value_head.chars().next().filter(|c| is_quote(*c)) else {
            // Not a string value (number, null, nested object): leave it.
            out.push_str(&rest[..key_end]);
            rest = &rest[key_end..];
            continue;
        };

        let prefix_len = key_end + colon_rel + 1 + ws;
        let body = &value_head[open.len_utf8()..];

        let (cleaned, remainder) = match clean_value(body, true) {
            (cleaned, Some(end)) => (cleaned, &body[end..]),
            (_, None) => {
                let cut = body.find(['}', ']']).unwrap_or(body.len());
                let (cleaned, _) = clean_value(&body[..cut], false);
                (cleaned.trim_end().to_string(), &body[cut..])
            }
        };

        out.push_str(&rest[..prefix_len]);
        out.push('"');
        out.push_str(&cleaned);
        out.push('"');
        rest = remainder;
    }

    out.push_str(rest);
    out
}

/// Strip fences, extract the JSON span, and decode it, repairing prose
/// fields only if the first decode fails.
///
/// Returns the cleaned text alongside the value; a `None` value means the
/// reply is not JSON at all and the caller's plain-text fallback applies.
///
/// A reply that is entirely one bracketed span must decode. A span embedded
/// in prose only counts when it decodes to structured data, so `[that]` or
/// a leading `[16]` marker stays plain text.
fn decode_loose(raw: &str) -> OperationResult<(String, Option<Value>)> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ProviderError::MalformedResponse("empty response".into()));
    }
    let Some(span) = extract_json_span(&cleaned) else {
        return Ok((cleaned, None));
    };
    let whole_reply = span.len() == cleaned.len();
    let decoded = decode_span(span);

    if whole_reply {
        let value = decoded.map_err(|e| {
            debug!(error = %e, "JSON decode failed after repair");
            ProviderError::MalformedResponse(format!("could not decode JSON: {e}"))
        })?;
        return Ok((cleaned, Some(value)));
    }

    match decoded {
        Ok(value) if is_structured(&value) => Ok((cleaned, Some(value))),
        _ => {
            debug!("brackets belong to prose, treating reply as plain text");
            Ok((cleaned, None))
        }
    }
}

fn decode_span(span: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str::<Value>(span).or_else(|_| {
        let repaired = repair_free_text_fields(span, FREE_TEXT_FIELDS);
        serde_json::from_str::<Value>(&repaired)
    })
}

/// Objects, or non-empty lists of objects/strings.
fn is_structured(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => {
            !items.is_empty() && items.iter().all(|i| i.is_object() || i.is_string())
        }
        _ => false,
    }
}

// ─────────────────────────────────────────────
// Value helpers
// ─────────────────────────────────────────────

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null())
}

fn as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim().trim_end_matches('%').trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}

fn as_text(v: &Value) -> Option<String> {
    v.as_str()
        .map(squash_whitespace)
        .filter(|s| !s.is_empty())
}

/// Array items, either at the top level or under a list-like key.
fn list_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => match field(obj, LIST_KEYS) {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![value],
        },
        other => vec![other],
    }
}

/// Strip surrounding straight/typographic quotes from plain-text replies.
fn unquote(text: &str) -> String {
    squash_whitespace(text.trim().trim_matches(is_quote))
}

// ─────────────────────────────────────────────
// Per-operation parsers
// ─────────────────────────────────────────────

/// Parse scripture text. Expected shape: `[{"verse_num": 16, "verse_string": "…"}]`,
/// optionally wrapped as `{"verses": […]}`.
///
/// Plain non-JSON text is split on inline `[n]` markers; without markers it
/// becomes a single verse numbered with the requested start verse. Items
/// with blank text are dropped.
pub fn parse_verses(raw: &str, reference: &VerseReference) -> OperationResult<Vec<VerseText>> {
    let (cleaned, value) = decode_loose(raw)?;

    let Some(value) = value else {
        debug!(reference = %reference, "verse reply is plain text");
        let verses = split_verses(&cleaned, reference.start_verse());
        if verses.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "no valid verses found in response".into(),
            ));
        }
        return Ok(verses);
    };

    let verses: Vec<VerseText> = list_items(&value)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let obj = item.as_object()?;
            let text = field(obj, VERSE_TEXT_KEYS).and_then(as_text)?;
            let number = match field(obj, VERSE_NUMBER_KEYS).and_then(as_u32) {
                Some(n) => n,
                // Past the last representable verse: drop the item.
                None => reference
                    .start_verse()
                    .checked_add(u32::try_from(idx).ok()?)?,
            };
            Some(VerseText::new(number, text))
        })
        .collect();

    if verses.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "no valid verses found in response".into(),
        ));
    }
    Ok(verses)
}

fn parse_text_field(raw: &str, keys: &[&str], what: &str) -> OperationResult<String> {
    let (cleaned, value) = decode_loose(raw)?;
    let text = match value {
        None => Some(unquote(&cleaned)).filter(|s| !s.is_empty()),
        Some(Value::Object(obj)) => field(&obj, keys).and_then(as_text),
        Some(Value::String(s)) => Some(squash_whitespace(&s)).filter(|s| !s.is_empty()),
        Some(_) => None,
    };
    text.ok_or_else(|| ProviderError::MalformedResponse(format!("no {what} found in response")))
}

/// Parse a key takeaway. Expected shape: `{"takeaway": "…"}`; plain text is accepted.
pub fn parse_takeaway(raw: &str) -> OperationResult<String> {
    parse_text_field(raw, TAKEAWAY_KEYS, "takeaway")
}

/// Parse application feedback. Expected shape: `{"feedback": "…"}`; plain text is accepted.
pub fn parse_feedback(raw: &str) -> OperationResult<String> {
    parse_text_field(raw, FEEDBACK_KEYS, "feedback")
}

/// Parse a context score. Expected shape:
/// `{"context_score": 85, "context_explanation": "…"}`.
///
/// An empty reply is an error; any other unparseable reply yields
/// [`ScoreResult::fallback`]. Scores are clamped to `0..=100`.
pub fn parse_score(raw: &str) -> OperationResult<ScoreResult> {
    let parsed = match decode_loose(raw) {
        Ok((_, Some(Value::Object(obj)))) => field(&obj, SCORE_KEYS).and_then(as_i64).map(|score| {
            let explanation = field(&obj, EXPLANATION_KEYS)
                .and_then(as_text)
                .unwrap_or_default();
            ScoreResult::new(score, explanation)
        }),
        Ok(_) => None,
        Err(ProviderError::MalformedResponse(msg)) if msg == "empty response" => {
            return Err(ProviderError::MalformedResponse(msg));
        }
        Err(_) => None,
    };

    Ok(parsed.unwrap_or_else(|| {
        warn!("score reply could not be parsed, using fallback score");
        ScoreResult::fallback()
    }))
}

/// Parse a takeaway validation verdict. Expected shape: `{"is_valid": true}`;
/// plain `true`/`false`/`yes`/`no` is accepted.
pub fn parse_validation(raw: &str) -> OperationResult<bool> {
    let (cleaned, value) = decode_loose(raw)?;
    let verdict = match value {
        Some(Value::Object(obj)) => field(&obj, VALID_KEYS).and_then(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::String(s) => verdict_from_text(s),
            _ => None,
        }),
        Some(Value::Bool(b)) => Some(b),
        Some(_) => None,
        None => verdict_from_text(&cleaned),
    };
    verdict.ok_or_else(|| {
        ProviderError::MalformedResponse("no validation verdict found in response".into())
    })
}

fn verdict_from_text(text: &str) -> Option<bool> {
    let word: String = unquote(text)
        .to_lowercase()
        .chars()
        .take_while(|c| c.is_alphabetic())
        .collect();
    match word.as_str() {
        "true" | "yes" | "valid" => Some(true),
        "false" | "no" | "invalid" => Some(false),
        _ => None,
    }
}

/// Parse verse references found for a description. Expected shape:
/// `[{"book": "John", "chapter": 3, "start_verse": 16, "end_verse": 17}]`;
/// string items like `"John 3:16"` are accepted too. Invalid items are dropped.
pub fn parse_verse_references(raw: &str) -> OperationResult<Vec<VerseReference>> {
    let (_, value) = decode_loose(raw)?;
    let Some(value) = value else {
        return Err(ProviderError::MalformedResponse(
            "expected a JSON list of verse references".into(),
        ));
    };

    let references: Vec<VerseReference> = list_items(&value)
        .into_iter()
        .filter_map(reference_from_value)
        .collect();

    if references.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "no valid verse references found in response".into(),
        ));
    }
    Ok(references)
}

fn reference_from_value(item: &Value) -> Option<VerseReference> {
    match item {
        Value::String(s) => s.parse().ok(),
        Value::Object(obj) => {
            let book = field(obj, &["book", "book_name"]).and_then(as_text)?;
            let chapter = field(obj, &["chapter"]).and_then(as_u32)?;
            let start = field(obj, &["start_verse", "verse_start", "start", "verse"]).and_then(as_u32)?;
            let end = field(obj, &["end_verse", "verse_end", "end"])
                .and_then(as_u32)
                .unwrap_or(start);
            VerseReference::new(book, chapter, start, end).ok()
        }
        _ => None,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
