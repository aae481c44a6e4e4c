// crates/search/src/normalize.rs
//! Query normalization (C4 — SPEC_FULL.md §4.4.1): Unicode-aware
//! tokenization, per-script minimum-length filtering, and FTS5 MATCH-string
//! escaping.

use regex::Regex;
use std::sync::OnceLock;

const MAX_TOKENS: usize = 32;

/// Matches a run of Unicode letters/numbers/combining marks — used to
/// decide whether a whitespace-delimited chunk is "word-like" at all (a
/// chunk of bare punctuation is not a token), not as the token's own text:
/// the whole chunk (including embedded punctuation such as a stray quote)
/// is kept, so escaping downstream operates on what the caller actually typed.
fn word_char_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}\p{M}]").expect("static word-char regex is valid"))
}

fn latin_script_char() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{Latin}").expect("static latin-script regex is valid"))
}

/// The result of normalizing a raw query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedQuery {
    /// The string to hand to FTS5's MATCH, e.g. `"foo" AND "bar"`. `None`
    /// when no searchable token survives filtering (§4.4.1 step 5).
    pub fts_query: Option<String>,
    /// Searchable tokens (post length-filter), for client-side highlighting.
    pub tokens: Vec<String>,
    /// Set when more than [`MAX_TOKENS`] raw tokens were extracted and the
    /// rest were discarded (§4.4.1 step 3).
    pub truncated: bool,
}

impl NormalizedQuery {
    pub fn is_empty(&self) -> bool {
        self.fts_query.is_none()
    }
}

enum TokenCategory {
    Numeric,
    Latin,
    Other,
}

/// Classifies a token per §4.4.1 step 4: purely-numeric, Latin-script (no
/// non-Latin letters), or "other" (contains a non-Latin letter).
fn classify(token: &str) -> TokenCategory {
    if token.chars().all(|c| c.is_numeric()) {
        return TokenCategory::Numeric;
    }
    let has_non_latin_letter = token
        .chars()
        .any(|c| c.is_alphabetic() && !latin_script_char().is_match(c.encode_utf8(&mut [0u8; 4])));
    if has_non_latin_letter {
        TokenCategory::Other
    } else {
        TokenCategory::Latin
    }
}

fn is_searchable(token: &str) -> bool {
    let len = token.chars().count();
    match classify(token) {
        TokenCategory::Numeric => len >= 2,
        TokenCategory::Latin => len >= 3,
        TokenCategory::Other => len >= 1,
    }
}

/// Doubles every `"` in `token` and wraps it in quotes, matching FTS5's
/// string-literal escaping rule.
fn escape_fts_token(token: &str) -> String {
    format!("\"{}\"", token.replace('"', "\"\""))
}

/// Normalizes a raw query string per §4.4.1. Tokens are whitespace-delimited
/// chunks of the trimmed input that contain at least one Unicode
/// letter/number/mark; the chunk's full text (including any embedded
/// punctuation) is kept as the token, so a stray interior quote is escaped
/// rather than silently splitting the chunk in two.
pub fn normalize(raw: &str) -> NormalizedQuery {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedQuery::default();
    }

    let mut raw_tokens: Vec<&str> =
        trimmed.split_whitespace().filter(|chunk| word_char_regex().is_match(chunk)).collect();
    let truncated = raw_tokens.len() > MAX_TOKENS;
    raw_tokens.truncate(MAX_TOKENS);

    let tokens: Vec<String> = raw_tokens.into_iter().filter(|t| is_searchable(t)).map(str::to_string).collect();

    if tokens.is_empty() {
        return NormalizedQuery { fts_query: None, tokens: Vec::new(), truncated };
    }

    let fts_query = tokens.iter().map(|t| escape_fts_token(t)).collect::<Vec<_>>().join(" AND ");
    NormalizedQuery { fts_query: Some(fts_query), tokens, truncated }
}
