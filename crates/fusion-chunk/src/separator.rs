//! Separator matching and fragment splitting.

use regex::Regex;

use fusion_core::{FusionError, KeepSeparator, Result};

/// A compiled separator.
#[derive(Debug, Clone)]
pub enum Separator {
    /// Empty separator: split into single characters.
    Chars,
    /// Literal text.
    Literal(String),
    /// Regular expression.
    Pattern(Regex),
}

impl Separator {
    /// Build a separator, compiling `raw` as a regex when `is_regex` is set.
    pub fn new(raw: &str, is_regex: bool) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::Chars);
        }
        if !is_regex {
            return Ok(Self::Literal(raw.to_string()));
        }
        let regex = Regex::new(raw).map_err(|e| {
            FusionError::config(format!("invalid separator pattern '{}': {}", raw, e))
        })?;
        Ok(Self::Pattern(regex))
    }

    /// Build a literal separator.
    pub fn literal(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Chars
        } else {
            Self::Literal(raw.to_string())
        }
    }

    /// Whether this is the per-character fallback.
    pub fn is_chars(&self) -> bool {
        matches!(self, Self::Chars)
    }

    /// Whether the separator occurs in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Chars => true,
            Self::Literal(lit) => text.contains(lit.as_str()),
            Self::Pattern(regex) => regex.is_match(text),
        }
    }

    /// Text re-inserted between fragments when the separator was discarded.
    ///
    /// For patterns this is the first match in `text`.
    pub fn joiner<'a>(&'a self, text: &'a str) -> &'a str {
        match self {
            Self::Chars => "",
            Self::Literal(lit) => lit,
            Self::Pattern(regex) => regex.find(text).map(|m| m.as_str()).unwrap_or(""),
        }
    }

    /// Split `text` into non-empty fragments.
    pub fn split<'a>(&self, text: &'a str, keep: KeepSeparator) -> Vec<&'a str> {
        let ranges: Vec<(usize, usize)> = match self {
            Self::Chars => {
                // Character-level split as last resort
                return text
                    .char_indices()
                    .map(|(i, c)| &text[i..i + c.len_utf8()])
                    .collect();
            }
            Self::Literal(lit) => text
                .match_indices(lit.as_str())
                .map(|(i, m)| (i, i + m.len()))
                .collect(),
            Self::Pattern(regex) => regex.find_iter(text).map(|m| (m.start(), m.end())).collect(),
        };

        let mut fragments = Vec::with_capacity(ranges.len() + 1);
        let mut last = 0;
        for (start, end) in ranges {
            match keep {
                KeepSeparator::Discard => {
                    fragments.push(&text[last..start]);
                    last = end;
                }
                KeepSeparator::Start => {
                    fragments.push(&text[last..start]);
                    last = start;
                }
                KeepSeparator::End => {
                    fragments.push(&text[last..end]);
                    last = end;
                }
            }
        }
        fragments.push(&text[last..]);

        fragments.into_iter().filter(|s| !s.is_empty()).collect()
    }
}
