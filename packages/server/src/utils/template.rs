//! Placeholder substitution and length accounting for SMS bodies.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}|\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}")
        .expect("valid regex")
});

/// Characters that fit in a single-part message.
pub const SINGLE_SEGMENT_CHARS: usize = 70;
/// Characters per part once a message is split.
pub const MULTI_SEGMENT_CHARS: usize = 67;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content: String,
    /// Placeholders that had no value, in first-seen order without duplicates.
    pub missing: Vec<String>,
}

/// Substitute `${name}` and `{name}` placeholders. Unknown names are left in place.
pub fn render(template: &str, params: &HashMap<String, String>) -> Rendered {
    let mut missing = Vec::new();
    let mut seen = BTreeSet::new();

    let content = PLACEHOLDER_RE.replace_all(template, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        match params.get(name) {
            Some(value) => value.clone(),
            None => {
                if seen.insert(name.to_string()) {
                    missing.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    Rendered {
        content: content.into_owned(),
        missing,
    }
}

/// Placeholder names used by a template, deduplicated in first-seen order.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Number of billed parts for a message of `chars` characters.
pub fn segment_count(chars: usize) -> usize {
    match chars {
        0 => 0,
        n if n <= SINGLE_SEGMENT_CHARS => 1,
        n => n.div_ceil(MULTI_SEGMENT_CHARS),
    }
}
