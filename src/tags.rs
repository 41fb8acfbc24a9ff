//! Tag token extraction and normalization.
//!
//! Tags are one-word `#tokens` embedded in task titles: `"Fix heater #home"`.
//! The title is stored stripped of tokens; the token bodies go through the
//! per-user tag registry (see `db::tags`).

use regex_lite::Regex;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Word characters plus hyphens: #health-check is a single tag.
    PATTERN.get_or_init(|| Regex::new(r"#([\w-]+)").expect("valid tag pattern"))
}

/// Extract the deduplicated tag bodies (without `#`) from free text, in
/// order of first appearance. Case is kept as written; the registry decides
/// about case folding.
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in tag_pattern().captures_iter(text) {
        let body = cap[1].to_string();
        if !seen.contains(&body) {
            seen.push(body);
        }
    }
    seen
}

/// Remove every `#token` from the text, then collapse runs of whitespace
/// and trim the ends.
pub fn strip_tags(text: &str) -> String {
    let cleaned = tag_pattern().replace_all(text, "");
    let mut out = String::with_capacity(cleaned.len());
    let mut last_was_space = true; // leading whitespace is dropped
    for ch in cleaned.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Registry-side cleaning: lowercase, strip a leading `#` defensively, trim.
/// Returns `None` when nothing usable remains; such tags are not registered.
pub fn clean_tag_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    let name = name.strip_prefix('#').unwrap_or(&name).to_string();
    if name.is_empty() { None } else { Some(name) }
}
