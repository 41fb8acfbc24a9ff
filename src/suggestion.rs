//! The per-task suggestion list and its pure edit operations.
//!
//! Historical records mix two shapes: legacy bare strings and structured
//! `{text, time, done}` items. Every mutation that touches a legacy item
//! normalizes it to the structured shape; the structured shape is the only
//! one written going forward. Item identity is the text value itself, so
//! two items with the same text are indistinguishable to the editor.

use serde::{Deserialize, Serialize};

/// One entry of a task's suggestion list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuggestionItem {
    /// Legacy representation: a bare string.
    Plain(String),
    /// Structured representation with an optional time estimate in minutes.
    Structured {
        text: String,
        #[serde(default)]
        time: i64,
        #[serde(default)]
        done: bool,
    },
}

impl SuggestionItem {
    pub fn structured(text: impl Into<String>, time: i64, done: bool) -> Self {
        SuggestionItem::Structured {
            text: text.into(),
            time,
            done,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            SuggestionItem::Plain(text) => text,
            SuggestionItem::Structured { text, .. } => text,
        }
    }

    pub fn is_done(&self) -> bool {
        match self {
            SuggestionItem::Plain(_) => false,
            SuggestionItem::Structured { done, .. } => *done,
        }
    }

    pub fn time_minutes(&self) -> i64 {
        match self {
            SuggestionItem::Plain(_) => 0,
            SuggestionItem::Structured { time, .. } => *time,
        }
    }
}

/// Decode the stored blob into a suggestion list.
///
/// `None`/empty decodes to an empty list. A JSON array decodes item by item.
/// Anything else (the oldest records held a single free-text suggestion) is
/// kept as one legacy item.
pub fn decode_list(blob: Option<&str>) -> Vec<SuggestionItem> {
    let Some(blob) = blob else {
        return Vec::new();
    };
    let trimmed = blob.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<SuggestionItem>>(trimmed) {
        Ok(items) => items,
        Err(_) => vec![SuggestionItem::Plain(blob.to_string())],
    }
}

/// Encode a suggestion list back into the stored blob form.
pub fn encode_list(items: &[SuggestionItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Append a provider-supplied item, normalized to the structured shape.
/// A missing time estimate defaults to 0.
pub fn push_item(mut list: Vec<SuggestionItem>, text: String, time: Option<i64>) -> Vec<SuggestionItem> {
    list.push(SuggestionItem::Structured {
        text,
        time: time.unwrap_or(0),
        done: false,
    });
    list
}

/// Remove every item whose text equals `target` (exact, case-sensitive).
/// Non-matching items pass through untouched, legacy shape included.
pub fn remove_item(list: Vec<SuggestionItem>, target: &str) -> Vec<SuggestionItem> {
    list.into_iter().filter(|item| item.text() != target).collect()
}

/// Toggle the done flag on every item whose text equals `target`.
///
/// A matching legacy item is normalized and set to done=true (not flipped:
/// the pre-normalization state carries no flag to flip). Returns the new
/// list and whether anything changed.
pub fn toggle_item(list: Vec<SuggestionItem>, target: &str) -> (Vec<SuggestionItem>, bool) {
    let mut changed = false;
    let list = list
        .into_iter()
        .map(|item| match item {
            SuggestionItem::Plain(text) if text == target => {
                changed = true;
                SuggestionItem::Structured {
                    text,
                    time: 0,
                    done: true,
                }
            }
            SuggestionItem::Structured { text, time, done } if text == target => {
                changed = true;
                SuggestionItem::Structured {
                    text,
                    time,
                    done: !done,
                }
            }
            other => other,
        })
        .collect();
    (list, changed)
}

/// Rewrite the first item whose text equals `old`: text becomes `new`, and
/// when `new_time` parses as an integer the estimate is replaced too
/// (unparseable input is ignored field-by-field, not an error). Later items
/// with the same text are untouched.
pub fn edit_first_item(
    mut list: Vec<SuggestionItem>,
    old: &str,
    new: &str,
    new_time: Option<&str>,
) -> (Vec<SuggestionItem>, bool) {
    let parsed_time = new_time.and_then(|t| t.trim().parse::<i64>().ok());
    for item in list.iter_mut() {
        if item.text() != old {
            continue;
        }
        let replacement = match &*item {
            SuggestionItem::Plain(_) => SuggestionItem::Structured {
                text: new.to_string(),
                time: parsed_time.unwrap_or(0),
                done: false,
            },
            SuggestionItem::Structured { time, done, .. } => SuggestionItem::Structured {
                text: new.to_string(),
                time: parsed_time.unwrap_or(*time),
                done: *done,
            },
        };
        *item = replacement;
        return (list, true);
    }
    (list, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_absent_and_empty_blobs() {
        assert!(decode_list(None).is_empty());
        assert!(decode_list(Some("")).is_empty());
        assert!(decode_list(Some("   ")).is_empty());
    }

    #[test]
    fn decode_mixed_list() {
        let blob = r#"["Call the bank", {"text": "Pack bags", "time": 15, "done": true}]"#;
        let items = decode_list(Some(blob));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], SuggestionItem::Plain("Call the bank".to_string()));
        assert_eq!(items[1], SuggestionItem::structured("Pack bags", 15, true));
    }

    #[test]
    fn decode_structured_defaults() {
        let items = decode_list(Some(r#"[{"text": "Step"}]"#));
        assert_eq!(items, vec![SuggestionItem::structured("Step", 0, false)]);
    }

    #[test]
    fn legacy_free_text_blob_becomes_single_item() {
        let items = decode_list(Some("Break it into three steps"));
        assert_eq!(
            items,
            vec![SuggestionItem::Plain("Break it into three steps".to_string())]
        );
    }

    #[test]
    fn encode_decode_roundtrip_keeps_mixed_shapes() {
        let items = vec![
            SuggestionItem::Plain("old".to_string()),
            SuggestionItem::structured("new", 5, false),
        ];
        assert_eq!(decode_list(Some(&encode_list(&items))), items);
    }

    #[test]
    fn push_normalizes_provider_items() {
        let list = push_item(Vec::new(), "Warm up".to_string(), None);
        let list = push_item(list, "Run".to_string(), Some(30));
        assert_eq!(list[0], SuggestionItem::structured("Warm up", 0, false));
        assert_eq!(list[1], SuggestionItem::structured("Run", 30, false));
    }

    #[test]
    fn remove_drops_all_matches() {
        let list = vec![
            SuggestionItem::Plain("dup".to_string()),
            SuggestionItem::structured("keep", 1, false),
            SuggestionItem::structured("dup", 2, true),
        ];
        let out = remove_item(list, "dup");
        assert_eq!(out, vec![SuggestionItem::structured("keep", 1, false)]);
    }

    #[test]
    fn remove_of_absent_text_is_a_noop() {
        let list = vec![SuggestionItem::structured("a", 1, false)];
        assert_eq!(remove_item(list.clone(), "missing"), list);
    }

    #[test]
    fn toggle_flips_structured_items() {
        let list = vec![SuggestionItem::structured("a", 5, false)];
        let (list, changed) = toggle_item(list, "a");
        assert!(changed);
        assert_eq!(list[0], SuggestionItem::structured("a", 5, true));
        let (list, _) = toggle_item(list, "a");
        assert_eq!(list[0], SuggestionItem::structured("a", 5, false));
    }

    #[test]
    fn toggle_normalizes_legacy_items_to_done() {
        let list = vec![SuggestionItem::Plain("a".to_string())];
        let (list, changed) = toggle_item(list, "a");
        assert!(changed);
        // First toggle normalizes and lands on done=true.
        assert_eq!(list[0], SuggestionItem::structured("a", 0, true));
        // Second toggle flips normally, so double-toggle is not the identity
        // for a legacy item.
        let (list, _) = toggle_item(list, "a");
        assert_eq!(list[0], SuggestionItem::structured("a", 0, false));
    }

    #[test]
    fn toggle_missing_text_reports_no_change() {
        let list = vec![SuggestionItem::structured("a", 0, false)];
        let (out, changed) = toggle_item(list.clone(), "b");
        assert!(!changed);
        assert_eq!(out, list);
    }

    #[test]
    fn edit_only_touches_first_match() {
        let list = vec![
            SuggestionItem::structured("Old", 10, false),
            SuggestionItem::structured("Old", 1, false),
        ];
        let (list, changed) = edit_first_item(list, "Old", "New", Some("20"));
        assert!(changed);
        assert_eq!(list[0], SuggestionItem::structured("New", 20, false));
        assert_eq!(list[1], SuggestionItem::structured("Old", 1, false));
    }

    #[test]
    fn edit_ignores_unparseable_time() {
        let list = vec![SuggestionItem::structured("Old", 10, true)];
        let (list, changed) = edit_first_item(list, "Old", "New", Some("soon"));
        assert!(changed);
        // Time stays, done flag survives the rewrite.
        assert_eq!(list[0], SuggestionItem::structured("New", 10, true));
    }

    #[test]
    fn edit_normalizes_legacy_match() {
        let list = vec![SuggestionItem::Plain("Old".to_string())];
        let (list, changed) = edit_first_item(list, "Old", "New", None);
        assert!(changed);
        assert_eq!(list[0], SuggestionItem::structured("New", 0, false));
    }

    #[test]
    fn edit_missing_target_reports_no_change() {
        let list = vec![SuggestionItem::structured("a", 0, false)];
        let (out, changed) = edit_first_item(list.clone(), "b", "c", None);
        assert!(!changed);
        assert_eq!(out, list);
    }
}
