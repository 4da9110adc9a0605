//! # Merge-Write Semantics
//!
//! A merge write applies an incoming record on top of the stored document the
//! same way Firestore's `set(data, { merge: true })` does: every leaf field the
//! incoming record carries is written, nested maps are merged recursively, and
//! stored fields the incoming record does not mention are left alone.
//!
//! Stores that merge natively (Firestore) express this as an update mask built
//! by [`merge_field_paths`]; stores that do not (the in-memory test store) call
//! [`merge_into`].

use crate::types::Record;
use serde_json::Value;

/// Applies `incoming` on top of `target` in place.
pub fn merge_into(target: &mut Record, incoming: &Record) {
    for (name, value) in incoming {
        match (target.get_mut(name), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) if !nested.is_empty() => {
                merge_into(existing, nested);
            }
            _ => {
                target.insert(name.clone(), value.clone());
            }
        }
    }
}

/// Lists the field paths a merge write of `record` touches.
///
/// Non-empty maps are descended into; every other value (including an empty
/// map, which is written as-is) is a leaf. Segments that are not plain
/// identifiers are quoted with backticks, as Firestore field paths require.
pub fn merge_field_paths(record: &Record) -> Vec<String> {
    merge_field_paths_with(record, |_| false)
}

/// Like [`merge_field_paths`], but maps for which `is_leaf` returns true are
/// written whole instead of descended into.
///
/// Stores use this for maps that encode a single native value, such as a
/// timestamp: the mask must name the field itself, since the write carries
/// no sub-fields for it.
pub fn merge_field_paths_with<F>(record: &Record, is_leaf: F) -> Vec<String>
where
    F: Fn(&Record) -> bool,
{
    let mut paths = Vec::new();
    collect_paths(record, &is_leaf, &mut Vec::new(), &mut paths);
    paths.sort();
    paths
}

fn collect_paths<F>(map: &Record, is_leaf: &F, prefix: &mut Vec<String>, out: &mut Vec<String>)
where
    F: Fn(&Record) -> bool,
{
    for (name, value) in map {
        prefix.push(quote_segment(name));
        match value {
            Value::Object(nested) if !nested.is_empty() && !is_leaf(nested) => {
                collect_paths(nested, is_leaf, prefix, out)
            }
            _ => out.push(prefix.join(".")),
        }
        prefix.pop();
    }
}

fn quote_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
