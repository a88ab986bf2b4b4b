//! Result cursor for `find`.

use std::cmp::Ordering;

use serde_json::Value;

use super::document::Document;
use super::index::IndexKey;

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Options for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Number of matches to skip from the start.
    pub skip: usize,
    /// Maximum number of matches to yield.
    pub limit: Option<usize>,
    /// Sort keys applied before skip/limit.
    pub sort: Vec<(String, SortOrder)>,
    /// Fields removed from every yielded document.
    pub exclude: Vec<String>,
}

/// A finite, non-restartable sequence of matching documents.
///
/// Matches are snapshotted, sorted, and projected when the cursor is
/// created, so iteration never observes later writes; consuming the cursor
/// is the only way to read its results.
#[derive(Debug)]
pub struct Cursor {
    items: std::vec::IntoIter<Document>,
}

impl Cursor {
    pub(crate) fn new(mut matches: Vec<Document>, options: &FindOptions) -> Self {
        if !options.sort.is_empty() {
            matches.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }

        let mut items: Vec<Document> = matches
            .into_iter()
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();

        if !options.exclude.is_empty() {
            for doc in &mut items {
                for field in &options.exclude {
                    doc.remove(field);
                }
            }
        }

        Self {
            items: items.into_iter(),
        }
    }
}

impl Iterator for Cursor {
    type Item = Document;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}

fn compare_documents(a: &Document, b: &Document, sort: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in sort {
        let ka = sort_key(a.get(field));
        let kb = sort_key(b.get(field));
        let cmp = ka.cmp(&kb);
        if cmp != Ordering::Equal {
            return match order {
                SortOrder::Ascending => cmp,
                SortOrder::Descending => cmp.reverse(),
            };
        }
    }
    Ordering::Equal
}

fn sort_key(value: Option<&Value>) -> IndexKey {
    value
        .and_then(IndexKey::from_json)
        .unwrap_or(IndexKey::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(values: Vec<serde_json::Value>) -> Vec<Document> {
        values
            .into_iter()
            .map(|value| value.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_sort_skip_limit() {
        let matches = docs(vec![
            json!({"n": 3}),
            json!({"n": 1}),
            json!({"n": 4}),
            json!({"n": 2}),
        ]);
        let options = FindOptions {
            skip: 1,
            limit: Some(2),
            sort: vec![("n".to_string(), SortOrder::Ascending)],
            exclude: vec![],
        };
        let yielded: Vec<i64> = Cursor::new(matches, &options)
            .map(|doc| doc["n"].as_i64().unwrap())
            .collect();
        assert_eq!(yielded, vec![2, 3]);
    }

    #[test]
    fn test_cursor_is_finite_and_consumed_once() {
        let mut cursor = Cursor::new(docs(vec![json!({"n": 1})]), &FindOptions::default());
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_exclusion_applies_to_all_items() {
        let options = FindOptions {
            exclude: vec!["history".to_string()],
            ..Default::default()
        };
        let cursor = Cursor::new(
            docs(vec![json!({"n": 1, "history": []}), json!({"n": 2, "history": []})]),
            &options,
        );
        for doc in cursor {
            assert!(!doc.contains_key("history"));
        }
    }
}
