//! Event array expansion - one `EventEntry` per array element
//!
//! Every element produces exactly one entry, so the number of entries always
//! matches the array length. Elements that are not objects become blank
//! entries instead of being skipped.

use crate::decompose::types::{EventEntry, EVENT_NAME_KEY};
use crate::decompose::projector::cell_text;
use serde_json::Value;

/// What to yield when there is no usable event array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingArray {
    /// Yield nothing (array-expansion mode)
    Empty,
    /// Yield a single blank entry so the record still gets a row (combined mode)
    Sentinel,
}

#[derive(Debug, Clone, Copy)]
pub struct EventArrayExpander {
    on_missing: MissingArray,
}

impl EventArrayExpander {
    pub fn new(on_missing: MissingArray) -> Self {
        EventArrayExpander { on_missing }
    }

    pub fn on_missing(&self) -> MissingArray {
        self.on_missing
    }

    /// Expand an event section. `None`, non-array values, and (in sentinel
    /// mode) empty arrays all fall under the missing-array policy.
    pub fn expand(&self, section: Option<Value>) -> Events {
        match section {
            Some(Value::Array(items)) if !items.is_empty() => Events::elements(items),
            _ => match self.on_missing {
                MissingArray::Empty => Events::none(),
                MissingArray::Sentinel => Events::sentinel(),
            },
        }
    }

    /// Expand an already-parsed array element by element
    pub fn expand_items(&self, items: Vec<Value>) -> Events {
        self.expand(Some(Value::Array(items)))
    }
}

/// Turn one array element into an entry
pub fn entry_from_value(value: Value) -> EventEntry {
    match value {
        Value::Object(obj) => {
            let name = obj.get(EVENT_NAME_KEY).map(cell_text).unwrap_or_default();
            let raw = Value::Object(obj).to_string();
            EventEntry { name, raw }
        }
        _ => EventEntry::blank(),
    }
}

/// Lazy sequence of entries, converted one element at a time
#[derive(Debug, Clone)]
pub struct Events {
    inner: EventsInner,
}

#[derive(Debug, Clone)]
enum EventsInner {
    Elements(std::vec::IntoIter<Value>),
    Sentinel(bool),
}

impl Events {
    fn elements(items: Vec<Value>) -> Self {
        Events {
            inner: EventsInner::Elements(items.into_iter()),
        }
    }

    fn none() -> Self {
        Self::elements(Vec::new())
    }

    fn sentinel() -> Self {
        Events {
            inner: EventsInner::Sentinel(false),
        }
    }
}

impl Iterator for Events {
    type Item = EventEntry;

    fn next(&mut self) -> Option<EventEntry> {
        match &mut self.inner {
            EventsInner::Elements(items) => items.next().map(entry_from_value),
            EventsInner::Sentinel(done) => {
                if *done {
                    None
                } else {
                    *done = true;
                    Some(EventEntry::blank())
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match &self.inner {
            EventsInner::Elements(items) => items.len(),
            EventsInner::Sentinel(done) => usize::from(!*done),
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Events {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_objects_in_order() {
        let expander = EventArrayExpander::new(MissingArray::Empty);
        let entries: Vec<_> = expander
            .expand(Some(json!([{"en": "click"}, {"en": "view", "kv": {"a": 1}}])))
            .collect();

        assert_eq!(
            entries,
            vec![
                EventEntry::new("click", r#"{"en":"click"}"#),
                EventEntry::new("view", r#"{"en":"view","kv":{"a":1}}"#),
            ]
        );
    }

    #[test]
    fn test_raw_keeps_key_order() {
        let expander = EventArrayExpander::new(MissingArray::Empty);
        let entry = expander
            .expand(Some(json!([{"z": 1, "en": "e", "a": 2}])))
            .next()
            .unwrap();
        assert_eq!(entry.raw, r#"{"z":1,"en":"e","a":2}"#);
    }

    #[test]
    fn test_non_object_elements_are_not_skipped() {
        let expander = EventArrayExpander::new(MissingArray::Empty);
        let entries: Vec<_> = expander
            .expand(Some(json!([1, "x", null, [1], true, {"en": "e1"}])))
            .collect();

        assert_eq!(entries.len(), 6);
        assert!(entries[..5].iter().all(EventEntry::is_blank));
        assert_eq!(entries[5].name, "e1");
    }

    #[test]
    fn test_raw_keeps_number_text() {
        let expander = EventArrayExpander::new(MissingArray::Empty);
        let body = r#"{"en":"a","v":1.10,"n":1e2,"id":98765432109876543210}"#;
        let section: Value = serde_json::from_str(&format!("[{}]", body)).unwrap();

        let entry = expander.expand(Some(section)).next().unwrap();
        assert_eq!(entry.raw, body);
    }

    #[test]
    fn test_missing_name() {
        let entry = entry_from_value(json!({"kv": 1}));
        assert_eq!(entry.name, "");
        assert_eq!(entry.raw, r#"{"kv":1}"#);
    }

    #[test]
    fn test_missing_array_policy() {
        let empty = EventArrayExpander::new(MissingArray::Empty);
        assert_eq!(empty.expand(None).count(), 0);
        assert_eq!(empty.expand(Some(json!({"en": "x"}))).count(), 0);
        assert_eq!(empty.expand(Some(json!([]))).count(), 0);

        let sentinel = EventArrayExpander::new(MissingArray::Sentinel);
        for section in [None, Some(json!("nope")), Some(json!([]))] {
            let entries: Vec<_> = sentinel.expand(section).collect();
            assert_eq!(entries, vec![EventEntry::blank()]);
        }
    }

    #[test]
    fn test_exact_size() {
        let expander = EventArrayExpander::new(MissingArray::Sentinel);
        let mut events = expander.expand_items(vec![json!(1), json!(2)]);
        assert_eq!(events.len(), 2);
        events.next();
        assert_eq!(events.len(), 1);

        let mut sentinel = expander.expand(None);
        assert_eq!(sentinel.len(), 1);
        sentinel.next();
        assert_eq!(sentinel.len(), 0);
    }
}
