//! Store Accessor
//!
//! The store is a tree rooted at a [`Record`]. Reads and writes address it
//! with resolved path segments (see [`path`]).
//!
//! # Reads
//!
//! [`Store::retrieve`] walks from the root. Observable containers are read
//! through their own `get`; plain maps and arrays are indexed directly.
//! Walking into anything else yields `None`.
//!
//! # Writes
//!
//! [`Store::update`] never mutates a record's nested plain data in place.
//! The walk remembers the last observable container it entered; the first
//! segment after it names an attribute, and the rest of the path is written
//! into a copy of that attribute which then replaces it whole. The record
//! therefore emits its change events for every nested write.

pub mod deep;
pub mod path;

use crate::observable::{Observable, Record, Value};

pub use deep::deep_set;
pub use path::{parse_path, trim, Segments};

/// The hierarchical data store.
#[derive(Debug, Clone)]
pub struct Store {
    root: Record,
}

impl Store {
    /// Create a store with an empty root record.
    pub fn new() -> Self {
        Self {
            root: Record::new(),
        }
    }

    /// Wrap an existing record as the root.
    pub fn with_root(root: Record) -> Self {
        Self { root }
    }

    /// Get the root record.
    pub fn root(&self) -> &Record {
        &self.root
    }

    /// Value at `segments`, or `None` if any step is missing.
    pub fn retrieve<S: AsRef<str>>(&self, segments: &[S]) -> Option<Value> {
        let mut cur = Value::Record(self.root.clone());
        for segment in segments {
            cur = step(cur, segment.as_ref())?;
        }
        Some(cur)
    }

    /// Write `value` at `segments`. An empty path is ignored.
    pub fn update<S: AsRef<str>>(&self, segments: &[S], value: Value) {
        if segments.is_empty() {
            tracing::debug!("ignoring write to the store root");
            return;
        }

        let mut owner = Observable::Record(self.root.clone());
        let mut cur = Some(Value::Record(self.root.clone()));
        let mut local: Vec<&str> = Vec::with_capacity(segments.len());

        for segment in segments {
            let segment = segment.as_ref();
            match cur.as_ref().and_then(Value::observable) {
                Some(observable) => {
                    cur = observable.get(segment);
                    owner = observable;
                    local.clear();
                }
                None => cur = cur.and_then(|v| step(v, segment)),
            }
            local.push(segment);
        }

        let (attr, rest) = match local.split_first() {
            Some(split) => split,
            None => return,
        };
        let child = if rest.is_empty() {
            value
        } else {
            let mut child = owner.get(attr).unwrap_or_default();
            deep_set(&mut child, rest, value);
            child
        };
        if !owner.set(attr, child) {
            tracing::debug!(attr = *attr, "write rejected by container");
        }
    }

    /// Plain JSON copy of the whole tree.
    pub fn snapshot(&self) -> serde_json::Value {
        Value::Record(self.root.clone()).to_json()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// One step of a read walk. Takes `value` by value so plain containers can
/// hand out their child without cloning it.
pub(crate) fn step(value: Value, segment: &str) -> Option<Value> {
    match value {
        Value::Record(record) => record.get(segment),
        Value::List(list) => segment.parse().ok().and_then(|i| list.get(i)),
        Value::Map(mut map) => map.swap_remove(segment),
        Value::Array(mut items) => match segment.parse::<usize>() {
            Ok(index) if index < items.len() => Some(items.swap_remove(index)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{List, RecordEvent, ListenerKey};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn missing_paths_are_none() {
        let store = Store::new();
        assert_eq!(store.retrieve(&["nope"]), None);
        store.update(&["leaf"], Value::from(1));
        assert_eq!(store.retrieve(&["leaf", "deeper"]), None);
    }

    #[test]
    fn empty_path_is_the_root() {
        let store = Store::new();
        let root = store.retrieve::<&str>(&[]).unwrap();
        assert_eq!(root, Value::Record(store.root().clone()));
    }

    #[test]
    fn update_creates_plain_maps_under_root() {
        let store = Store::new();
        store.update(&["session", "user", "name"], Value::from("ada"));
        assert_eq!(
            store.retrieve(&["session", "user", "name"]),
            Some(Value::from("ada"))
        );
        assert_eq!(store.snapshot(), json!({"session": {"user": {"name": "ada"}}}));
    }

    #[test]
    fn nested_write_replaces_whole_attribute() {
        let store = Store::new();
        let model = Record::from_iter([("hello", Value::from(json!({"deep": "value", "keep": 1})))]);
        store.update(&["mymodel"], Value::from(model.clone()));

        let fired = Rc::new(Cell::new(0));
        let fired_clone = Rc::clone(&fired);
        model.listen(
            RecordEvent::ChangeKey("hello".into()),
            ListenerKey::new(1, 0),
            Rc::new(move || fired_clone.set(fired_clone.get() + 1)),
        );

        store.update(&["mymodel", "hello", "deep"], Value::from("other"));
        assert_eq!(fired.get(), 1);
        assert_eq!(
            model.get("hello").unwrap().to_json(),
            json!({"deep": "other", "keep": 1})
        );
    }

    #[test]
    fn writes_and_reads_through_lists() {
        let store = Store::new();
        let list = List::from_iter([json!({"title": "a"})].map(Value::from));
        store.update(&["todos"], Value::from(list.clone()));

        store.update(&["todos", "0", "title"], Value::from("b"));
        assert_eq!(store.retrieve(&["todos", "0", "title"]), Some(Value::from("b")));

        store.update(&["todos", "1"], Value::from("appended"));
        assert_eq!(list.len(), 2);

        store.update(&["todos", "9"], Value::from("ignored"));
        assert_eq!(list.len(), 2);
        assert_eq!(store.retrieve(&["todos", "x"]), None);
    }

    #[test]
    fn reads_plain_arrays() {
        let store = Store::new();
        store.update(&["xs"], Value::from(json!([10, 20])));
        assert_eq!(store.retrieve(&["xs", "1"]), Some(Value::from(20)));
        assert_eq!(store.retrieve(&["xs", "2"]), None);
    }
}
