//! Observable Containers
//!
//! The store is a tree of [`Value`]s. Most of it is plain data, but two
//! container kinds are observable and carry their own change notifications:
//!
//! - [`Record`]: keyed attributes; emits `Change` and `ChangeKey(key)`.
//! - [`List`]: ordered items; emits `Insert`, `Remove` and `Reorder`.
//!
//! These are the only points where the reactive layer can bind. Plain maps
//! and arrays nested inside a record are replaced wholesale on write so the
//! record's own events cover them.
//!
//! Delivery is synchronous: the mutating call returns only after every
//! listener has run.

mod listeners;
mod list;
mod record;
mod value;

pub use listeners::{Callback, ListenerKey};
pub use list::{List, ListEvent};
pub use record::{Record, RecordEvent};
pub use value::Value;

/// An observable container, either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Observable {
    Record(Record),
    List(List),
}

impl Observable {
    /// Read a child through the container's own accessor.
    ///
    /// Lists are indexed by decimal position.
    pub fn get(&self, segment: &str) -> Option<Value> {
        match self {
            Observable::Record(record) => record.get(segment),
            Observable::List(list) => segment.parse().ok().and_then(|i| list.get(i)),
        }
    }

    /// Write a child through the container's own mutator.
    ///
    /// Returns false if the write could not be applied (e.g. a list index
    /// that is neither in range nor the next free slot).
    pub fn set(&self, segment: &str, value: Value) -> bool {
        match self {
            Observable::Record(record) => {
                record.set(segment, value);
                true
            }
            Observable::List(list) => match segment.parse::<usize>() {
                Ok(index) if index <= list.len() => {
                    list.replace(index, value);
                    true
                }
                _ => false,
            },
        }
    }

    /// Remove every listener registered under `key`.
    pub fn unlisten(&self, key: ListenerKey) -> usize {
        match self {
            Observable::Record(record) => record.unlisten(key),
            Observable::List(list) => list.unlisten(key),
        }
    }

    /// Whether both refer to the same container.
    pub fn ptr_eq(&self, other: &Observable) -> bool {
        self == other
    }
}

impl From<Observable> for Value {
    fn from(value: Observable) -> Self {
        match value {
            Observable::Record(record) => Value::Record(record),
            Observable::List(list) => Value::List(list),
        }
    }
}

impl From<Record> for Observable {
    fn from(value: Record) -> Self {
        Observable::Record(value)
    }
}

impl From<List> for Observable {
    fn from(value: List) -> Self {
        Observable::List(value)
    }
}
