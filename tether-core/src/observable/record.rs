//! Observable record: a keyed set of attributes with per-key change events.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::listeners::{dispatch, Callback, ListenerKey, Listeners};
use super::Value;

/// Events emitted by a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    /// Any attribute changed.
    Change,
    /// The named attribute changed.
    ChangeKey(String),
}

struct RecordInner {
    attrs: RefCell<IndexMap<String, Value>>,
    listeners: RefCell<Listeners<RecordEvent>>,
}

/// A shared mutable object that notifies listeners when an attribute changes.
///
/// Cloning a `Record` clones the handle; both clones see the same
/// attributes. Equality is identity.
///
/// # Example
///
/// ```rust
/// use tether_core::{Record, Value};
///
/// let record = Record::new();
/// record.set("greeting", "hello");
/// assert_eq!(record.get("greeting"), Some(Value::from("hello")));
/// ```
#[derive(Clone)]
pub struct Record(Rc<RecordInner>);

impl Record {
    /// Create an empty record with no listeners.
    pub fn new() -> Self {
        Self(Rc::new(RecordInner {
            attrs: RefCell::new(IndexMap::new()),
            listeners: RefCell::new(Listeners::new()),
        }))
    }

    /// Current value of an attribute.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.attrs.borrow().get(key).cloned()
    }

    /// Replace an attribute.
    ///
    /// Emits `ChangeKey(key)` then `Change` when the value actually differs
    /// from the current one. Returns whether anything changed.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        {
            let mut attrs = self.0.attrs.borrow_mut();
            if attrs.get(&key) == Some(&value) {
                return false;
            }
            attrs.insert(key.clone(), value);
        }
        dispatch(
            &self.0.listeners,
            &[RecordEvent::ChangeKey(key), RecordEvent::Change],
        );
        true
    }

    /// Whether the attribute is present, even if null.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.attrs.borrow().contains_key(key)
    }

    /// Attribute names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.attrs.borrow().keys().cloned().collect()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.attrs.borrow().len()
    }

    /// Whether the record has no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.attrs.borrow().is_empty()
    }

    /// Copy of all attributes.
    pub fn attrs(&self) -> IndexMap<String, Value> {
        self.0.attrs.borrow().clone()
    }

    /// Whether two handles point at the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Register `callback` for `event` under `key`.
    pub fn listen(&self, event: RecordEvent, key: ListenerKey, callback: Callback) {
        self.0.listeners.borrow_mut().add(event, key, callback);
    }

    /// Remove every listener registered under `key`.
    pub fn unlisten(&self, key: ListenerKey) -> usize {
        self.0.listeners.borrow_mut().remove(key)
    }

    /// Number of registered listeners, across all events.
    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let record = Record::new();
        {
            let mut attrs = record.0.attrs.borrow_mut();
            for (key, value) in iter {
                attrs.insert(key.into(), value.into());
            }
        }
        record
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("attrs", &*self.0.attrs.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
