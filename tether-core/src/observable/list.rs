//! Observable list: an ordered sequence with structural change events.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::listeners::{dispatch, Callback, ListenerKey, Listeners};
use super::Value;

/// Structural events emitted by a [`List`].
///
/// Events carry no position: lists notify at whole-collection granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    Insert,
    Remove,
    Reorder,
}

struct ListInner {
    items: RefCell<Vec<Value>>,
    listeners: RefCell<Listeners<ListEvent>>,
}

/// A shared ordered collection that notifies listeners on structural change.
///
/// Like [`Record`](super::Record), cloning shares the list and equality is
/// identity.
#[derive(Clone)]
pub struct List(Rc<ListInner>);

impl List {
    /// Create an empty list with no listeners.
    pub fn new() -> Self {
        Self(Rc::new(ListInner {
            items: RefCell::new(Vec::new()),
            listeners: RefCell::new(Listeners::new()),
        }))
    }

    /// Item at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.borrow().get(index).cloned()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    /// Whether the list has no items.
    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    /// Copy of all items.
    pub fn items(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Append an item and emit `Insert`.
    pub fn push(&self, value: impl Into<Value>) {
        self.0.items.borrow_mut().push(value.into());
        dispatch(&self.0.listeners, &[ListEvent::Insert]);
    }

    /// Insert at `index`. Returns false if `index` is past the end.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> bool {
        {
            let mut items = self.0.items.borrow_mut();
            if index > items.len() {
                return false;
            }
            items.insert(index, value.into());
        }
        dispatch(&self.0.listeners, &[ListEvent::Insert]);
        true
    }

    /// Remove the item at `index` and emit `Remove`. Returns `None` if out
    /// of range.
    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        dispatch(&self.0.listeners, &[ListEvent::Remove]);
        Some(removed)
    }

    /// Replace the item at `index`, or append when `index == len()`.
    ///
    /// A replacement is reported as a remove followed by an insert in one
    /// emission. Returns false if `index` is out of range or the item is
    /// unchanged.
    pub fn replace(&self, index: usize, value: impl Into<Value>) -> bool {
        let value = value.into();
        let events: &[ListEvent] = {
            let mut items = self.0.items.borrow_mut();
            if index == items.len() {
                items.push(value);
                &[ListEvent::Insert]
            } else if index < items.len() {
                if items[index] == value {
                    return false;
                }
                items[index] = value;
                &[ListEvent::Remove, ListEvent::Insert]
            } else {
                return false;
            }
        };
        dispatch(&self.0.listeners, events);
        true
    }

    /// Swap two items and emit `Reorder`. Returns false if either index is
    /// out of range; swapping an item with itself emits nothing.
    pub fn swap(&self, a: usize, b: usize) -> bool {
        {
            let mut items = self.0.items.borrow_mut();
            if a >= items.len() || b >= items.len() {
                return false;
            }
            if a == b {
                return true;
            }
            items.swap(a, b);
        }
        dispatch(&self.0.listeners, &[ListEvent::Reorder]);
        true
    }

    /// Sort with `compare` and emit `Reorder`.
    ///
    /// The comparator may read the list; it sees the order from before the
    /// sort.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let mut sorted = self.items();
        sorted.sort_by(compare);
        *self.0.items.borrow_mut() = sorted;
        dispatch(&self.0.listeners, &[ListEvent::Reorder]);
    }

    /// Whether two handles point at the same list.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Register `callback` for `event` under `key`.
    pub fn listen(&self, event: ListEvent, key: ListenerKey, callback: Callback) {
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

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<V: Into<Value>> FromIterator<V> for List {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let list = List::new();
        list.0
            .items
            .borrow_mut()
            .extend(iter.into_iter().map(Into::into));
        list
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("items", &*self.0.items.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
