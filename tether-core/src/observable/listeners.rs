//! Listener table shared by records and lists.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

/// Identifies who registered a listener.
///
/// `owner` groups listeners for delivery: a single emission calls each owner
/// at most once. `tag` distinguishes several listeners of the same owner so
/// they can be removed individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub owner: u64,
    pub tag: u64,
}

impl ListenerKey {
    /// Create a key for `owner` with a distinguishing `tag`.
    pub fn new(owner: u64, tag: u64) -> Self {
        Self { owner, tag }
    }
}

/// Callback invoked when a matching event is emitted.
pub type Callback = Rc<dyn Fn()>;

struct Entry<E> {
    id: u64,
    key: ListenerKey,
    event: E,
    callback: Callback,
}

pub(crate) struct Listeners<E> {
    next_id: u64,
    entries: Vec<Entry<E>>,
}

impl<E: PartialEq> Listeners<E> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, event: E, key: ListenerKey, callback: Callback) {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            key,
            event,
            callback,
        });
    }

    /// Remove every listener registered under `key`. Returns how many went.
    pub(crate) fn remove(&mut self, key: ListenerKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != key);
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Listeners for `events`, in emission order, one per owner.
    fn matching(&self, events: &[E]) -> SmallVec<[(u64, Callback); 4]> {
        let mut owners: SmallVec<[u64; 4]> = SmallVec::new();
        let mut out = SmallVec::new();
        for event in events {
            for entry in self.entries.iter().filter(|entry| entry.event == *event) {
                if owners.contains(&entry.key.owner) {
                    continue;
                }
                owners.push(entry.key.owner);
                out.push((entry.id, Rc::clone(&entry.callback)));
            }
        }
        out
    }
}

/// Deliver `events` to the listeners in `table`.
///
/// No borrow is held while a callback runs. A listener removed by an earlier
/// callback of the same emission is skipped.
pub(crate) fn dispatch<E: PartialEq>(table: &RefCell<Listeners<E>>, events: &[E]) {
    let targets = table.borrow().matching(events);
    if targets.is_empty() {
        return;
    }
    tracing::trace!(listeners = targets.len(), "dispatching change notification");
    for (id, callback) in targets {
        if !table.borrow().contains(id) {
            continue;
        }
        callback();
    }
}
