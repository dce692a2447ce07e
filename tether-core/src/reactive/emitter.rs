//! Lifecycle events of a computation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;

use super::Computation;

/// Points in a computation's lifecycle that handlers can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputationEvent {
    /// Linked to a new parent.
    Start,
    /// About to run the body. Children and temporary dependencies from the
    /// previous run are released here.
    RunBefore,
    /// The body returned; the computation is still marked running.
    Run,
    /// The run is over.
    RunAfter,
    /// Stopped: all subscriptions and parent links are gone.
    Stop,
}

/// Handle for removing a handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Rc<dyn Fn(&Computation)>;

struct Entry {
    id: HandlerId,
    events: SmallVec<[ComputationEvent; 2]>,
    once: bool,
    handler: Handler,
}

/// Event emitter owned by a computation.
pub(crate) struct Emitter {
    next_id: Cell<u64>,
    entries: RefCell<Vec<Entry>>,
}

impl Emitter {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register `handler` for any of `events`.
    ///
    /// A `once` handler is removed the first time any of its events fires.
    pub(crate) fn on(&self, events: &[ComputationEvent], once: bool, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push(Entry {
            id,
            events: events.iter().copied().collect(),
            once,
            handler,
        });
        id
    }

    pub(crate) fn off(&self, id: HandlerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Call every handler registered for `event`.
    ///
    /// Handlers run without any borrow held and may register or remove
    /// handlers. A handler removed by an earlier one is not called.
    pub(crate) fn emit(&self, event: ComputationEvent, computation: &Computation) {
        let ids: SmallVec<[HandlerId; 4]> = self
            .entries
            .borrow()
            .iter()
            .filter(|entry| entry.events.contains(&event))
            .map(|entry| entry.id)
            .collect();

        for id in ids {
            let handler = {
                let mut entries = self.entries.borrow_mut();
                let Some(index) = entries.iter().position(|entry| entry.id == id) else {
                    continue;
                };
                if entries[index].once {
                    entries.remove(index).handler
                } else {
                    Rc::clone(&entries[index].handler)
                }
            };
            handler(computation);
        }
    }
}
