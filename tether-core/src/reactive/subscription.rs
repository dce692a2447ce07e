//! Subscription Registry
//!
//! A subscription binds a *logical* path to the concrete observable that
//! currently backs it, and records which computations depend on it.
//!
//! # Identity
//!
//! Subscriptions are deduplicated by path: asking for the same path twice
//! returns the same entry. Path-less subscriptions (created by
//! [`Cx::depend`](super::Cx::depend)) are only reachable by ID.
//!
//! # Retargeting
//!
//! When a path is requested again with a different target (the container
//! behind it was replaced), every attached computation is unbound from the
//! old target and bound to the new one. Computations that have not rerun
//! yet keep their logical dependency.
//!
//! # Lifetime
//!
//! A subscription lives while at least one computation is bound to it.
//! When the last one detaches (on rerun, stop or `unsubscribe`) the entry is
//! dropped along with its target handle. Entries created through
//! [`Subscriptions::create`] that were never attached stay until removed.
//!
//! # Pending queue
//!
//! Every `create` also appends the subscription to a pending queue. A read
//! clears the queue, collects, attaches everything queued to the active
//! computation and clears it again.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::observable::{ListEvent, ListenerKey, Observable, Record, RecordEvent};

use super::{Computation, ComputationId, Runtime, SubscriptionId};

/// The concrete observable a subscription is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub observable: Observable,
    /// Attribute to watch on a record. `None` watches the whole container.
    pub sub_key: Option<String>,
}

impl Target {
    /// Target `observable`, optionally narrowed to one record attribute.
    pub fn new(observable: impl Into<Observable>, sub_key: Option<String>) -> Self {
        Self {
            observable: observable.into(),
            sub_key,
        }
    }
}

/// What an adapter gets to see when binding or unbinding.
#[derive(Debug)]
pub struct Binding<'a> {
    pub id: SubscriptionId,
    pub target: &'a Target,
    /// Root record of the owning store.
    pub root: &'a Record,
}

impl Binding<'_> {
    /// Key under which listeners for this binding are registered.
    pub fn listener_key(&self, computation: &Computation) -> ListenerKey {
        ListenerKey::new(computation.id().raw(), self.id.raw())
    }
}

/// Connects a subscription's target to a computation.
///
/// `subscribe` must arrange for the computation to be re-invoked when the
/// target changes; `unsubscribe` undoes exactly that.
pub trait SubscriptionAdapter {
    fn subscribe(&self, binding: &Binding<'_>, computation: &Computation);
    fn unsubscribe(&self, binding: &Binding<'_>, computation: &Computation);
}

/// Listens to the container's native events.
///
/// | target                   | events                          |
/// |--------------------------|---------------------------------|
/// | store root, no key       | none (the root is always live)  |
/// | record with key          | `ChangeKey(key)`                |
/// | record without key       | `Change`                        |
/// | list                     | `Insert`, `Remove`, `Reorder`   |
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAdapter;

impl DefaultAdapter {
    fn is_inert(binding: &Binding<'_>) -> bool {
        binding.target.sub_key.is_none()
            && matches!(&binding.target.observable, Observable::Record(r) if r.ptr_eq(binding.root))
    }
}

impl SubscriptionAdapter for DefaultAdapter {
    fn subscribe(&self, binding: &Binding<'_>, computation: &Computation) {
        if Self::is_inert(binding) {
            return;
        }
        let key = binding.listener_key(computation);
        let rerun = {
            let computation = computation.clone();
            Rc::new(move || computation.invoke())
        };
        match &binding.target.observable {
            Observable::Record(record) => {
                let event = match &binding.target.sub_key {
                    Some(sub_key) => RecordEvent::ChangeKey(sub_key.clone()),
                    None => RecordEvent::Change,
                };
                record.listen(event, key, rerun);
            }
            Observable::List(list) => {
                for event in [ListEvent::Insert, ListEvent::Remove, ListEvent::Reorder] {
                    list.listen(event, key, rerun.clone());
                }
            }
        }
    }

    fn unsubscribe(&self, binding: &Binding<'_>, computation: &Computation) {
        if Self::is_inert(binding) {
            return;
        }
        binding
            .target
            .observable
            .unlisten(binding.listener_key(computation));
    }
}

/// Options for [`Subscriptions::create`].
#[derive(Clone, Default)]
pub struct SubscriptionExt {
    /// Remove the subscription as soon as any attached computation stops
    /// or is about to rerun.
    pub temporary: bool,
    /// Custom binding logic. Defaults to [`DefaultAdapter`].
    pub adapter: Option<Rc<dyn SubscriptionAdapter>>,
}

impl SubscriptionExt {
    /// Options for a subscription that removes itself on the next rerun or stop.
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            adapter: None,
        }
    }

    /// Bind through `adapter` instead of [`DefaultAdapter`].
    pub fn with_adapter(mut self, adapter: impl SubscriptionAdapter + 'static) -> Self {
        self.adapter = Some(Rc::new(adapter));
        self
    }
}

impl fmt::Debug for SubscriptionExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionExt")
            .field("temporary", &self.temporary)
            .field("custom_adapter", &self.adapter.is_some())
            .finish()
    }
}

/// Look a subscription up by path or by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionRef<'a> {
    Path(&'a str),
    Id(SubscriptionId),
}

impl<'a> From<&'a str> for SubscriptionRef<'a> {
    fn from(path: &'a str) -> Self {
        SubscriptionRef::Path(path)
    }
}

impl<'a> From<&'a String> for SubscriptionRef<'a> {
    fn from(path: &'a String) -> Self {
        SubscriptionRef::Path(path)
    }
}

impl From<SubscriptionId> for SubscriptionRef<'_> {
    fn from(id: SubscriptionId) -> Self {
        SubscriptionRef::Id(id)
    }
}

/// Read-only view of a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub path: Option<String>,
    pub target: Target,
    pub contexts: Vec<ComputationId>,
    pub temporary: bool,
}

pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) path: Option<String>,
    pub(crate) target: Target,
    pub(crate) contexts: IndexMap<ComputationId, Computation>,
    pub(crate) adapter: Rc<dyn SubscriptionAdapter>,
    pub(crate) temporary: bool,
}

impl Subscription {
    fn info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            id: self.id,
            path: self.path.clone(),
            target: self.target.clone(),
            contexts: self.contexts.keys().copied().collect(),
            temporary: self.temporary,
        }
    }
}

/// Registry tables. Callers hold a borrow only for bookkeeping, never while
/// an adapter or computation runs.
#[derive(Default)]
pub(crate) struct Registry {
    subscriptions: IndexMap<SubscriptionId, Subscription>,
    by_path: HashMap<String, SubscriptionId>,
    queue: Vec<SubscriptionId>,
}

impl Registry {
    pub(crate) fn resolve(&self, lookup: SubscriptionRef<'_>) -> Option<SubscriptionId> {
        match lookup {
            SubscriptionRef::Path(path) => self.by_path.get(path).copied().or_else(|| {
                // IDs are also accepted in their display form.
                self.subscriptions
                    .keys()
                    .find(|id| id.to_string() == path)
                    .copied()
            }),
            SubscriptionRef::Id(id) => self.subscriptions.contains_key(&id).then_some(id),
        }
    }

    pub(crate) fn get(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SubscriptionId) -> Option<&mut Subscription> {
        self.subscriptions.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, subscription: Subscription) {
        if let Some(path) = &subscription.path {
            self.by_path.insert(path.clone(), subscription.id);
        }
        self.subscriptions.insert(subscription.id, subscription);
    }

    pub(crate) fn take(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let subscription = self.subscriptions.shift_remove(&id)?;
        if let Some(path) = &subscription.path {
            self.by_path.remove(path);
        }
        self.queue.retain(|queued| *queued != id);
        Some(subscription)
    }

    pub(crate) fn enqueue(&mut self, id: SubscriptionId) {
        self.queue.push(id);
    }

    pub(crate) fn drain_queue(&mut self) -> Vec<SubscriptionId> {
        std::mem::take(&mut self.queue)
    }

    pub(crate) fn clear_queue(&mut self) {
        self.queue.clear();
    }
}

/// Low-level registry access, obtained from [`Runtime::subs`].
pub struct Subscriptions<'a> {
    pub(crate) runtime: &'a Runtime,
}

impl Subscriptions<'_> {
    /// Find or create the subscription for `path` and queue it.
    ///
    /// `path: None` always creates a fresh, ID-only subscription. An
    /// existing subscription whose target differs is retargeted, carrying
    /// its computations along.
    pub fn create(&self, path: Option<&str>, target: Target, ext: SubscriptionExt) -> SubscriptionId {
        let runtime = self.runtime;
        let existing = path.and_then(|p| runtime.0.registry.borrow().resolve(SubscriptionRef::Path(p)));

        let id = match existing {
            Some(id) => {
                runtime.retarget(id, target);
                id
            }
            None => {
                let id = SubscriptionId::new();
                tracing::trace!(%id, path = ?path, temporary = ext.temporary, "creating subscription");
                runtime.0.registry.borrow_mut().insert(Subscription {
                    id,
                    path: path.map(str::to_string),
                    target,
                    contexts: IndexMap::new(),
                    adapter: ext.adapter.unwrap_or_else(|| Rc::new(DefaultAdapter)),
                    temporary: ext.temporary,
                });
                id
            }
        };
        runtime.0.registry.borrow_mut().enqueue(id);
        id
    }

    /// Look up a subscription by path, ID, or ID display form.
    pub fn find<'p>(&self, lookup: impl Into<SubscriptionRef<'p>>) -> Option<SubscriptionInfo> {
        let registry = self.runtime.0.registry.borrow();
        let id = registry.resolve(lookup.into())?;
        registry.get(id).map(Subscription::info)
    }

    /// Unbind every attached computation and delete the entry.
    pub fn remove<'p>(&self, lookup: impl Into<SubscriptionRef<'p>>) -> bool {
        let id = self.runtime.0.registry.borrow().resolve(lookup.into());
        match id {
            Some(id) => self.runtime.remove_subscription(id),
            None => false,
        }
    }

    /// Empty the pending queue.
    pub fn clear(&self) {
        self.runtime.0.registry.borrow_mut().clear_queue();
    }

    /// IDs currently queued.
    pub fn pending(&self) -> Vec<SubscriptionId> {
        self.runtime.0.registry.borrow().queue.clone()
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.runtime.0.registry.borrow().subscriptions.len()
    }

    /// Whether no subscriptions are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every subscription, oldest first.
    pub fn all(&self) -> Vec<SubscriptionInfo> {
        self.runtime
            .0
            .registry
            .borrow()
            .subscriptions
            .values()
            .map(Subscription::info)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{List, Value};
    use crate::Runtime;
    use std::cell::Cell;

    #[test]
    fn create_dedups_by_path() {
        let runtime = Runtime::new();
        let record = Record::new();
        let subs = runtime.subs();

        let a = subs.create(Some("m.x"), Target::new(record.clone(), Some("x".into())), SubscriptionExt::default());
        let b = subs.create(Some("m.x"), Target::new(record, Some("x".into())), SubscriptionExt::default());
        assert_eq!(a, b);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs.pending(), vec![a, a]);

        subs.clear();
        assert!(subs.pending().is_empty());
    }

    #[test]
    fn path_less_subscriptions_are_distinct() {
        let runtime = Runtime::new();
        let list = List::new();
        let subs = runtime.subs();

        let a = subs.create(None, Target::new(list.clone(), None), SubscriptionExt::temporary());
        let b = subs.create(None, Target::new(list, None), SubscriptionExt::temporary());
        assert_ne!(a, b);
        assert!(subs.find(a).unwrap().temporary);
        assert_eq!(subs.find(a.to_string().as_str()).map(|info| info.id), Some(a));
    }

    #[test]
    fn find_and_remove() {
        let runtime = Runtime::new();
        let subs = runtime.subs();
        let id = subs.create(
            Some("a"),
            Target::new(runtime.root().clone(), Some("a".into())),
            SubscriptionExt::default(),
        );

        let info = subs.find("a").unwrap();
        assert_eq!(info.id, id);
        assert_eq!(info.path.as_deref(), Some("a"));

        assert!(subs.remove("a"));
        assert!(subs.find("a").is_none());
        assert!(subs.find(id).is_none());
        assert!(subs.pending().is_empty());
        assert!(!subs.remove(id));
    }

    #[test]
    fn root_without_key_binds_nothing() {
        let runtime = Runtime::new();
        let subs = runtime.subs();
        let id = subs.create(Some(""), Target::new(runtime.root().clone(), None), SubscriptionExt::default());

        let computation = runtime.reactive(|_| {}, Default::default());
        computation.subscribe(id);
        assert_eq!(runtime.root().listener_count(), 0);
        assert_eq!(subs.find(id).unwrap().contexts, vec![computation.id()]);
    }

    struct Counting(Rc<Cell<i32>>);

    impl SubscriptionAdapter for Counting {
        fn subscribe(&self, _: &Binding<'_>, _: &Computation) {
            self.0.set(self.0.get() + 1);
        }

        fn unsubscribe(&self, _: &Binding<'_>, _: &Computation) {
            self.0.set(self.0.get() - 1);
        }
    }

    #[test]
    fn custom_adapter_is_used() {
        let runtime = Runtime::new();
        let bound = Rc::new(Cell::new(0));
        let id = runtime.subs().create(
            Some("custom"),
            Target::new(Record::new(), None),
            SubscriptionExt::default().with_adapter(Counting(Rc::clone(&bound))),
        );

        let computation = runtime.reactive(|_| {}, Default::default());
        computation.subscribe(id);
        computation.subscribe(id);
        assert_eq!(bound.get(), 1);

        computation.unsubscribe(id);
        computation.unsubscribe(id);
        assert_eq!(bound.get(), 0);
    }

    #[test]
    fn retarget_moves_listeners() {
        let runtime = Runtime::new();
        let old = Record::new();
        let new = Record::new();
        let subs = runtime.subs();

        let id = subs.create(Some("m.x"), Target::new(old.clone(), Some("x".into())), SubscriptionExt::default());
        let computation = runtime.reactive(|_| {}, Default::default());
        computation.subscribe(id);
        assert_eq!(old.listener_count(), 1);

        subs.create(Some("m.x"), Target::new(new.clone(), Some("x".into())), SubscriptionExt::default());
        assert_eq!(old.listener_count(), 0);
        assert_eq!(new.listener_count(), 1);
        assert_eq!(subs.find(id).unwrap().contexts, vec![computation.id()]);

        new.set("x", Value::from(1));
        assert_eq!(computation.run_count(), 1);
    }
}
