//! Reactive Runtime
//!
//! The runtime is the central coordinator: it owns the store and the
//! subscription registry and exposes the read/write/run surface.
//!
//! # How It Works
//!
//! 1. A computation body reads through its [`Cx`]. The read resolves the
//!    path, retrieves the value, then runs the dependency collector over
//!    the same path. Every subscription it queues is attached to the
//!    computation and the queue is cleared.
//!
//! 2. Attaching binds the subscription's target through its adapter; the
//!    default adapter registers a listener on the record or list.
//!
//! 3. A write updates the store; the container emits its event and the
//!    listener re-invokes the computation, synchronously, before the write
//!    returns.
//!
//! # Threading
//!
//! Everything is single-threaded: handles are `Rc` based and not `Send`.
//! No `RefCell` borrow is held while user code runs, so bodies, listeners
//! and adapters may freely read, write and start computations.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::observable::{Record, Value};
use crate::store::{parse_path, Store};

use super::collector;
use super::computation::{Computation, RunOptions};
use super::emitter::ComputationEvent;
use super::subscription::{Binding, Registry, Subscriptions, Target};
use super::{Cx, SubscriptionId};

/// Options for a read.
#[derive(Debug, Clone, PartialEq)]
pub struct GetOptions {
    /// Returned when the value is missing or null.
    pub default: Option<Value>,
    /// Track the read for the active computation. Defaults to true.
    pub reactive: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            default: None,
            reactive: true,
        }
    }
}

impl GetOptions {
    /// Value returned in place of a missing or null one.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Read without creating a dependency.
    pub fn untracked(mut self) -> Self {
        self.reactive = false;
        self
    }
}

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) store: Store,
    pub(crate) registry: RefCell<Registry>,
}

/// Owner of a store and its reactive bookkeeping.
///
/// Cloning shares the runtime.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use tether_core::{Runtime, Value};
///
/// let runtime = Runtime::new();
/// runtime.set("user.name", "ada").unwrap();
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = Rc::clone(&seen);
/// runtime.run(move |cx| {
///     log.borrow_mut().push(cx.get("user.name").unwrap());
/// });
///
/// runtime.set("user.name", "grace").unwrap();
/// assert_eq!(
///     *seen.borrow(),
///     vec![Some(Value::from("ada")), Some(Value::from("grace"))]
/// );
/// ```
#[derive(Clone)]
pub struct Runtime(pub(crate) Rc<RuntimeInner>);

impl Runtime {
    /// Create a runtime with an empty root record and default path syntax.
    pub fn new() -> Self {
        Self::build(RuntimeConfig::default(), Store::new())
    }

    /// Create a runtime with a validated configuration.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Store::new()))
    }

    /// Create a runtime over an existing root record.
    pub fn with_root(root: Record) -> Self {
        Self::build(RuntimeConfig::default(), Store::with_root(root))
    }

    fn build(config: RuntimeConfig, store: Store) -> Self {
        Self(Rc::new(RuntimeInner {
            config,
            store,
            registry: RefCell::new(Registry::default()),
        }))
    }

    /// Get the runtime's configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.0.config
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Store {
        &self.0.store
    }

    /// Get the store's root record.
    pub fn root(&self) -> &Record {
        self.0.store.root()
    }

    /// Untracked, root-absolute read.
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        self.read(None, path, GetOptions::default())
    }

    /// Untracked read falling back to `default` when missing or null.
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Result<Value> {
        let value = self.read(None, path, GetOptions::default().with_default(default))?;
        Ok(value.unwrap_or_default())
    }

    /// Untracked read with explicit options.
    pub fn get_with(&self, path: &str, options: GetOptions) -> Result<Option<Value>> {
        self.read(None, path, options)
    }

    /// Root-absolute write.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = parse_path(path, "", &self.0.config.syntax)?;
        self.0.store.update(&segments, value.into());
        Ok(())
    }

    /// Create a computation without running it.
    pub fn reactive<F>(&self, body: F, options: RunOptions) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        Computation::new(self, body, options)
    }

    /// Create a root computation and run it now.
    pub fn run<F>(&self, body: F) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        self.run_with(body, RunOptions::default())
    }

    /// Like [`Runtime::run`], with reads relative to `path`.
    pub fn run_at<F>(&self, path: impl Into<String>, body: F) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        self.run_with(body, RunOptions::at(path))
    }

    /// Create a root computation with `options` and run it now.
    pub fn run_with<F>(&self, body: F, options: RunOptions) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        let computation = self.reactive(body, options);
        computation.invoke();
        computation
    }

    /// Low-level registry access.
    pub fn subs(&self) -> Subscriptions<'_> {
        Subscriptions { runtime: self }
    }

    /// Plain JSON copy of the store.
    pub fn snapshot(&self) -> serde_json::Value {
        self.0.store.snapshot()
    }

    pub(crate) fn read(
        &self,
        active: Option<&Computation>,
        path: &str,
        options: GetOptions,
    ) -> Result<Option<Value>> {
        let base = active.and_then(Computation::base_path).unwrap_or("");
        let segments = parse_path(path, base, &self.0.config.syntax)?;
        let value = self.0.store.retrieve(&segments);

        if let Some(computation) = active.filter(|_| options.reactive) {
            let subs = self.subs();
            subs.clear();
            collector::process(self, &segments);
            let pending = self.0.registry.borrow_mut().drain_queue();
            for id in pending {
                computation.subscribe(id);
            }
            subs.clear();
        }

        Ok(match value {
            Some(value) if !value.is_null() => Some(value),
            value => options.default.or(value),
        })
    }

    /// Bind `computation` to a subscription. Returns false if it already
    /// was, or if the subscription does not exist.
    pub(crate) fn attach(&self, id: SubscriptionId, computation: &Computation) -> bool {
        if computation.holds(id) {
            return false;
        }
        let found = self
            .0
            .registry
            .borrow()
            .get(id)
            .map(|sub| (sub.target.clone(), Rc::clone(&sub.adapter), sub.temporary));
        let Some((target, adapter, temporary)) = found else {
            return false;
        };

        adapter.subscribe(&self.binding(id, &target), computation);
        if let Some(sub) = self.0.registry.borrow_mut().get_mut(id) {
            sub.contexts.insert(computation.id(), computation.clone());
        }
        computation.record_subscription(id);
        tracing::trace!(subscription = %id, computation = %computation.id(), "attached");

        if temporary {
            let runtime = Rc::downgrade(&self.0);
            computation.once(
                &[ComputationEvent::Stop, ComputationEvent::RunBefore],
                move |_: &Computation| {
                    if let Some(inner) = runtime.upgrade() {
                        Runtime(inner).remove_subscription(id);
                    }
                },
            );
        }
        true
    }

    /// Unbind `computation` from a subscription. Returns false if it was
    /// not bound. The subscription is dropped once nothing is bound to it.
    pub(crate) fn detach(&self, id: SubscriptionId, computation: &Computation) -> bool {
        if !computation.forget_subscription(id) {
            return false;
        }
        let found = self
            .0
            .registry
            .borrow()
            .get(id)
            .map(|sub| (sub.target.clone(), Rc::clone(&sub.adapter)));
        if let Some((target, adapter)) = found {
            adapter.unsubscribe(&self.binding(id, &target), computation);
            let unused = {
                let mut registry = self.0.registry.borrow_mut();
                let emptied = registry.get_mut(id).is_some_and(|sub| {
                    sub.contexts.shift_remove(&computation.id());
                    sub.contexts.is_empty()
                });
                if emptied {
                    registry.take(id)
                } else {
                    None
                }
            };
            if unused.is_some() {
                tracing::trace!(subscription = %id, "dropped unused subscription");
            }
        }
        tracing::trace!(subscription = %id, computation = %computation.id(), "detached");
        true
    }

    pub(crate) fn remove_subscription(&self, id: SubscriptionId) -> bool {
        let Some(sub) = self.0.registry.borrow_mut().take(id) else {
            return false;
        };
        tracing::trace!(subscription = %id, contexts = sub.contexts.len(), "removing subscription");
        let binding = self.binding(id, &sub.target);
        for computation in sub.contexts.values() {
            sub.adapter.unsubscribe(&binding, computation);
            computation.forget_subscription(id);
        }
        true
    }

    /// Point an existing subscription at `target`, moving every attached
    /// computation along. No-op if the target is unchanged.
    pub(crate) fn retarget(&self, id: SubscriptionId, target: Target) {
        let found = {
            let registry = self.0.registry.borrow();
            registry.get(id).and_then(|sub| {
                (sub.target != target).then(|| {
                    (
                        sub.target.clone(),
                        Rc::clone(&sub.adapter),
                        sub.contexts.values().cloned().collect::<Vec<_>>(),
                    )
                })
            })
        };
        let Some((old, adapter, contexts)) = found else {
            return;
        };

        tracing::debug!(subscription = %id, computations = contexts.len(), "retargeting subscription");
        let old_binding = self.binding(id, &old);
        for computation in &contexts {
            adapter.unsubscribe(&old_binding, computation);
        }
        if let Some(sub) = self.0.registry.borrow_mut().get_mut(id) {
            sub.target = target.clone();
        }
        let new_binding = self.binding(id, &target);
        for computation in &contexts {
            adapter.subscribe(&new_binding, computation);
        }
    }

    fn binding<'a>(&'a self, id: SubscriptionId, target: &'a Target) -> Binding<'a> {
        Binding {
            id,
            target,
            root: self.root(),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.0.config)
            .field("subscriptions", &self.subs().len())
            .finish()
    }
}
