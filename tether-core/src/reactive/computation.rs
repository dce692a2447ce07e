//! Computation Implementation
//!
//! A computation wraps a body function and re-invokes it whenever a value
//! it read changes.
//!
//! # Lifecycle
//!
//! Each invocation goes idle → running → idle:
//!
//! 1. A computation that is already running ignores the call.
//! 2. With a parent (invoked from another computation's body) it links to
//!    that parent once and emits `Start`. The link is dropped the next time
//!    the parent stops or is about to rerun; a computation left without
//!    parents that is not a root is stopped.
//! 3. Without a parent it becomes a root, which is never stopped by losing
//!    parents.
//! 4. `RunBefore` is emitted, then the dependencies of the previous run are
//!    released.
//! 5. The body runs with a [`Cx`] for this computation, collecting fresh
//!    dependencies; `Run` and `RunAfter` are emitted around clearing the
//!    running flag.
//!
//! `stop` releases every subscription and parent link and emits `Stop`. A
//! stopped computation can be invoked again and starts over.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::emitter::{ComputationEvent, Emitter, HandlerId};
use super::runtime::RuntimeInner;
use super::subscription::SubscriptionRef;
use super::{ComputationId, Cx, Runtime, SubscriptionId};

/// Options for creating a computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Base path that relative reads inside the body resolve against.
    pub path: Option<String>,
}

impl RunOptions {
    /// Options with reads relative to `path`.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

type Body = Box<dyn Fn(&Cx<'_>)>;

struct ParentLink {
    parent: Weak<ComputationInner>,
    handler: HandlerId,
}

#[derive(Default)]
struct State {
    parents: IndexMap<ComputationId, ParentLink>,
    subscriptions: IndexSet<SubscriptionId>,
    running: bool,
    root: bool,
    stopped: bool,
    run_count: usize,
}

pub(crate) struct ComputationInner {
    id: ComputationId,
    base_path: Option<String>,
    body: Body,
    runtime: Weak<RuntimeInner>,
    state: RefCell<State>,
    emitter: Emitter,
}

/// A re-invocable unit of reactive work.
///
/// Cloning shares the computation.
///
/// # Example
///
/// ```rust
/// use tether_core::Runtime;
///
/// let runtime = Runtime::new();
/// runtime.set("count", 1).unwrap();
///
/// let computation = runtime.run(|cx| {
///     let _ = cx.get("count").unwrap();
/// });
/// assert_eq!(computation.run_count(), 1);
///
/// runtime.set("count", 2).unwrap();
/// assert_eq!(computation.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Computation(Rc<ComputationInner>);

/// Clears the running flag even if the body panics.
struct RunGuard<'a>(&'a Computation);

impl<'a> RunGuard<'a> {
    fn enter(computation: &'a Computation) -> Self {
        computation.0.state.borrow_mut().running = true;
        Self(computation)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0 .0.state.borrow_mut().running = false;
    }
}

impl Computation {
    pub(crate) fn new<F>(runtime: &Runtime, body: F, options: RunOptions) -> Self
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        Self(Rc::new(ComputationInner {
            id: ComputationId::new(),
            base_path: options.path,
            body: Box::new(body),
            runtime: Rc::downgrade(&runtime.0),
            state: RefCell::new(State::default()),
            emitter: Emitter::new(),
        }))
    }

    /// Get the computation's unique ID.
    pub fn id(&self) -> ComputationId {
        self.0.id
    }

    /// Base path for relative reads, if any.
    pub fn base_path(&self) -> Option<&str> {
        self.0.base_path.as_deref()
    }

    /// Whether the body is executing right now.
    pub fn is_running(&self) -> bool {
        self.0.state.borrow().running
    }

    /// Whether the last invocation came from outside any computation.
    pub fn is_root(&self) -> bool {
        self.0.state.borrow().root
    }

    /// Stopped and not invoked since.
    pub fn is_stopped(&self) -> bool {
        self.0.state.borrow().stopped
    }

    /// Number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.0.state.borrow().run_count
    }

    /// IDs of the computations this one is currently linked to.
    pub fn parents(&self) -> Vec<ComputationId> {
        self.0.state.borrow().parents.keys().copied().collect()
    }

    /// IDs of the subscriptions held from the latest run.
    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.0.state.borrow().subscriptions.iter().copied().collect()
    }

    /// Whether two handles point at the same computation.
    pub fn ptr_eq(&self, other: &Computation) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Run as a root, outside any other computation.
    pub fn invoke(&self) {
        self.call(None);
    }

    pub(crate) fn call(&self, parent: Option<&Computation>) {
        if self.is_running() {
            tracing::debug!(computation = %self.id(), "already running, skipping invocation");
            return;
        }
        let Some(inner) = self.0.runtime.upgrade() else {
            tracing::debug!(computation = %self.id(), "runtime dropped, skipping invocation");
            return;
        };
        let runtime = Runtime(inner);

        match parent {
            Some(parent) => self.link(parent),
            None => self.0.state.borrow_mut().root = true,
        }
        self.0.state.borrow_mut().stopped = false;

        tracing::debug!(
            computation = %self.id(),
            parent = ?parent.map(Computation::id),
            "running computation"
        );
        self.emit(ComputationEvent::RunBefore);
        self.release(&runtime);

        let guard = RunGuard::enter(self);
        self.0.state.borrow_mut().run_count += 1;
        (self.0.body)(&Cx::new(&runtime, self));
        self.emit(ComputationEvent::Run);
        drop(guard);
        self.emit(ComputationEvent::RunAfter);
    }

    fn link(&self, parent: &Computation) {
        let parent_id = parent.id();
        if self.0.state.borrow().parents.contains_key(&parent_id) {
            return;
        }
        let child = self.clone();
        let handler = parent.0.emitter.on(
            &[ComputationEvent::Stop, ComputationEvent::RunBefore],
            true,
            Rc::new(move |_: &Computation| child.unlink(parent_id)),
        );
        self.0.state.borrow_mut().parents.insert(
            parent_id,
            ParentLink {
                parent: Rc::downgrade(&parent.0),
                handler,
            },
        );
        tracing::trace!(computation = %self.id(), parent = %parent_id, "linked to parent");
        self.emit(ComputationEvent::Start);
    }

    fn unlink(&self, parent_id: ComputationId) {
        let orphaned = {
            let mut state = self.0.state.borrow_mut();
            if state.parents.shift_remove(&parent_id).is_none() {
                return;
            }
            state.parents.is_empty() && !state.root
        };
        if orphaned {
            tracing::debug!(computation = %self.id(), parent = %parent_id, "orphaned, stopping");
            self.stop();
        }
    }

    /// Attach to a subscription. Does nothing if already attached.
    pub fn subscribe(&self, id: SubscriptionId) -> bool {
        match self.0.runtime.upgrade() {
            Some(inner) => Runtime(inner).attach(id, self),
            None => false,
        }
    }

    /// Detach from a subscription, by ID or path. Does nothing if not
    /// attached.
    pub fn unsubscribe<'p>(&self, lookup: impl Into<SubscriptionRef<'p>>) -> bool {
        let Some(inner) = self.0.runtime.upgrade() else {
            return false;
        };
        let runtime = Runtime(inner);
        let id = runtime.0.registry.borrow().resolve(lookup.into());
        match id {
            Some(id) => runtime.detach(id, self),
            None => false,
        }
    }

    /// Release every subscription and parent link, then emit `Stop`.
    pub fn stop(&self) {
        if let Some(inner) = self.0.runtime.upgrade() {
            self.release(&Runtime(inner));
        } else {
            self.0.state.borrow_mut().subscriptions.clear();
        }

        let links: Vec<ParentLink> = {
            let mut state = self.0.state.borrow_mut();
            state.root = false;
            state.stopped = true;
            state.parents.drain(..).map(|(_, link)| link).collect()
        };
        for link in links {
            if let Some(parent) = link.parent.upgrade() {
                parent.emitter.off(link.handler);
            }
        }

        tracing::debug!(computation = %self.id(), "stopped");
        self.emit(ComputationEvent::Stop);
    }

    /// Register a lifecycle handler.
    pub fn on<F>(&self, event: ComputationEvent, handler: F) -> HandlerId
    where
        F: Fn(&Computation) + 'static,
    {
        self.0.emitter.on(&[event], false, Rc::new(handler))
    }

    /// Register a handler that fires once, on the first of `events`.
    pub fn once<F>(&self, events: &[ComputationEvent], handler: F) -> HandlerId
    where
        F: Fn(&Computation) + 'static,
    {
        self.0.emitter.on(events, true, Rc::new(handler))
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn off(&self, handler: HandlerId) -> bool {
        self.0.emitter.off(handler)
    }

    #[cfg(test)]
    pub(crate) fn handler_count(&self) -> usize {
        self.0.emitter.len()
    }

    pub(crate) fn holds(&self, id: SubscriptionId) -> bool {
        self.0.state.borrow().subscriptions.contains(&id)
    }

    pub(crate) fn record_subscription(&self, id: SubscriptionId) {
        self.0.state.borrow_mut().subscriptions.insert(id);
    }

    pub(crate) fn forget_subscription(&self, id: SubscriptionId) -> bool {
        self.0.state.borrow_mut().subscriptions.shift_remove(&id)
    }

    fn release(&self, runtime: &Runtime) {
        for id in self.subscriptions() {
            runtime.detach(id, self);
        }
    }

    fn emit(&self, event: ComputationEvent) {
        self.0.emitter.emit(event, self);
    }
}

impl PartialEq for Computation {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("Computation")
            .field("id", &self.0.id)
            .field("base_path", &self.0.base_path)
            .field("parents", &state.parents.keys().collect::<Vec<_>>())
            .field("subscriptions", &state.subscriptions)
            .field("running", &state.running)
            .field("root", &state.root)
            .field("run_count", &state.run_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn reactive_does_not_run_until_invoked() {
        let runtime = Runtime::new();
        let computation = runtime.reactive(|_| {}, RunOptions::default());
        assert_eq!(computation.run_count(), 0);
        assert!(!computation.is_root());

        computation.invoke();
        assert_eq!(computation.run_count(), 1);
        assert!(computation.is_root());
        assert!(!computation.is_running());
    }

    #[test]
    fn running_flag_is_visible_inside_body() {
        let runtime = Runtime::new();
        let seen = Rc::new(Cell::new(false));
        let seen_clone = Rc::clone(&seen);
        runtime.run(move |cx| seen_clone.set(cx.computation().is_running()));
        assert!(seen.get());
    }

    #[test]
    fn lifecycle_events_in_order() {
        let runtime = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let computation = runtime.reactive(
            {
                let log = Rc::clone(&log);
                move |_| log.borrow_mut().push("body")
            },
            RunOptions::default(),
        );
        for (event, name) in [
            (ComputationEvent::RunBefore, "run:before"),
            (ComputationEvent::Run, "run"),
            (ComputationEvent::RunAfter, "run:after"),
            (ComputationEvent::Stop, "stop"),
        ] {
            let log = Rc::clone(&log);
            computation.on(event, move |_| log.borrow_mut().push(name));
        }

        computation.invoke();
        computation.stop();
        assert_eq!(
            *log.borrow(),
            vec!["run:before", "body", "run", "run:after", "stop"]
        );
    }

    #[test]
    fn nested_computation_links_to_parent() {
        let runtime = Runtime::new();
        let child = runtime.reactive(|_| {}, RunOptions::default());
        let started = Rc::new(Cell::new(0));
        {
            let started = Rc::clone(&started);
            child.on(ComputationEvent::Start, move |_| started.set(started.get() + 1));
        }

        let parent = runtime.run({
            let child = child.clone();
            move |cx| cx.invoke(&child)
        });

        assert_eq!(child.parents(), vec![parent.id()]);
        assert!(!child.is_root());
        assert_eq!(started.get(), 1);
        // One pending unlink handler on the parent.
        assert_eq!(parent.handler_count(), 1);
    }

    #[test]
    fn parent_rerun_relinks_child_without_leaking_handlers() {
        let runtime = Runtime::new();
        let child = runtime.reactive(|_| {}, RunOptions::default());
        let parent = runtime.run({
            let child = child.clone();
            move |cx| cx.invoke(&child)
        });

        for _ in 0..5 {
            parent.invoke();
        }
        assert_eq!(parent.handler_count(), 1);
        assert_eq!(child.run_count(), 6);
        assert!(!child.is_stopped());
    }

    #[test]
    fn stop_cascades_to_orphans_only() {
        let runtime = Runtime::new();
        let orphan = runtime.reactive(|_| {}, RunOptions::default());
        let shared = runtime.reactive(|_| {}, RunOptions::default());
        let rooted = runtime.reactive(|_| {}, RunOptions::default());
        rooted.invoke();

        let first = runtime.run({
            let (orphan, shared, rooted) = (orphan.clone(), shared.clone(), rooted.clone());
            move |cx| {
                cx.invoke(&orphan);
                cx.invoke(&shared);
                cx.invoke(&rooted);
            }
        });
        let _second = runtime.run({
            let shared = shared.clone();
            move |cx| cx.invoke(&shared)
        });

        first.stop();
        assert!(first.is_stopped());
        assert!(orphan.is_stopped());
        assert!(!shared.is_stopped());
        assert!(!rooted.is_stopped());
    }

    #[test]
    fn reentrant_invocation_is_ignored() {
        let runtime = Runtime::new();
        let computation = runtime.run(|cx| {
            let me = cx.computation().clone();
            me.invoke();
            cx.invoke(&me);
        });
        assert_eq!(computation.run_count(), 1);
    }

    #[test]
    fn stopped_computation_can_restart() {
        let runtime = Runtime::new();
        let computation = runtime.run(|_| {});
        computation.stop();
        assert!(computation.is_stopped());
        assert!(!computation.is_root());

        computation.invoke();
        assert!(!computation.is_stopped());
        assert!(computation.is_root());
        assert_eq!(computation.run_count(), 2);
    }

    #[test]
    fn once_handler_fires_once() {
        let runtime = Runtime::new();
        let computation = runtime.reactive(|_| {}, RunOptions::default());
        let fired = Rc::new(Cell::new(0));
        {
            let fired = Rc::clone(&fired);
            computation.once(
                &[ComputationEvent::Stop, ComputationEvent::RunBefore],
                move |_| fired.set(fired.get() + 1),
            );
        }
        computation.invoke();
        computation.stop();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn off_removes_handler() {
        let runtime = Runtime::new();
        let computation = runtime.reactive(|_| {}, RunOptions::default());
        let fired = Rc::new(Cell::new(0));
        let handler = {
            let fired = Rc::clone(&fired);
            computation.on(ComputationEvent::Run, move |_| fired.set(fired.get() + 1))
        };
        assert!(computation.off(handler));
        computation.invoke();
        assert_eq!(fired.get(), 0);
    }
}
