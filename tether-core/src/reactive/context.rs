//! Execution Context
//!
//! A [`Cx`] is handed to every computation body. It names the computation
//! that is currently running, so reads made through it are tracked for that
//! computation and nested computations started through it are linked to it.
//!
//! There is no ambient "current computation": outside a body, reads go
//! through [`Runtime`] directly and are never tracked.

use crate::error::Result;
use crate::observable::{Observable, Value};

use super::computation::RunOptions;
use super::subscription::{SubscriptionExt, Target};
use super::{Computation, GetOptions, Runtime};

/// The context of one running computation.
pub struct Cx<'a> {
    runtime: &'a Runtime,
    computation: &'a Computation,
}

impl<'a> Cx<'a> {
    pub(crate) fn new(runtime: &'a Runtime, computation: &'a Computation) -> Self {
        Self {
            runtime,
            computation,
        }
    }

    /// The computation whose body is running.
    pub fn computation(&self) -> &Computation {
        self.computation
    }

    /// The runtime the computation belongs to.
    pub fn runtime(&self) -> &Runtime {
        self.runtime
    }

    /// Tracked read, relative to the computation's base path.
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        self.get_with(path, GetOptions::default())
    }

    /// Tracked read falling back to `default`.
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Result<Value> {
        let value = self.get_with(path, GetOptions::default().with_default(default))?;
        Ok(value.unwrap_or_default())
    }

    /// Tracked read with explicit options.
    pub fn get_with(&self, path: &str, options: GetOptions) -> Result<Option<Value>> {
        self.runtime.read(Some(self.computation), path, options)
    }

    /// Root-absolute write. Writes are never tracked.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.runtime.set(path, value)
    }

    /// Depend on an observable that is not reachable through the store.
    ///
    /// The dependency lasts until this computation next reruns or stops.
    pub fn depend(&self, observable: impl Into<Observable>) {
        let subs = self.runtime.subs();
        let id = subs.create(
            None,
            Target::new(observable, None),
            SubscriptionExt::temporary(),
        );
        self.computation.subscribe(id);
        subs.clear();
    }

    /// Create a computation without running it. It links to whichever
    /// computation first invokes it.
    pub fn reactive<F>(&self, body: F, options: RunOptions) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        self.runtime.reactive(body, options)
    }

    /// Create a child computation and run it now, linked to this one.
    pub fn run<F>(&self, body: F) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        self.run_with(body, RunOptions::default())
    }

    /// Like [`Cx::run`], with reads in the child relative to `path`.
    pub fn run_at<F>(&self, path: impl Into<String>, body: F) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        self.run_with(body, RunOptions::at(path))
    }

    /// Create a child computation with `options` and run it now.
    pub fn run_with<F>(&self, body: F, options: RunOptions) -> Computation
    where
        F: Fn(&Cx<'_>) + 'static,
    {
        let child = self.reactive(body, options);
        self.invoke(&child);
        child
    }

    /// Run an existing computation as a child of this one.
    pub fn invoke(&self, child: &Computation) {
        child.call(Some(self.computation));
    }
}
