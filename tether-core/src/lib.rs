//! Tether Core
//!
//! This crate provides a fine-grained reactive runtime over a hierarchical
//! data store. It implements:
//!
//! - Observable containers (records and lists) with synchronous change events
//! - Path-addressed reads and copy-on-write updates of the store
//! - Automatic dependency tracking for computations
//! - A shared subscription registry that rebinds when containers are replaced
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observable`: `Record`, `List` and the `Value` tree they live in
//! - `store`: path resolution and the store accessor
//! - `reactive`: computations, subscriptions and the dependency collector
//! - `config`: path syntax and runtime configuration
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tether_core::{Record, Runtime, Value};
//!
//! let runtime = Runtime::new();
//! runtime.set("mymodel", Record::new()).unwrap();
//! runtime.set("mymodel.hello", "world").unwrap();
//!
//! let runs = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&runs);
//! runtime.run(move |cx| {
//!     counter.set(counter.get() + 1);
//!     let _ = cx.get_or("mymodel.hello", "nobody").unwrap();
//! });
//!
//! runtime.set("mymodel.hello", Value::from("you")).unwrap();
//! assert_eq!(runs.get(), 2);
//!
//! // Unrelated writes do not rerun it.
//! runtime.set("mymodel.other", 1).unwrap();
//! assert_eq!(runs.get(), 2);
//! ```

pub mod config;
pub mod error;
pub mod observable;
pub mod reactive;
pub mod store;

pub use config::{PathSyntax, RuntimeConfig};
pub use error::{Error, Result};
pub use observable::{List, ListEvent, Observable, Record, RecordEvent, Value};
pub use reactive::{
    Computation, ComputationEvent, ComputationId, Cx, GetOptions, Runtime, RunOptions,
    SubscriptionExt, SubscriptionId, Target,
};
pub use store::Store;
