//! Reactive Layer
//!
//! This module turns reads of the store into dependencies and writes into
//! re-invocations.
//!
//! # Concepts
//!
//! ## Computations
//!
//! A [`Computation`] wraps a body. While the body runs, every read made
//! through its [`Cx`] is recorded; when any of those values changes, the
//! body runs again. Computations started from inside a body are children of
//! the running computation and are stopped when they lose all parents.
//!
//! ## Subscriptions
//!
//! A subscription binds a logical path to the observable container that
//! currently backs it. They are shared: two computations reading the same
//! path attach to one subscription. See [`Subscriptions`].
//!
//! ## Collection
//!
//! After a tracked read the path is walked again and one subscription is
//! created per observable boundary crossed. Only the containers a change
//! can actually come from are listened to.
//!
//! # Example
//!
//! ```rust
//! use tether_core::{Record, Runtime, Value};
//!
//! let runtime = Runtime::new();
//! runtime.set("mymodel", Record::new()).unwrap();
//! runtime.set("mymodel.hello", "world").unwrap();
//!
//! let reader = runtime.run_at("mymodel", |cx| {
//!     let _ = cx.get("hello").unwrap();
//! });
//! assert!(runtime.subs().find("mymodel.hello").is_some());
//!
//! runtime.set("mymodel.hello", "there").unwrap();
//! assert_eq!(reader.run_count(), 2);
//! ```

mod collector;
mod computation;
mod context;
mod emitter;
mod id;
mod runtime;
mod subscription;

pub use computation::{Computation, RunOptions};
pub use context::Cx;
pub use emitter::{ComputationEvent, HandlerId};
pub use id::{ComputationId, SubscriptionId};
pub use runtime::{GetOptions, Runtime};
pub use subscription::{
    Binding, DefaultAdapter, SubscriptionAdapter, SubscriptionExt, SubscriptionInfo,
    SubscriptionRef, Subscriptions, Target,
};
