//! Dependency Collector
//!
//! After a tracked read, the read path is walked again from the root. Each
//! time the walk enters an observable container, one subscription is queued
//! on the container the walk was in before, keyed by the path up to and
//! including the first segment read from it. A final subscription is queued
//! for the last container reached.
//!
//! Plain maps and arrays between boundaries are never subscribed: they
//! cannot change without their owning record emitting a change for the
//! attribute that holds them.
//!
//! Reading `mymodel.hello.deep` where `mymodel` is a record queues:
//!
//! | key             | target                      |
//! |-----------------|-----------------------------|
//! | `mymodel`       | root, key `mymodel`         |
//! | `mymodel.hello` | `mymodel` record, key `hello` |
//!
//! When the value read is itself a container, the final subscription
//! watches it whole and is keyed by the path plus a trailing separator, so
//! it stays distinct from the subscription on its parent's attribute.

use crate::observable::{Observable, Value};
use crate::store::path::join;
use crate::store::step;

use super::subscription::{SubscriptionExt, Target};
use super::Runtime;

/// Queue the subscriptions covering a read of `segments`.
pub(crate) fn process<S: AsRef<str>>(runtime: &Runtime, segments: &[S]) {
    let root = runtime.root().clone();
    let mut boundary = Observable::Record(root.clone());
    let mut cur = Some(Value::Record(root));
    let mut start = 0;

    for (index, segment) in segments.iter().enumerate() {
        cur = cur.and_then(|value| step(value, segment.as_ref()));
        if let Some(observable) = cur.as_ref().and_then(Value::observable) {
            flush(runtime, segments, start, index + 1, &boundary);
            boundary = observable;
            start = index + 1;
        }
    }
    flush(runtime, segments, start, segments.len(), &boundary);
}

/// Queue one subscription on `boundary` for the segments `start..end`.
fn flush<S: AsRef<str>>(
    runtime: &Runtime,
    segments: &[S],
    start: usize,
    end: usize,
    boundary: &Observable,
) {
    let syntax = runtime.config().syntax;
    let (key, sub_key) = if start < end {
        (
            join(&segments[..=start], &syntax),
            Some(segments[start].as_ref().to_string()),
        )
    } else {
        let mut key = join(&segments[..end], &syntax);
        if !key.is_empty() {
            key.push(syntax.separator);
        }
        (key, None)
    };
    runtime.subs().create(
        Some(&key),
        Target::new(boundary.clone(), sub_key),
        SubscriptionExt::default(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Record;
    use serde_json::json;

    fn queued(runtime: &Runtime) -> Vec<(Option<String>, Option<String>)> {
        runtime
            .subs()
            .pending()
            .into_iter()
            .filter_map(|id| runtime.subs().find(id))
            .map(|info| (info.path, info.target.sub_key))
            .collect()
    }

    fn owned(pairs: &[(&str, Option<&str>)]) -> Vec<(Option<String>, Option<String>)> {
        pairs
            .iter()
            .map(|(path, key)| (Some(path.to_string()), key.map(str::to_string)))
            .collect()
    }

    #[test]
    fn one_subscription_per_boundary() {
        let runtime = Runtime::new();
        let model = Record::from_iter([("hello", Value::from(json!({"deep": "value"})))]);
        runtime.set("mymodel", model.clone()).unwrap();

        process(&runtime, &["mymodel", "hello", "deep"]);
        assert_eq!(
            queued(&runtime),
            owned(&[("mymodel", Some("mymodel")), ("mymodel.hello", Some("hello"))])
        );
        let info = runtime.subs().find("mymodel.hello").unwrap();
        assert_eq!(info.target.observable, Observable::Record(model));
    }

    #[test]
    fn plain_data_under_root() {
        let runtime = Runtime::new();
        runtime.set("session.user", "ada").unwrap();

        process(&runtime, &["session", "user"]);
        assert_eq!(queued(&runtime), owned(&[("session", Some("session"))]));
    }

    #[test]
    fn container_value_is_watched_whole() {
        let runtime = Runtime::new();
        runtime.set("mymodel", Record::new()).unwrap();

        process(&runtime, &["mymodel"]);
        assert_eq!(
            queued(&runtime),
            owned(&[("mymodel", Some("mymodel")), ("mymodel.", None)])
        );
    }

    #[test]
    fn missing_value_still_binds_last_container() {
        let runtime = Runtime::new();
        process(&runtime, &["nothing", "here"]);
        assert_eq!(queued(&runtime), owned(&[("nothing", Some("nothing"))]));
    }

    #[test]
    fn root_read_binds_inert_root() {
        let runtime = Runtime::new();
        process::<&str>(&runtime, &[]);
        assert_eq!(queued(&runtime), owned(&[("", None)]));
    }
}
