//! Deep set over plain containers.

use indexmap::IndexMap;

use crate::observable::Value;

/// Write `value` at `path` below `target`.
///
/// Plain maps are descended by key, arrays by decimal index (an index equal
/// to the length appends). Any other node on the way, including a missing
/// one, is replaced by an empty map. Observable containers are written
/// through their own mutator with the same copy-on-write step, so they
/// still emit their events.
pub fn deep_set<S: AsRef<str>>(target: &mut Value, path: &[S], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return;
    };
    let head = head.as_ref();

    if let Some(observable) = target.observable() {
        let mut child = observable.get(head).unwrap_or_default();
        deep_set(&mut child, rest, value);
        if !observable.set(head, child) {
            tracing::debug!(segment = head, "nested write rejected by container");
        }
        return;
    }

    if let Value::Array(items) = target {
        match head.parse::<usize>() {
            Ok(index) if index < items.len() => {
                deep_set(&mut items[index], rest, value);
                return;
            }
            Ok(index) if index == items.len() => {
                let mut child = Value::Null;
                deep_set(&mut child, rest, value);
                items.push(child);
                return;
            }
            _ => {}
        }
    }

    if !matches!(target, Value::Map(_)) {
        *target = Value::Map(IndexMap::new());
    }
    if let Value::Map(map) = target {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        deep_set(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Record;
    use serde_json::json;

    #[test]
    fn creates_intermediate_maps() {
        let mut target = Value::Null;
        deep_set(&mut target, &["a", "b"], Value::from(1));
        assert_eq!(target.to_json(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn keeps_siblings() {
        let mut target = Value::from(json!({"a": {"b": 1, "c": 2}}));
        deep_set(&mut target, &["a", "b"], Value::from(3));
        assert_eq!(target.to_json(), json!({"a": {"b": 3, "c": 2}}));
    }

    #[test]
    fn replaces_primitives_on_the_way() {
        let mut target = Value::from(json!({"a": "leaf"}));
        deep_set(&mut target, &["a", "b"], Value::from(true));
        assert_eq!(target.to_json(), json!({"a": {"b": true}}));
    }

    #[test]
    fn indexes_arrays() {
        let mut target = Value::from(json!({"xs": [1, 2]}));
        deep_set(&mut target, &["xs", "1"], Value::from(5));
        deep_set(&mut target, &["xs", "2"], Value::from(6));
        assert_eq!(target.to_json(), json!({"xs": [1, 5, 6]}));
    }

    #[test]
    fn empty_path_replaces_target() {
        let mut target = Value::from(1);
        deep_set::<&str>(&mut target, &[], Value::from("x"));
        assert_eq!(target, Value::from("x"));
    }

    #[test]
    fn writes_through_records() {
        let record = Record::new();
        let mut target = Value::from(record.clone());
        deep_set(&mut target, &["a", "b"], Value::from(1));
        assert_eq!(record.get("a").unwrap().to_json(), json!({"b": 1}));
    }
}
