//! Configuration for the coordination layer.
//!
//! [`CoordinatorConfig`] carries the process-level knobs. [`Settings`] is a
//! dot-path view over a nested value tree, used for service-specific
//! configuration loaded by the wiring code.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use switchyard_core::Value;

use crate::dispatch::router::ROUTER_CHANNEL;

/// Process-level configuration for worker loops and the router.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Unique identifier for this process, used in log context.
    pub node_id: String,
    /// Channel the router's worker loop consumes.
    pub router_channel: String,
    /// Interval between queue polls for spawned worker loops, milliseconds.
    pub poll_interval_ms: u64,
    /// How long `stop()` callers should allow an in-flight task to finish,
    /// milliseconds.
    pub drain_timeout_ms: u64,
}

impl CoordinatorConfig {
    /// Poll interval as a [`Duration`], for `WorkerLoop::spawn`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Drain timeout as a [`Duration`].
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            router_channel: ROUTER_CHANNEL.to_string(),
            poll_interval_ms: 100,
            drain_timeout_ms: 5_000,
        }
    }
}

/// Dot-path settings tree.
///
/// `get("administrator.name")` walks nested maps; `get("administrator")`
/// returns the whole group as a map value. `set` creates intermediate
/// groups as needed; setting a path through a scalar replaces the scalar
/// with a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    root: BTreeMap<String, Value>,
}

impl Settings {
    /// Creates an empty settings tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a settings tree from an existing map of values.
    #[must_use]
    pub fn from_map(root: BTreeMap<String, Value>) -> Self {
        Self { root }
    }

    /// Reads the value at a dot path, or `None` if any segment is absent
    /// or a non-map is traversed.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (parents, last) = path
            .rsplit_once('.')
            .map_or((None, path), |(p, l)| (Some(p), l));

        let mut map = &self.root;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                map = map.get(segment)?.as_map()?;
            }
        }
        map.get(last)
    }

    /// Writes the value at a dot path, creating intermediate groups.
    pub fn set(&mut self, path: &str, value: Value) {
        let (parents, last) = path
            .rsplit_once('.')
            .map_or((None, path), |(p, l)| (Some(p), l));

        let mut map = &mut self.root;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                map = child_map(map, segment);
            }
        }
        map.insert(last.to_string(), value);
    }
}

/// Returns the child group under `key`, normalizing any non-map value
/// already there into an empty group first.
fn child_map<'a>(
    map: &'a mut BTreeMap<String, Value>,
    key: &str,
) -> &'a mut BTreeMap<String, Value> {
    let entry = map
        .entry(key.to_string())
        .and_modify(|value| {
            if !matches!(value, Value::Map(_)) {
                *value = Value::Map(BTreeMap::new());
            }
        })
        .or_insert_with(|| Value::Map(BTreeMap::new()));

    match entry {
        Value::Map(children) => children,
        // The entry was normalized to a map just above.
        _ => unreachable!(),
    }
}
