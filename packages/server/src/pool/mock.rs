//! Mock seam: canned responses intercepting pool and proxy calls.
//!
//! A [`MockRegistry`] is populated before the system under test runs and
//! cleared at teardown. It is an explicit constructor dependency of the
//! pool, not a process-global table, so each test harness owns its
//! own registry and parallel tests cannot bleed into each other.

use parking_lot::RwLock;

use switchyard_core::{Filter, Value};

/// One canned response.
///
/// `target` identifies what the rule intercepts: `"service"` for pool
/// resolution, `"service.collection"` for proxy queries. A rule with an
/// args pattern matches only on exact filter equality; without one it
/// matches unconditionally.
#[derive(Debug, Clone)]
pub struct MockRule {
    pub target: String,
    pub args: Option<Filter>,
    pub response: Value,
}

/// Ordered rule table with override semantics.
///
/// Rules are consulted newest-first, so re-registering a target overrides
/// the earlier rule without removing it; `clear()` drops everything and
/// restores real-store behavior.
#[derive(Default)]
pub struct MockRegistry {
    rules: RwLock<Vec<MockRule>>,
}

impl MockRegistry {
    /// Creates an empty registry: nothing is intercepted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule. Newest registration wins on duplicate targets.
    pub fn register(&self, target: impl Into<String>, args: Option<Filter>, response: Value) {
        self.rules.write().push(MockRule {
            target: target.into(),
            args,
            response,
        });
    }

    /// Drops every rule, restoring real-store behavior.
    pub fn clear(&self) {
        self.rules.write().clear();
    }

    /// Whether no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Finds the canned response for a target and argument filter.
    ///
    /// Newest-first scan; the first rule whose target matches and whose
    /// args pattern (if any) equals the filter wins.
    #[must_use]
    pub fn lookup(&self, target: &str, args: &Filter) -> Option<Value> {
        self.rules
            .read()
            .iter()
            .rev()
            .find(|rule| {
                rule.target == target && rule.args.as_ref().is_none_or(|pattern| pattern == args)
            })
            .map(|rule| rule.response.clone())
    }

    /// Whether any rule targets the service itself or one of its
    /// collections, i.e. whether the pool may resolve this service from
    /// mocks alone.
    #[must_use]
    pub fn covers_service(&self, service: &str) -> bool {
        let prefix = format!("{service}.");
        self.rules
            .read()
            .iter()
            .any(|rule| rule.target == service || rule.target.starts_with(&prefix))
    }
}
