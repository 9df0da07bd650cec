//! Thread-safe export registry for cross-module checking.
//!
//! The registry maps dotted module paths to the export shape the type
//! checker published for them. It is process-wide state shared across
//! compiles: publishes are atomic with respect to subsequent reads, reads
//! during a check may observe any already-completed compile, and the map
//! grows monotonically until an explicit [`ExportRegistry::clear`] (used by
//! test suites).
//!
//! There is deliberately no singleton: callers construct a registry and
//! pass it (usually via `Arc`) into [`crate::checker::check`] and
//! [`crate::compiler::compile`].
//!
//! # Example
//!
//! ```rust
//! use kimchi_compiler::registry::{ExportRegistry, ModuleExports};
//! use kimchi_compiler::checker::Shape;
//! use std::sync::Arc;
//!
//! let registry = ExportRegistry::new();
//! let exports = ModuleExports::new("services.db")
//!     .with_member("query", Shape::function_any(1));
//! registry.register("services.db", Arc::new(exports));
//!
//! assert!(registry.lookup("services.db").is_some());
//! ```

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::checker::Shape;

/// The published export surface of one module.
///
/// Members cover every `expose`d binding plus every `arg` and `env`; the
/// required-arg list is consulted when a later module binds this one via
/// `dep` and must cover those args in its override object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleExports {
    /// Dotted module path this entry was registered under.
    pub path: String,
    /// Exported member shapes, keyed by name.
    pub members: BTreeMap<String, Shape>,
    /// Names of args declared required (`arg !name`).
    pub required_args: Vec<String>,
}

impl ModuleExports {
    /// Create an empty export surface for a module path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            members: BTreeMap::new(),
            required_args: Vec::new(),
        }
    }

    /// Builder-style member insertion.
    pub fn with_member(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.members.insert(name.into(), shape);
        self
    }

    /// Builder-style required-arg registration.
    pub fn with_required_arg(mut self, name: impl Into<String>) -> Self {
        self.required_args.push(name.into());
        self
    }

    /// The whole surface as one object shape.
    pub fn as_object_shape(&self) -> Shape {
        Shape::Object(self.members.clone())
    }
}

/// Process-wide mapping from dotted module path to its last-published
/// export surface.
///
/// Designed to be shared across compilation threads via
/// `Arc<ExportRegistry>`.
#[derive(Debug, Default)]
pub struct ExportRegistry {
    entries: DashMap<String, Arc<ModuleExports>>,
}

impl ExportRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a module's export surface. A re-publish replaces the
    /// previous entry atomically.
    pub fn register(&self, path: impl Into<String>, exports: Arc<ModuleExports>) {
        self.entries.insert(path.into(), exports);
    }

    /// Look up a module's export surface by dotted path.
    pub fn lookup(&self, path: &str) -> Option<Arc<ModuleExports>> {
        self.entries.get(path).map(|entry| entry.value().clone())
    }

    /// Check whether a path has been published.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Truncate the registry. Used by test suites for isolation.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = ExportRegistry::new();
        let exports = ModuleExports::new("a.b").with_member("x", Shape::Number);
        registry.register("a.b", Arc::new(exports));

        let found = registry.lookup("a.b").unwrap();
        assert_eq!(found.members.get("x"), Some(&Shape::Number));
        assert!(registry.lookup("a.c").is_none());
    }

    #[test]
    fn test_republish_replaces() {
        let registry = ExportRegistry::new();
        registry.register(
            "m",
            Arc::new(ModuleExports::new("m").with_member("x", Shape::Number)),
        );
        registry.register(
            "m",
            Arc::new(ModuleExports::new("m").with_member("x", Shape::String)),
        );
        assert_eq!(
            registry.lookup("m").unwrap().members.get("x"),
            Some(&Shape::String)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear() {
        let registry = ExportRegistry::new();
        registry.register("m", Arc::new(ModuleExports::new("m")));
        assert!(!registry.is_empty());
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_object_shape() {
        let exports = ModuleExports::new("m")
            .with_member("foo", Shape::String)
            .with_member("bar", Shape::Any);
        match exports.as_object_shape() {
            Shape::Object(props) => {
                assert_eq!(props.get("foo"), Some(&Shape::String));
                assert_eq!(props.get("bar"), Some(&Shape::Any));
            }
            other => panic!("expected object shape, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExportRegistry>();
        assert_send_sync::<ModuleExports>();
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let registry = Arc::new(ExportRegistry::new());
        let mut handles = vec![];

        for i in 0..8 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    let path = format!("mod_{i}_{j}");
                    registry.register(&path, Arc::new(ModuleExports::new(&path)));
                    assert!(registry.lookup(&path).is_some());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 400);
    }
}
