//! Storage collaborator interface (spec §6): opaque key-value access for
//! `server-configs`, `custom-rules`, and `scan-history`. The core never
//! assumes durability semantics beyond "last write wins" — callers treat
//! every value as an already-serialized JSON string.
//!
//! Lives in `inspector-core` (rather than the scan crate, where the spec's
//! narrative first introduces it) because [`RuleCatalog`](../inspector_detection/struct.RuleCatalog.html)
//! needs the same collaborator to persist custom rules, and `inspector-detection`
//! must not depend on `inspector-scan` — see DESIGN.md.

use std::collections::HashMap;
use std::sync::Mutex;

/// The three well-known storage keys this spec's components read and write.
pub mod keys {
    pub const SERVER_CONFIGS: &str = "server-configs";
    pub const CUSTOM_RULES: &str = "custom-rules";
    pub const SCAN_HISTORY: &str = "scan-history";
}

/// Opaque key-value storage. A value is an already-serialized JSON string;
/// this trait does not interpret it.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrite the value stored under `key`.
    fn set(&self, key: &str, value: String);

    /// Remove any value stored under `key`.
    fn remove(&self, key: &str);
}

/// An in-process `Storage` backed by a `HashMap`, used as the default
/// collaborator so the detection and scan crates are runnable and testable
/// standalone without an external persistence layer (spec §4.9's "opaque
/// storage collaborator", instantiated here the way the teacher ships a
/// no-op default alongside every pluggable trait, e.g. `RetryPolicy::Never`).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.data.lock().expect("memory storage mutex poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.data
            .lock()
            .expect("memory storage mutex poisoned")
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.data.lock().expect("memory storage mutex poisoned").remove(key);
    }
}
