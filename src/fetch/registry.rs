//! Resource-level mutual exclusion for concurrent fetches.
//!
//! Two fetches of the same resource would append into the same part files
//! and corrupt each other. Every fetch first claims its resource identity
//! here; a second claim for the same identity fails until the first guard
//! is dropped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rangefetch_core::fetch::InFlightRegistry;
//!
//! let registry = Arc::new(InFlightRegistry::new());
//! let guard = registry.claim("https://example.com/a.iso").unwrap();
//! assert!(registry.claim("https://example.com/a.iso").is_none());
//! drop(guard);
//! assert!(registry.claim("https://example.com/a.iso").is_some());
//! ```

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

/// Set of resource identities with a fetch currently running.
///
/// `Send + Sync`; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    claims: DashMap<String, Instant>,
}

impl InFlightRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims `key`, returning a guard that releases it on drop.
    ///
    /// Returns `None` if `key` is already claimed.
    #[must_use]
    pub fn claim(self: &Arc<Self>, key: &str) -> Option<ClaimGuard> {
        match self.claims.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!(
                    key,
                    held_ms = entry.get().elapsed().as_millis(),
                    "resource already in flight"
                );
                None
            }
            Entry::Vacant(entry) => {
                entry.insert(Instant::now());
                trace!(key, "resource claimed");
                Some(ClaimGuard {
                    registry: Arc::clone(self),
                    key: key.to_string(),
                })
            }
        }
    }

    /// True if `key` is currently claimed.
    #[must_use]
    pub fn is_claimed(&self, key: &str) -> bool {
        self.claims.contains_key(key)
    }

    /// Number of resources currently in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// True if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Releases a registry claim when dropped.
#[derive(Debug)]
pub struct ClaimGuard {
    registry: Arc<InFlightRegistry>,
    key: String,
}

impl ClaimGuard {
    /// The claimed resource identity.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.registry.claims.remove(&self.key);
        trace!(key = %self.key, "resource released");
    }
}
