//! Caching pipeline: deterministic keys, the policy cascade, entry codec,
//! and fault-isolated storage.

pub mod entry;
pub mod key;
pub mod policy;
pub mod store;

pub use entry::CacheEntry;
pub use key::CacheKeyBuilder;
pub use policy::{CachePolicyDecision, CachePolicyResolver};
pub use store::{BackendError, CacheBackend, CacheStore, MemoryBackend};
