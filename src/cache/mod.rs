//! In-memory identifier cache used for partial-ID resolution.
//!
//! This module is API-agnostic:
//! - Keeps one ordered listing per collection kind, filled lazily
//! - Resolves identifier prefixes against that listing (first match wins)
//! - Forgets a kind's listing when the caller invalidates it after a write
//!
//! Nothing is persisted; the cache lives as long as its owner.

mod layer;
mod traits;

pub use layer::IdentifierCache;
pub use traits::Cacheable;
