//! Caching implementations for Plane types.

use crate::cache::Cacheable;

use super::types::EntityRef;

impl Cacheable for EntityRef {
  fn cache_key(&self) -> &str {
    &self.id
  }
}
