//! Core traits and types for the identifier cache.

/// Trait for entities that can be held in the identifier cache.
pub trait Cacheable: Clone {
  /// Full identifier of this entity (what prefixes are matched against)
  fn cache_key(&self) -> &str;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Data produced right after a network fetch.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Data produced from an already populated cache.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Data returned without consulting the cache at all.
  pub fn passthrough(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Passthrough,
    }
  }
}

/// Indicates where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// The cache was empty and had to be filled from the network
  Network,
  /// The cache was already populated
  Cache,
  /// No lookup was needed (e.g. a full-length identifier)
  Passthrough,
}
