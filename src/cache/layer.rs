//! Identifier cache that resolves partial identifiers against lazily fetched listings.

use color_eyre::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

use super::traits::{CacheResult, Cacheable};

/// Length of a full identifier (hyphenated UUID). Tokens of exactly this
/// length are trusted without a lookup.
pub const FULL_ID_LEN: usize = 36;

/// Whether `token` already has the shape of a full identifier.
pub fn is_full_id(token: &str) -> bool {
  token.chars().count() == FULL_ID_LEN
}

/// First entity (in listing order) whose key starts with `token`.
pub fn first_prefix_match<'a, T: Cacheable>(entities: &'a [T], token: &str) -> Option<&'a str> {
  entities
    .iter()
    .map(|e| e.cache_key())
    .find(|key| key.starts_with(token))
}

/// Per-kind listings used to expand identifier prefixes.
///
/// Each kind is either empty (no slot) or populated with the listing fetched
/// the first time a prefix of that kind had to be resolved. Kinds never share
/// a slot. A slot only goes back to empty through `invalidate`; there is no
/// expiry.
pub struct IdentifierCache<K, T> {
  slots: HashMap<K, Vec<T>>,
}

impl<K, T> IdentifierCache<K, T>
where
  K: Copy + Eq + Hash + Debug,
  T: Cacheable,
{
  pub fn new() -> Self {
    Self {
      slots: HashMap::new(),
    }
  }

  pub fn is_populated(&self, kind: K) -> bool {
    self.slots.contains_key(&kind)
  }

  /// Drop the listing for `kind` so the next resolution refetches it.
  pub fn invalidate(&mut self, kind: K) {
    if self.slots.remove(&kind).is_some() {
      tracing::debug!(?kind, "identifier cache invalidated");
    }
  }

  /// Resolve `token` to a full identifier.
  ///
  /// 1. Full-length tokens are returned as-is, no lookup
  /// 2. If the kind has no listing yet, `fetcher` fills it
  /// 3. The first listed key starting with `token` wins
  /// 4. No match returns `token` unchanged; the request using it will fail
  ///    on its own with a not-found from the service
  ///
  /// A failing fetcher leaves the slot empty and propagates the error.
  pub async fn resolve<F, Fut>(
    &mut self,
    kind: K,
    token: &str,
    fetcher: F,
  ) -> Result<CacheResult<String>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    if is_full_id(token) {
      return Ok(CacheResult::passthrough(token.to_string()));
    }

    let populated = self.is_populated(kind);
    if !populated {
      tracing::debug!(?kind, "identifier cache miss, fetching listing");
      let entities = fetcher().await?;
      self.slots.insert(kind, entities);
    }

    let entities = self.slots.get(&kind).map(Vec::as_slice).unwrap_or_default();
    let resolved = match first_prefix_match(entities, token) {
      Some(id) => id.to_string(),
      None => {
        tracing::debug!(?kind, token, "no identifier matches prefix, passing through");
        token.to_string()
      }
    };

    Ok(if populated {
      CacheResult::from_cache(resolved)
    } else {
      CacheResult::from_network(resolved)
    })
  }
}

impl<K, T> Default for IdentifierCache<K, T>
where
  K: Copy + Eq + Hash + Debug,
  T: Cacheable,
{
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::CacheSource;
  use color_eyre::eyre::{eyre, Report};
  use std::cell::Cell;

  #[derive(Debug, Clone)]
  struct Item(&'static str);

  impl Cacheable for Item {
    fn cache_key(&self) -> &str {
      self.0
    }
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  enum Kind {
    A,
    B,
  }

  const ABC123: &str = "abc12300-0000-4000-8000-000000000001";
  const ABC999: &str = "abc99900-0000-4000-8000-000000000002";
  const FFF000: &str = "fff00000-0000-4000-8000-000000000003";

  fn listing() -> Vec<Item> {
    vec![Item(ABC123), Item(ABC999)]
  }

  #[test]
  fn test_is_full_id() {
    assert!(is_full_id(ABC123));
    assert!(!is_full_id("abc123"));
    assert!(!is_full_id(&format!("{}0", ABC123)));
  }

  #[test]
  fn test_first_prefix_match_prefers_listing_order() {
    let items = listing();
    assert_eq!(first_prefix_match(&items, "abc1"), Some(ABC123));
    assert_eq!(first_prefix_match(&items, "abc9"), Some(ABC999));
    assert_eq!(first_prefix_match(&items, "abc"), Some(ABC123));
    assert_eq!(first_prefix_match(&items, "zzz"), None);
  }

  #[tokio::test]
  async fn test_full_length_token_skips_fetch() {
    let mut cache: IdentifierCache<Kind, Item> = IdentifierCache::new();
    let calls = Cell::new(0);
    let counter = &calls;

    let result = cache
      .resolve(Kind::A, FFF000, move || async move {
        counter.set(counter.get() + 1);
        Ok::<_, Report>(listing())
      })
      .await
      .unwrap();

    assert_eq!(result.data, FFF000);
    assert_eq!(result.source, CacheSource::Passthrough);
    assert_eq!(calls.get(), 0);
    assert!(!cache.is_populated(Kind::A));
  }

  #[tokio::test]
  async fn test_prefix_resolution_scenario() {
    let mut cache: IdentifierCache<Kind, Item> = IdentifierCache::new();
    let calls = Cell::new(0);
    let counter = &calls;
    let fetch = move || async move {
      counter.set(counter.get() + 1);
      Ok::<_, Report>(listing())
    };

    let first = cache.resolve(Kind::A, "abc1", fetch).await.unwrap();
    assert_eq!(first.data, ABC123);
    assert_eq!(first.source, CacheSource::Network);

    let ambiguous = cache.resolve(Kind::A, "abc", fetch).await.unwrap();
    assert_eq!(ambiguous.data, ABC123);
    assert_eq!(ambiguous.source, CacheSource::Cache);

    let unknown = cache.resolve(Kind::A, "zzz", fetch).await.unwrap();
    assert_eq!(unknown.data, "zzz");

    // One listing served all three lookups
    assert_eq!(calls.get(), 1);
  }

  #[tokio::test]
  async fn test_invalidate_forces_exactly_one_refetch() {
    let mut cache: IdentifierCache<Kind, Item> = IdentifierCache::new();
    let calls = Cell::new(0);
    let counter = &calls;
    let fetch = move || async move {
      counter.set(counter.get() + 1);
      Ok::<_, Report>(listing())
    };

    cache.resolve(Kind::A, "abc9", fetch).await.unwrap();
    cache.invalidate(Kind::A);
    assert!(!cache.is_populated(Kind::A));

    let after = cache.resolve(Kind::A, "abc9", fetch).await.unwrap();
    assert_eq!(after.source, CacheSource::Network);
    cache.resolve(Kind::A, "abc1", fetch).await.unwrap();

    assert_eq!(calls.get(), 2);
  }

  #[tokio::test]
  async fn test_kinds_do_not_share_listings() {
    let mut cache: IdentifierCache<Kind, Item> = IdentifierCache::new();

    cache
      .resolve(Kind::A, "abc", || async { Ok::<_, Report>(listing()) })
      .await
      .unwrap();

    let other = cache
      .resolve(Kind::B, "abc", || async { Ok::<_, Report>(vec![Item(FFF000)]) })
      .await
      .unwrap();
    assert_eq!(other.data, "abc");
    assert_eq!(other.source, CacheSource::Network);

    cache.invalidate(Kind::B);
    assert!(cache.is_populated(Kind::A));
  }

  #[tokio::test]
  async fn test_failed_fetch_leaves_slot_empty() {
    let mut cache: IdentifierCache<Kind, Item> = IdentifierCache::new();

    let err = cache
      .resolve(Kind::A, "abc", || async { Err::<Vec<Item>, _>(eyre!("boom")) })
      .await
      .unwrap_err();
    assert!(err.to_string().contains("boom"));
    assert!(!cache.is_populated(Kind::A));
  }

  #[tokio::test]
  async fn test_empty_token_matches_first_listed() {
    let mut cache: IdentifierCache<Kind, Item> = IdentifierCache::new();
    let result = cache
      .resolve(Kind::A, "", || async { Ok::<_, Report>(listing()) })
      .await
      .unwrap();
    assert_eq!(result.data, ABC123);
    assert_eq!(result.source, CacheSource::Network);
    assert!(cache.is_populated(Kind::A));
  }
}
