//! Plane client with partial-ID resolution backed by the identifier cache.

use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::cache::IdentifierCache;
use crate::config::Credentials;

use super::client::PlaneClient;
use super::types::{
  state_key, EntityKind, EntityRef, IssueUpdate, NewCycle, NewIssue, NewModule, Priority,
  PriorityOutcome, StateName,
};

/// How many entities of a kind are listed to resolve prefixes. Entities
/// outside this window can only be addressed by their full identifier.
pub const RESOLVE_WINDOW: u32 = 500;

/// Plane client for one command run.
///
/// Wraps `PlaneClient` with the same operations, but accepts identifier
/// prefixes anywhere an entity is named. Listings used for resolution are
/// kept per kind until a create, update or delete on that kind.
pub struct CachedPlaneClient {
  inner: PlaneClient,
  ids: IdentifierCache<EntityKind, EntityRef>,
  /// state key -> state id, fetched at most once
  states: Option<HashMap<String, String>>,
}

impl CachedPlaneClient {
  pub fn new(credentials: &Credentials) -> Result<Self> {
    Ok(Self::from_client(PlaneClient::new(credentials)?))
  }

  pub fn from_client(inner: PlaneClient) -> Self {
    Self {
      inner,
      ids: IdentifierCache::new(),
      states: None,
    }
  }

  /// Expand `token` to a full identifier of `kind` (or return it unchanged).
  pub async fn resolve(&mut self, kind: EntityKind, token: &str) -> Result<String> {
    let inner = &self.inner;
    let result = self
      .ids
      .resolve(kind, token, move || {
        inner.list_entities(kind, Some(RESOLVE_WINDOW))
      })
      .await?;

    tracing::debug!(%kind, token, resolved = %result.data, source = ?result.source, "resolved");
    Ok(result.data)
  }

  pub async fn list(&self, kind: EntityKind, limit: Option<u32>) -> Result<Vec<EntityRef>> {
    self.inner.list_entities(kind, limit).await
  }

  pub async fn get(&mut self, kind: EntityKind, token: &str) -> Result<Value> {
    let id = self.resolve(kind, token).await?;
    self.inner.get_entity(kind, &id).await
  }

  /// Create an entity (write operation, invalidates `kind`).
  pub async fn create<B: Serialize>(&mut self, kind: EntityKind, body: &B) -> Result<EntityRef> {
    let created = self.inner.create_entity(kind, body).await?;
    self.ids.invalidate(kind);
    Ok(created)
  }

  /// Update an entity (write operation, invalidates `kind`).
  pub async fn update<B: Serialize>(
    &mut self,
    kind: EntityKind,
    token: &str,
    body: &B,
  ) -> Result<EntityRef> {
    let id = self.resolve(kind, token).await?;
    let updated = self.inner.update_entity(kind, &id, body).await?;
    self.ids.invalidate(kind);
    Ok(updated)
  }

  /// Delete an entity (write operation, invalidates `kind`). Returns the
  /// identifier that was deleted.
  pub async fn delete(&mut self, kind: EntityKind, token: &str) -> Result<String> {
    let id = self.resolve(kind, token).await?;
    self.inner.delete_entity(kind, &id).await?;
    self.ids.invalidate(kind);
    Ok(id)
  }

  pub async fn create_issue(&mut self, mut issue: NewIssue) -> Result<EntityRef> {
    if let Some(parent) = issue.parent.take() {
      issue.parent = Some(self.resolve(EntityKind::Issue, &parent).await?);
    }
    self.create(EntityKind::Issue, &issue).await
  }

  pub async fn update_issue(&mut self, token: &str, mut update: IssueUpdate) -> Result<EntityRef> {
    if let Some(Some(parent)) = &update.parent {
      let parent = self.resolve(EntityKind::Issue, parent).await?;
      update.parent = Some(Some(parent));
    }
    self.update(EntityKind::Issue, token, &update).await
  }

  /// Create a cycle owned by whoever created the project's latest issue.
  pub async fn create_cycle(&mut self, mut cycle: NewCycle) -> Result<EntityRef> {
    cycle.project_id = Some(self.inner.project_id().to_string());
    if cycle.owned_by.is_none() {
      let latest = self.inner.list_entities(EntityKind::Issue, Some(1)).await?;
      cycle.owned_by = latest
        .first()
        .and_then(|issue| issue.attr_str("created_by"))
        .map(String::from);
    }
    self.create(EntityKind::Cycle, &cycle).await
  }

  pub async fn create_module(&mut self, module: NewModule) -> Result<EntityRef> {
    self.create(EntityKind::Module, &module).await
  }

  /// Add an issue to a cycle or module. Returns (group id, issue id).
  pub async fn add_issue(
    &mut self,
    kind: EntityKind,
    group_token: &str,
    issue_token: &str,
  ) -> Result<(String, String)> {
    let group_id = self.resolve(kind, group_token).await?;
    let issue_id = self.resolve(EntityKind::Issue, issue_token).await?;
    self
      .inner
      .add_issues(kind, &group_id, &[issue_id.as_str()])
      .await?;
    Ok((group_id, issue_id))
  }

  /// Remove an issue from a cycle or module. Returns (group id, issue id).
  pub async fn remove_issue(
    &mut self,
    kind: EntityKind,
    group_token: &str,
    issue_token: &str,
  ) -> Result<(String, String)> {
    let group_id = self.resolve(kind, group_token).await?;
    let issue_id = self.resolve(EntityKind::Issue, issue_token).await?;
    self.inner.remove_issue(kind, &group_id, &issue_id).await?;
    Ok((group_id, issue_id))
  }

  /// Id of the project state matching `state`, if the project has one.
  pub async fn state_id(&mut self, state: StateName) -> Result<Option<String>> {
    if self.states.is_none() {
      let states = self.inner.list_states().await?;
      self.states = Some(
        states
          .into_iter()
          .map(|s| (state_key(&s.name), s.id))
          .collect(),
      );
    }

    Ok(
      self
        .states
        .as_ref()
        .and_then(|states| states.get(state.key()).cloned()),
    )
  }

  /// Set priorities on many issues at once.
  ///
  /// Walks one listing of the resolution window in order; each issue gets the
  /// first assignment whose token prefixes its id. A failed update is
  /// recorded and the walk continues. Only the initial listing failing
  /// aborts the batch.
  pub async fn batch_update_priority(
    &mut self,
    assignments: &[(String, Priority)],
  ) -> Result<Vec<PriorityOutcome>> {
    let issues = self
      .inner
      .list_entities(EntityKind::Issue, Some(RESOLVE_WINDOW))
      .await?;

    let mut outcomes = Vec::new();
    for issue in issues {
      let Some((_, priority)) = assignments
        .iter()
        .find(|(token, _)| !token.is_empty() && issue.id.starts_with(token.as_str()))
      else {
        continue;
      };

      let update = IssueUpdate {
        priority: Some(*priority),
        ..Default::default()
      };
      let error = match self
        .inner
        .update_entity(EntityKind::Issue, &issue.id, &update)
        .await
      {
        Ok(_) => None,
        Err(e) => {
          tracing::warn!(id = %issue.id, error = %e, "priority update failed");
          Some(e.to_string())
        }
      };

      outcomes.push(PriorityOutcome {
        issue,
        priority: *priority,
        error,
      });
    }

    self.ids.invalidate(EntityKind::Issue);
    Ok(outcomes)
  }
}
