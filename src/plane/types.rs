use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Collections that support partial-ID resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  Issue,
  Cycle,
  Module,
}

impl EntityKind {
  /// Path segment of the collection under a project
  pub fn collection(self) -> &'static str {
    match self {
      Self::Issue => "issues",
      Self::Cycle => "cycles",
      Self::Module => "modules",
    }
  }

  /// Sub-collection holding issue membership, for kinds that group issues
  pub fn membership(self) -> Option<&'static str> {
    match self {
      Self::Issue => None,
      Self::Cycle => Some("cycle-issues"),
      Self::Module => Some("module-issues"),
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Issue => "issue",
      Self::Cycle => "cycle",
      Self::Module => "module",
    };
    f.write_str(name)
  }
}

/// Any entity returned by the service: an id, a name, and whatever else
/// the endpoint sent (kept for JSON output and attribute lookups).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(flatten)]
  pub attributes: Map<String, Value>,
}

impl EntityRef {
  /// String attribute, `None` when absent, null or not a string
  pub fn attr_str(&self, key: &str) -> Option<&str> {
    self.attributes.get(key).and_then(Value::as_str)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  None,
  Low,
  Medium,
  High,
  Urgent,
}

impl Priority {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::None => "none",
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Urgent => "urgent",
    }
  }

  /// Priority from the API's representation; missing or unknown is `None`.
  pub fn from_api(value: Option<&str>) -> Self {
    match value {
      Some("low") => Self::Low,
      Some("medium") => Self::Medium,
      Some("high") => Self::High,
      Some("urgent") => Self::Urgent,
      _ => Self::None,
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Workflow states accepted by `update --state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateName {
  Backlog,
  Todo,
  InProgress,
  Done,
  Cancelled,
}

impl StateName {
  /// Lookup key, comparable with `state_key` of a project state's name
  pub fn key(self) -> &'static str {
    match self {
      Self::Backlog => "backlog",
      Self::Todo => "todo",
      Self::InProgress => "in-progress",
      Self::Done => "done",
      Self::Cancelled => "cancelled",
    }
  }
}

/// Normalize a project state name ("In Progress" -> "in-progress").
pub fn state_key(name: &str) -> String {
  name.to_lowercase().replace(' ', "-")
}

/// Wrap plain text as a single HTML paragraph for `description_html`.
pub fn paragraph_html(text: &str) -> String {
  let escaped = text
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;");
  format!("<p>{}</p>", escaped)
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewIssue {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description_html: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<Priority>,
  /// Parent issue (token until the client resolves it)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent: Option<String>,
}

/// Partial issue update. Absent fields are left out of the PATCH body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<Priority>,
  /// State id (already looked up)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  /// `Some(None)` clears the parent (sent as null)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent: Option<Option<String>>,
}

impl IssueUpdate {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.priority.is_none() && self.state.is_none() && self.parent.is_none()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewCycle {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_date: Option<NaiveDate>,
  /// Filled in by the client
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_id: Option<String>,
  /// Filled in by the client when the project has issues
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owned_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_date: Option<NaiveDate>,
}

impl CycleUpdate {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.description.is_none()
      && self.start_date.is_none()
      && self.end_date.is_none()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewModule {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_date: Option<NaiveDate>,
}

impl ModuleUpdate {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.description.is_none()
      && self.start_date.is_none()
      && self.target_date.is_none()
  }
}

/// Outcome of one item in a batch priority update
#[derive(Debug, Clone)]
pub struct PriorityOutcome {
  pub issue: EntityRef,
  pub priority: Priority,
  /// Failure message, `None` when the update went through
  pub error: Option<String>,
}

impl PriorityOutcome {
  pub fn succeeded(&self) -> bool {
    self.error.is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_entity_ref_keeps_extra_attributes() {
    let entity: EntityRef = serde_json::from_value(json!({
      "id": "abc",
      "name": "Fix bug",
      "priority": "high",
      "start_date": null
    }))
    .unwrap();

    assert_eq!(entity.attr_str("priority"), Some("high"));
    assert_eq!(entity.attr_str("start_date"), None);
    assert_eq!(
      serde_json::to_value(&entity).unwrap()["priority"],
      json!("high")
    );
  }

  #[test]
  fn test_issue_update_omits_absent_fields() {
    let update = IssueUpdate {
      priority: Some(Priority::Urgent),
      ..Default::default()
    };
    assert_eq!(
      serde_json::to_value(&update).unwrap(),
      json!({"priority": "urgent"})
    );
  }

  #[test]
  fn test_issue_update_cleared_parent_is_null() {
    let update = IssueUpdate {
      parent: Some(None),
      ..Default::default()
    };
    assert!(!update.is_empty());
    assert_eq!(
      serde_json::to_value(&update).unwrap(),
      json!({"parent": null})
    );
  }

  #[test]
  fn test_cycle_dates_serialize_as_iso() {
    let cycle = NewCycle {
      name: "Sprint 4".to_string(),
      start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
      ..Default::default()
    };
    assert_eq!(
      serde_json::to_value(&cycle).unwrap(),
      json!({"name": "Sprint 4", "start_date": "2024-03-01"})
    );
  }

  #[test]
  fn test_state_key_matches_state_name() {
    assert_eq!(state_key("In Progress"), StateName::InProgress.key());
    assert_eq!(state_key("Backlog"), StateName::Backlog.key());
  }

  #[test]
  fn test_paragraph_html_escapes() {
    assert_eq!(paragraph_html("a < b & c"), "<p>a &lt; b &amp; c</p>");
  }

  #[test]
  fn test_priority_from_api() {
    assert_eq!(Priority::from_api(Some("urgent")), Priority::Urgent);
    assert_eq!(Priority::from_api(Some("none")), Priority::None);
    assert_eq!(Priority::from_api(None), Priority::None);
  }
}
