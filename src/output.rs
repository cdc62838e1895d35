//! Text and JSON rendering for command results.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;

use crate::plane::types::{EntityRef, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Text,
  Json,
}

/// Leading eight characters of an identifier
pub fn short_id(id: &str) -> &str {
  id.get(..8).unwrap_or(id)
}

pub fn priority_icon(priority: Priority) -> &'static str {
  match priority {
    Priority::Urgent => "🔴",
    Priority::High => "🟠",
    Priority::Medium => "🟡",
    Priority::Low => "🟢",
    Priority::None => "⚪",
  }
}

pub fn issue_line(issue: &EntityRef) -> String {
  let priority = Priority::from_api(issue.attr_str("priority"));
  format!(
    "{} [{}] {}",
    priority_icon(priority),
    short_id(&issue.id),
    issue.name
  )
}

pub fn cycle_line(cycle: &EntityRef) -> String {
  format!(
    "🔄 [{}] {} ({} → {})",
    short_id(&cycle.id),
    cycle.name,
    cycle.attr_str("start_date").unwrap_or("N/A"),
    cycle.attr_str("end_date").unwrap_or("N/A")
  )
}

pub fn module_line(module: &EntityRef) -> String {
  format!(
    "📦 [{}] {} ({} → {})",
    short_id(&module.id),
    module.name,
    module.attr_str("start_date").unwrap_or("N/A"),
    module.attr_str("target_date").unwrap_or("N/A")
  )
}

/// Confirmation line after a create or update
pub fn saved_line(entity: &EntityRef) -> String {
  format!("✓ [{}] {}", short_id(&entity.id), entity.name)
}

/// Issue and cycle counts for `stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
  pub issues: usize,
  pub cycles: usize,
  pub urgent: usize,
  pub high: usize,
  pub medium: usize,
  pub low: usize,
  pub none: usize,
}

impl Stats {
  pub fn collect(issues: &[EntityRef], cycles: usize) -> Self {
    let mut stats = Stats {
      issues: issues.len(),
      cycles,
      urgent: 0,
      high: 0,
      medium: 0,
      low: 0,
      none: 0,
    };
    for issue in issues {
      match Priority::from_api(issue.attr_str("priority")) {
        Priority::Urgent => stats.urgent += 1,
        Priority::High => stats.high += 1,
        Priority::Medium => stats.medium += 1,
        Priority::Low => stats.low += 1,
        Priority::None => stats.none += 1,
      }
    }
    stats
  }

  pub fn lines(&self) -> Vec<String> {
    vec![
      "📊 Issue Statistics".to_string(),
      format!("   Total: {} issues, {} cycles", self.issues, self.cycles),
      format!("   🔴 Urgent: {}", self.urgent),
      format!("   🟠 High:   {}", self.high),
      format!("   🟡 Medium: {}", self.medium),
      format!("   🟢 Low:    {}", self.low),
      format!("   ⚪ None:   {}", self.none),
    ]
  }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to render JSON: {}", e))
}
