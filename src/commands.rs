//! Subcommands and their execution against a `CachedPlaneClient`.

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use dialoguer::Confirm;
use serde_json::json;
use std::io::IsTerminal;

use crate::config;
use crate::error::RunwayError;
use crate::output::{self, OutputFormat, Stats};
use crate::plane::cached_client::{CachedPlaneClient, RESOLVE_WINDOW};
use crate::plane::types::{
  paragraph_html, CycleUpdate, EntityKind, EntityRef, IssueUpdate, ModuleUpdate, NewCycle,
  NewIssue, NewModule, Priority, StateName,
};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List issues
  List {
    /// Number of issues (-1 for all)
    #[arg(short, long, default_value_t = 20, allow_negative_numbers = true)]
    limit: i64,
    /// List all issues
    #[arg(short, long)]
    all: bool,
    /// Filter by priority
    #[arg(short, long, value_enum)]
    priority: Option<Priority>,
  },
  /// Show issue statistics
  Stats,
  /// Show an issue as JSON
  Get { id: String },
  /// Create an issue
  Create {
    #[arg(short, long)]
    title: String,
    #[arg(short, long, default_value = "")]
    description: String,
    #[arg(short, long, value_enum)]
    priority: Option<Priority>,
    /// Parent issue id or prefix
    #[arg(long)]
    parent: Option<String>,
  },
  /// Create an issue with just a title
  Quick { title: String },
  /// Update an issue
  Update {
    id: String,
    #[arg(short, long)]
    title: Option<String>,
    #[arg(short, long, value_enum)]
    priority: Option<Priority>,
    #[arg(short, long, value_enum)]
    state: Option<StateName>,
    #[arg(long, conflicts_with = "no_parent")]
    parent: Option<String>,
    /// Detach the issue from its parent
    #[arg(long)]
    no_parent: bool,
  },
  /// Delete an issue
  Delete {
    id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
  /// Set priorities for several issues: <id>=<priority> ...
  Prioritize {
    #[arg(required = true, value_parser = parse_assignment)]
    assignments: Vec<(String, Priority)>,
  },

  /// List cycles
  Cycles,
  /// Show a cycle as JSON
  CycleGet { id: String },
  /// Create a cycle
  CycleCreate {
    #[arg(short, long)]
    name: String,
    #[arg(short, long, default_value = "")]
    description: String,
    /// Start date (YYYY-MM-DD)
    #[arg(short, long)]
    start: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(short, long)]
    end: Option<NaiveDate>,
  },
  /// Update a cycle
  CycleUpdate {
    id: String,
    #[arg(short, long)]
    name: Option<String>,
    #[arg(short, long)]
    description: Option<String>,
    #[arg(short, long)]
    start: Option<NaiveDate>,
    #[arg(short, long)]
    end: Option<NaiveDate>,
  },
  /// Delete a cycle
  CycleDelete {
    id: String,
    #[arg(short, long)]
    force: bool,
  },
  /// Add an issue to a cycle
  CycleAddIssue { cycle_id: String, issue_id: String },
  /// Remove an issue from a cycle
  CycleRemoveIssue { cycle_id: String, issue_id: String },

  /// List modules
  Modules,
  /// Show a module as JSON
  ModuleGet { id: String },
  /// Create a module
  ModuleCreate {
    #[arg(short, long)]
    name: String,
    #[arg(short, long, default_value = "")]
    description: String,
    /// Start date (YYYY-MM-DD)
    #[arg(short, long)]
    start: Option<NaiveDate>,
    /// Target date (YYYY-MM-DD)
    #[arg(short, long)]
    target: Option<NaiveDate>,
  },
  /// Update a module
  ModuleUpdate {
    id: String,
    #[arg(short, long)]
    name: Option<String>,
    #[arg(short, long)]
    description: Option<String>,
    #[arg(short, long)]
    start: Option<NaiveDate>,
    #[arg(short, long)]
    target: Option<NaiveDate>,
  },
  /// Delete a module
  ModuleDelete {
    id: String,
    #[arg(short, long)]
    force: bool,
  },
  /// Add an issue to a module
  ModuleAddIssue { module_id: String, issue_id: String },
  /// Remove an issue from a module
  ModuleRemoveIssue { module_id: String, issue_id: String },
}

/// Parse `<id>=<priority>` for `prioritize`
pub fn parse_assignment(input: &str) -> Result<(String, Priority), RunwayError> {
  let invalid = || RunwayError::InvalidAssignment(input.to_string());

  let (id, priority) = input.split_once('=').ok_or_else(invalid)?;
  let id = id.trim();
  if id.is_empty() {
    return Err(invalid());
  }
  let priority = Priority::from_str(priority.trim(), true).map_err(|_| invalid())?;

  Ok((id.to_string(), priority))
}

/// `list` limit: negative (or --all) means the whole resolution window.
fn list_limit(limit: i64, all: bool) -> u32 {
  if all || limit < 0 {
    RESOLVE_WINDOW
  } else {
    u32::try_from(limit).unwrap_or(RESOLVE_WINDOW)
  }
}

fn confirm_delete(token: &str) -> Result<bool> {
  if !std::io::stdin().is_terminal() {
    let label = format!("Delete {}? [y/N]", token);
    let answer = config::read_answer(std::io::stdin().lock(), &label)?;
    return Ok(is_yes(&answer));
  }

  Confirm::new()
    .with_prompt(format!("Delete {}?", token))
    .default(false)
    .interact()
    .map_err(|e| eyre!("Failed to read confirmation: {}", e))
}

fn is_yes(answer: &str) -> bool {
  answer.trim().eq_ignore_ascii_case("y")
}

fn print_entities(
  format: OutputFormat,
  entities: &[EntityRef],
  line: fn(&EntityRef) -> String,
) -> Result<()> {
  match format {
    OutputFormat::Json => println!("{}", output::to_json(entities)?),
    OutputFormat::Text => {
      for entity in entities {
        println!("{}", line(entity));
      }
    }
  }
  Ok(())
}

fn print_saved(format: OutputFormat, entity: &EntityRef) -> Result<()> {
  match format {
    OutputFormat::Json => println!("{}", output::to_json(entity)?),
    OutputFormat::Text => println!("{}", output::saved_line(entity)),
  }
  Ok(())
}

async fn delete(
  client: &mut CachedPlaneClient,
  format: OutputFormat,
  kind: EntityKind,
  token: &str,
  force: bool,
) -> Result<()> {
  if !force && !confirm_delete(token)? {
    println!("Aborted");
    return Ok(());
  }

  let id = client.delete(kind, token).await?;
  match format {
    OutputFormat::Json => println!("{}", output::to_json(&json!({ "deleted": id }))?),
    OutputFormat::Text => println!("✓ Deleted {}", token),
  }
  Ok(())
}

async fn membership(
  client: &mut CachedPlaneClient,
  format: OutputFormat,
  kind: EntityKind,
  group: &str,
  issue: &str,
  add: bool,
) -> Result<()> {
  let (group_id, issue_id) = if add {
    client.add_issue(kind, group, issue).await?
  } else {
    client.remove_issue(kind, group, issue).await?
  };

  match format {
    OutputFormat::Json => println!(
      "{}",
      output::to_json(&json!({
        "added": add,
        "kind": kind.to_string(),
        "group": group_id,
        "issue": issue_id
      }))?
    ),
    OutputFormat::Text => {
      let target = match kind {
        EntityKind::Module => format!("module {}", group),
        _ => group.to_string(),
      };
      if add {
        println!("✓ Added {} to {}", issue, target);
      } else {
        println!("✓ Removed {} from {}", issue, target);
      }
    }
  }
  Ok(())
}

fn non_empty(text: String) -> Option<String> {
  if text.is_empty() {
    None
  } else {
    Some(text)
  }
}

/// Execute one subcommand.
pub async fn run(
  command: Command,
  client: &mut CachedPlaneClient,
  format: OutputFormat,
) -> Result<()> {
  match command {
    Command::List {
      limit,
      all,
      priority,
    } => {
      let mut issues = client
        .list(EntityKind::Issue, Some(list_limit(limit, all)))
        .await?;
      if let Some(priority) = priority {
        issues.retain(|i| i.attr_str("priority") == Some(priority.as_str()));
      }
      print_entities(format, &issues, output::issue_line)?;
      if all && format == OutputFormat::Text {
        println!("\n{} issues total", issues.len());
      }
    }
    Command::Stats => {
      let issues = client.list(EntityKind::Issue, Some(RESOLVE_WINDOW)).await?;
      let cycles = client.list(EntityKind::Cycle, None).await?;
      let stats = Stats::collect(&issues, cycles.len());
      match format {
        OutputFormat::Json => println!("{}", output::to_json(&stats)?),
        OutputFormat::Text => {
          for line in stats.lines() {
            println!("{}", line);
          }
        }
      }
    }
    Command::Get { id } => {
      let issue = client.get(EntityKind::Issue, &id).await?;
      println!("{}", output::to_json(&issue)?);
    }
    Command::Create {
      title,
      description,
      priority,
      parent,
    } => {
      let issue = NewIssue {
        name: title,
        description_html: non_empty(description).map(|d| paragraph_html(&d)),
        priority,
        parent,
      };
      let created = client.create_issue(issue).await?;
      print_saved(format, &created)?;
    }
    Command::Quick { title } => {
      let created = client
        .create_issue(NewIssue {
          name: title,
          ..Default::default()
        })
        .await?;
      print_saved(format, &created)?;
    }
    Command::Update {
      id,
      title,
      priority,
      state,
      parent,
      no_parent,
    } => {
      let state = match state {
        Some(name) => {
          let found = client.state_id(name).await?;
          if found.is_none() {
            tracing::warn!(state = name.key(), "project has no such state, ignoring");
          }
          found
        }
        None => None,
      };
      let update = IssueUpdate {
        name: title,
        priority,
        state,
        parent: if no_parent { Some(None) } else { parent.map(Some) },
      };
      if update.is_empty() {
        return Err(RunwayError::NoUpdates.into());
      }
      let updated = client.update_issue(&id, update).await?;
      print_saved(format, &updated)?;
    }
    Command::Delete { id, force } => delete(client, format, EntityKind::Issue, &id, force).await?,
    Command::Prioritize { assignments } => {
      let outcomes = client.batch_update_priority(&assignments).await?;
      match format {
        OutputFormat::Json => {
          let rows: Vec<_> = outcomes
            .iter()
            .map(|o| {
              json!({
                "id": o.issue.id,
                "name": o.issue.name,
                "priority": o.priority,
                "ok": o.succeeded(),
                "error": o.error
              })
            })
            .collect();
          println!("{}", output::to_json(&rows)?);
        }
        OutputFormat::Text => {
          for outcome in &outcomes {
            let line = output::issue_line(&outcome.issue);
            match &outcome.error {
              None => println!("✓ {} → {}", line, outcome.priority),
              Some(e) => println!("✗ {} ({})", line, e),
            }
          }
          let updated = outcomes.iter().filter(|o| o.succeeded()).count();
          println!("\n{} of {} updated", updated, outcomes.len());
        }
      }
    }

    Command::Cycles => {
      let cycles = client.list(EntityKind::Cycle, None).await?;
      print_entities(format, &cycles, output::cycle_line)?;
    }
    Command::CycleGet { id } => {
      let cycle = client.get(EntityKind::Cycle, &id).await?;
      println!("{}", output::to_json(&cycle)?);
    }
    Command::CycleCreate {
      name,
      description,
      start,
      end,
    } => {
      let cycle = NewCycle {
        name,
        description: non_empty(description),
        start_date: start,
        end_date: end,
        ..Default::default()
      };
      let created = client.create_cycle(cycle).await?;
      print_saved(format, &created)?;
    }
    Command::CycleUpdate {
      id,
      name,
      description,
      start,
      end,
    } => {
      let update = CycleUpdate {
        name,
        description,
        start_date: start,
        end_date: end,
      };
      if update.is_empty() {
        return Err(RunwayError::NoUpdates.into());
      }
      let updated = client.update(EntityKind::Cycle, &id, &update).await?;
      print_saved(format, &updated)?;
    }
    Command::CycleDelete { id, force } => delete(client, format, EntityKind::Cycle, &id, force).await?,
    Command::CycleAddIssue { cycle_id, issue_id } => {
      membership(client, format, EntityKind::Cycle, &cycle_id, &issue_id, true).await?
    }
    Command::CycleRemoveIssue { cycle_id, issue_id } => {
      membership(client, format, EntityKind::Cycle, &cycle_id, &issue_id, false).await?
    }

    Command::Modules => {
      let modules = client.list(EntityKind::Module, None).await?;
      print_entities(format, &modules, output::module_line)?;
    }
    Command::ModuleGet { id } => {
      let module = client.get(EntityKind::Module, &id).await?;
      println!("{}", output::to_json(&module)?);
    }
    Command::ModuleCreate {
      name,
      description,
      start,
      target,
    } => {
      let module = NewModule {
        name,
        description: non_empty(description),
        start_date: start,
        target_date: target,
      };
      let created = client.create_module(module).await?;
      print_saved(format, &created)?;
    }
    Command::ModuleUpdate {
      id,
      name,
      description,
      start,
      target,
    } => {
      let update = ModuleUpdate {
        name,
        description,
        start_date: start,
        target_date: target,
      };
      if update.is_empty() {
        return Err(RunwayError::NoUpdates.into());
      }
      let updated = client.update(EntityKind::Module, &id, &update).await?;
      print_saved(format, &updated)?;
    }
    Command::ModuleDelete { id, force } => delete(client, format, EntityKind::Module, &id, force).await?,
    Command::ModuleAddIssue {
      module_id,
      issue_id,
    } => membership(client, format, EntityKind::Module, &module_id, &issue_id, true).await?,
    Command::ModuleRemoveIssue {
      module_id,
      issue_id,
    } => membership(client, format, EntityKind::Module, &module_id, &issue_id, false).await?,
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_assignment() {
    assert_eq!(
      parse_assignment("abc1=urgent").unwrap(),
      ("abc1".to_string(), Priority::Urgent)
    );
    assert_eq!(
      parse_assignment(" def = High ").unwrap(),
      ("def".to_string(), Priority::High)
    );
  }

  #[test]
  fn test_parse_assignment_rejects_malformed() {
    assert!(parse_assignment("abc1").is_err());
    assert!(parse_assignment("=low").is_err());
    assert!(parse_assignment("abc1=asap").is_err());
  }

  #[test]
  fn test_list_limit() {
    assert_eq!(list_limit(20, false), 20);
    assert_eq!(list_limit(-1, false), RESOLVE_WINDOW);
    assert_eq!(list_limit(5, true), RESOLVE_WINDOW);
  }

  #[test]
  fn test_piped_confirmation() {
    let answer = config::read_answer(std::io::Cursor::new("y\n"), "Delete abc? [y/N]").unwrap();
    assert!(is_yes(&answer));
    let answer = config::read_answer(std::io::Cursor::new("Y"), "Delete abc? [y/N]").unwrap();
    assert!(is_yes(&answer));

    // End of input or anything else declines
    let answer = config::read_answer(std::io::Cursor::new(""), "Delete abc? [y/N]").unwrap();
    assert!(!is_yes(&answer));
    assert!(!is_yes("yes please"));
    assert!(!is_yes("n"));
  }

  #[test]
  fn test_non_empty() {
    assert_eq!(non_empty(String::new()), None);
    assert_eq!(non_empty("x".to_string()).as_deref(), Some("x"));
  }
}
