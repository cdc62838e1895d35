use color_eyre::{eyre::eyre, Result};
use dialoguer::Input;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};

use crate::error::RunwayError;

pub const DEFAULT_BASE_URL: &str = "https://api.plane.so";

const ENV_API_KEY: &str = "PLANE_API_KEY";
const ENV_BASE_URL: &str = "PLANE_BASE_URL";
const ENV_WORKSPACE: &str = "PLANE_WORKSPACE";
const ENV_PROJECT_ID: &str = "PLANE_PROJECT_ID";

/// Settings as stored on disk. Every field may be missing; `credentials()`
/// decides whether enough is present to talk to the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
  /// Plane instance root (defaults to Plane Cloud)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,
  /// Workspace slug
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workspace: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub project_id: Option<String>,
}

/// Validated settings needed by the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
  pub api_key: String,
  pub base_url: String,
  pub workspace: String,
  pub project_id: String,
}

/// Raw answers from the `--configure` prompts. Empty answers keep the
/// existing value.
#[derive(Debug, Clone, Default)]
pub struct ConfigAnswers {
  pub api_key: String,
  pub base_url: String,
  pub workspace: String,
  pub project_id: String,
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./runway.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/runway/config.yaml
  ///
  /// A missing file is not an error here; the environment may supply
  /// everything.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => {
        tracing::debug!(path = %p.display(), "loading config");
        Self::load_from_path(&p)?
      }
      None => Config::default(),
    };

    Ok(config.overlay(|key| std::env::var(key).ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("runway.yaml");
    if local.exists() {
      return Some(local);
    }

    Self::default_path().ok().filter(|p| p.exists())
  }

  /// Where `--configure` writes when no explicit path is given.
  pub fn default_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
      .ok_or_else(|| eyre!("Could not determine config directory"))?;

    Ok(config_dir.join("runway").join("config.yaml"))
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Override file values with whatever `lookup` returns for the `PLANE_*`
  /// variables. Empty values are ignored.
  pub fn overlay<F>(mut self, lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_API_KEY) {
      self.api_key = Some(v);
    }
    if let Some(v) = get(ENV_BASE_URL) {
      self.base_url = Some(v);
    }
    if let Some(v) = get(ENV_WORKSPACE) {
      self.workspace = Some(v);
    }
    if let Some(v) = get(ENV_PROJECT_ID) {
      self.project_id = Some(v);
    }
    self
  }

  pub fn base_url(&self) -> &str {
    self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
  }

  /// Check that API key, workspace and project are all set.
  pub fn credentials(&self) -> std::result::Result<Credentials, RunwayError> {
    fn present(v: &Option<String>) -> Option<&str> {
      v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    let api_key = present(&self.api_key);
    let workspace = present(&self.workspace);
    let project_id = present(&self.project_id);

    match (api_key, workspace, project_id) {
      (Some(api_key), Some(workspace), Some(project_id)) => Ok(Credentials {
        api_key: api_key.to_string(),
        base_url: self.base_url().trim_end_matches('/').to_string(),
        workspace: workspace.to_string(),
        project_id: project_id.to_string(),
      }),
      _ => {
        let missing = [
          ("api_key", api_key),
          ("workspace", workspace),
          ("project_id", project_id),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect();
        Err(RunwayError::NotConfigured { missing })
      }
    }
  }

  /// Merge prompt answers into this config.
  pub fn apply_answers(&self, answers: ConfigAnswers) -> Config {
    fn pick(answer: String, existing: &Option<String>) -> Option<String> {
      let answer = answer.trim();
      if answer.is_empty() {
        existing.clone()
      } else {
        Some(answer.to_string())
      }
    }

    Config {
      api_key: pick(answers.api_key, &self.api_key),
      base_url: pick(answers.base_url, &self.base_url),
      workspace: pick(answers.workspace, &self.workspace),
      project_id: pick(answers.project_id, &self.project_id),
    }
  }

  /// Write the config as YAML, readable by the owner only.
  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }

    let contents =
      serde_yaml::to_string(self).map_err(|e| eyre!("Failed to serialize config: {}", e))?;
    std::fs::write(path, contents)
      .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| eyre!("Failed to restrict permissions on {}: {}", path.display(), e))?;
    }

    Ok(())
  }
}

/// Interactive `--configure` flow. Returns the path written.
pub fn configure(explicit_path: Option<&Path>) -> Result<PathBuf> {
  let path = match explicit_path {
    Some(p) => p.to_path_buf(),
    None => Config::default_path()?,
  };
  let existing = if path.exists() {
    Config::load_from_path(&path)?
  } else {
    Config::default()
  };

  println!("Runway Configuration\n{}", "=".repeat(40));

  let answers = ConfigAnswers {
    api_key: prompt(&format!("API Key [{}...]", mask_key(existing.api_key.as_deref())))?,
    base_url: prompt(&format!("Base URL [{}]", existing.base_url()))?,
    workspace: prompt(&format!(
      "Workspace [{}]",
      existing.workspace.as_deref().unwrap_or("")
    ))?,
    project_id: prompt(&format!(
      "Project ID [{}]",
      existing.project_id.as_deref().unwrap_or("")
    ))?,
  };

  let config = existing.apply_answers(answers);
  config.credentials()?;
  config.save(&path)?;

  Ok(path)
}

fn prompt(label: &str) -> Result<String> {
  if !std::io::stdin().is_terminal() {
    return read_answer(std::io::stdin().lock(), label);
  }

  Input::<String>::new()
    .with_prompt(label)
    .allow_empty(true)
    .interact_text()
    .map_err(|e| eyre!("Failed to read input: {}", e))
}

/// Line-based prompt for piped input. The label goes to stderr; end of
/// input reads as an empty answer.
pub fn read_answer<R: BufRead>(mut input: R, label: &str) -> Result<String> {
  eprint!("{}: ", label);
  let mut line = String::new();
  input
    .read_line(&mut line)
    .map_err(|e| eyre!("Failed to read input: {}", e))?;
  Ok(line.trim().to_string())
}

/// First 8 characters of the key, enough to recognize it.
fn mask_key(key: Option<&str>) -> String {
  key.unwrap_or("").chars().take(8).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn full_config() -> Config {
    Config {
      api_key: Some("plane_api_0123456789".to_string()),
      base_url: None,
      workspace: Some("acme".to_string()),
      project_id: Some("4af5b0e2-3c1d-4b8e-9f00-1a2b3c4d5e6f".to_string()),
    }
  }

  #[test]
  fn test_credentials_default_base_url() {
    let creds = full_config().credentials().unwrap();
    assert_eq!(creds.base_url, DEFAULT_BASE_URL);
    assert_eq!(creds.workspace, "acme");
  }

  #[test]
  fn test_credentials_trims_trailing_slash() {
    let config = Config {
      base_url: Some("https://plane.example.com/".to_string()),
      ..full_config()
    };
    assert_eq!(
      config.credentials().unwrap().base_url,
      "https://plane.example.com"
    );
  }

  #[test]
  fn test_credentials_reports_missing() {
    let config = Config {
      api_key: Some("  ".to_string()),
      project_id: None,
      ..full_config()
    };
    match config.credentials() {
      Err(RunwayError::NotConfigured { missing }) => {
        assert_eq!(missing, vec!["api_key", "project_id"]);
      }
      other => panic!("expected NotConfigured, got {:?}", other),
    }
  }

  #[test]
  fn test_env_overrides_file_values() {
    let env: HashMap<&str, &str> = [
      ("PLANE_API_KEY", "from-env"),
      ("PLANE_WORKSPACE", ""),
      ("PLANE_BASE_URL", "http://localhost:8000"),
    ]
    .into_iter()
    .collect();

    let config = full_config().overlay(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(config.api_key.as_deref(), Some("from-env"));
    // Empty variables don't clobber the file
    assert_eq!(config.workspace.as_deref(), Some("acme"));
    assert_eq!(config.base_url(), "http://localhost:8000");
  }

  #[test]
  fn test_apply_answers_keeps_existing_on_empty() {
    let merged = full_config().apply_answers(ConfigAnswers {
      api_key: String::new(),
      base_url: " ".to_string(),
      workspace: "other".to_string(),
      project_id: String::new(),
    });
    assert_eq!(merged.api_key, full_config().api_key);
    assert_eq!(merged.base_url, None);
    assert_eq!(merged.workspace.as_deref(), Some("other"));
    assert_eq!(merged.project_id, full_config().project_id);
  }

  #[test]
  fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yaml");

    full_config().save(&path).unwrap();
    let loaded = Config::load_from_path(&path).unwrap();
    assert_eq!(loaded, full_config());

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let mode = std::fs::metadata(&path).unwrap().permissions().mode();
      assert_eq!(mode & 0o777, 0o600);
    }
  }

  #[test]
  fn test_load_explicit_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_read_answer_from_piped_input() {
    let mut input = std::io::Cursor::new("  new-key  \n\nacme\n");
    assert_eq!(read_answer(&mut input, "API Key").unwrap(), "new-key");
    assert_eq!(read_answer(&mut input, "Base URL").unwrap(), "");
    assert_eq!(read_answer(&mut input, "Workspace").unwrap(), "acme");
    // Exhausted input keeps the existing value
    assert_eq!(read_answer(&mut input, "Project ID").unwrap(), "");
  }

  #[test]
  fn test_mask_key() {
    assert_eq!(mask_key(Some("plane_api_0123")), "plane_ap");
    assert_eq!(mask_key(None), "");
  }
}
