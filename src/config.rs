use crate::error::BracketError;
use crate::types::{DEFAULT_SWISS_ROUND_COUNT, ENOUGH_TEAMS_TO_START, SIMULATION_ITERATION_CAP};
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs,
    path::Path,
};

/// Engine-wide knobs shared by every bracket of a tournament.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
  /// Replay elimination previews to completion for display.
  pub simulate_brackets: bool,
  pub enough_teams_to_start: usize,
  pub swiss_default_round_count: u32,
  pub simulation_iteration_cap: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    EngineConfig {
      simulate_brackets: false,
      enough_teams_to_start: ENOUGH_TEAMS_TO_START,
      swiss_default_round_count: DEFAULT_SWISS_ROUND_COUNT,
      simulation_iteration_cap: SIMULATION_ITERATION_CAP,
    }
  }
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn is_truthy(value: &str) -> bool {
  let value = value.trim().to_ascii_lowercase();
  matches!(value.as_str(), "1" | "true" | "yes" | "on")
}

pub fn apply_env_defaults(config: EngineConfig) -> EngineConfig {
  apply_env_with(config, env_default)
}

/// Layers `BRACKET_*` overrides on top of `config` using `lookup` to read variables.
pub fn apply_env_with<F>(mut config: EngineConfig, lookup: F) -> EngineConfig
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(value) = lookup("BRACKET_SIMULATE") {
    config.simulate_brackets = is_truthy(&value);
  }
  if let Some(value) = lookup("BRACKET_ENOUGH_TEAMS") {
    match value.trim().parse::<usize>() {
      Ok(count) => config.enough_teams_to_start = count,
      Err(e) => tracing::warn!("ignoring BRACKET_ENOUGH_TEAMS={value}: {e}"),
    }
  }
  if let Some(value) = lookup("BRACKET_SWISS_ROUND_COUNT") {
    match value.trim().parse::<u32>() {
      Ok(count) if count > 0 => config.swiss_default_round_count = count,
      Ok(_) => tracing::warn!("ignoring BRACKET_SWISS_ROUND_COUNT=0"),
      Err(e) => tracing::warn!("ignoring BRACKET_SWISS_ROUND_COUNT={value}: {e}"),
    }
  }
  config
}

pub fn load_config_from(path: &Path) -> Result<EngineConfig, BracketError> {
  if !path.is_file() {
    return Ok(apply_env_defaults(EngineConfig::default()));
  }
  let data = fs::read_to_string(path)
    .map_err(|e| BracketError::Config(format!("read config {}: {e}", path.display())))?;
  let config = serde_json::from_str::<EngineConfig>(&data)
    .map_err(|e| BracketError::Config(format!("parse config {}: {e}", path.display())))?;
  Ok(apply_env_defaults(config))
}

pub fn save_config_to(path: &Path, config: &EngineConfig) -> Result<(), BracketError> {
  let payload = serde_json::to_string_pretty(config).map_err(|e| BracketError::Config(e.to_string()))?;
  fs::write(path, payload)
    .map_err(|e| BracketError::Config(format!("write config {}: {e}", path.display())))
}

/// Reads `KEY=value` lines into the process environment without
/// overwriting variables that are already set.
pub fn load_env_file(path: &Path) {
  if !path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(path) {
    Ok(data) => data,
    Err(e) => {
      tracing::warn!("read env file {}: {e}", path.display());
      return;
    }
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}
