//! Agency configuration.
//!
//! Limits and paths for one agency. Every field has a default, so an empty
//! YAML document is a valid configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::AgencyError;
use crate::agent::DEFAULT_MAX_ITERATIONS;
use crate::tools::shell_tool::DEFAULT_SHELL_TIMEOUT_MS;

fn default_max_handoffs() -> u32 {
    10
}

fn default_max_turns() -> u32 {
    25
}

fn default_max_consecutive_denials() -> u32 {
    3
}

fn default_max_agent_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_shell_timeout_ms() -> u64 {
    DEFAULT_SHELL_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgencyConfig {
    /// Handoffs allowed per `process()` call; a parallel handoff costs one
    /// per target.
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs: u32,
    /// Agent invocations allowed per `process()` call.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Denied handoffs in a row before giving up.
    #[serde(default = "default_max_consecutive_denials")]
    pub max_consecutive_denials: u32,
    /// Model calls per agent invocation, unless the agent sets its own.
    #[serde(default = "default_max_agent_iterations")]
    pub max_agent_iterations: u32,
    #[serde(default = "default_shell_timeout_ms")]
    pub shell_timeout_ms: u64,
    /// Root the file tools are confined to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            max_handoffs: default_max_handoffs(),
            max_turns: default_max_turns(),
            max_consecutive_denials: default_max_consecutive_denials(),
            max_agent_iterations: default_max_agent_iterations(),
            shell_timeout_ms: default_shell_timeout_ms(),
            work_dir: None,
        }
    }
}

impl AgencyConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, AgencyError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AgencyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Apply `AGENCY_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> Result<Self, AgencyError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, AgencyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "AGENCY_MAX_HANDOFFS")? {
            self.max_handoffs = v;
        }
        if let Some(v) = parse_var(&lookup, "AGENCY_MAX_TURNS")? {
            self.max_turns = v;
        }
        if let Some(v) = parse_var(&lookup, "AGENCY_MAX_CONSECUTIVE_DENIALS")? {
            self.max_consecutive_denials = v;
        }
        if let Some(v) = parse_var(&lookup, "AGENCY_MAX_AGENT_ITERATIONS")? {
            self.max_agent_iterations = v;
        }
        if let Some(v) = parse_var(&lookup, "AGENCY_SHELL_TIMEOUT_MS")? {
            self.shell_timeout_ms = v;
        }
        if let Some(dir) = lookup("AGENCY_WORK_DIR").filter(|d| !d.trim().is_empty()) {
            self.work_dir = Some(PathBuf::from(dir));
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AgencyError> {
        if self.max_turns == 0 {
            return Err(AgencyError::Config("max_turns must be at least 1".into()));
        }
        if self.max_consecutive_denials == 0 {
            return Err(AgencyError::Config(
                "max_consecutive_denials must be at least 1".into(),
            ));
        }
        if self.max_agent_iterations == 0 {
            return Err(AgencyError::Config(
                "max_agent_iterations must be at least 1".into(),
            ));
        }
        if self.shell_timeout_ms == 0 {
            return Err(AgencyError::Config("shell_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, AgencyError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AgencyError::Config(format!("{}: '{}' is not a valid number", key, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AgencyConfig::default();
        assert_eq!(config.max_handoffs, 10);
        assert_eq!(config.max_turns, 25);
        assert_eq!(config.max_consecutive_denials, 3);
        assert_eq!(config.max_agent_iterations, 15);
        assert_eq!(config.shell_timeout_ms, 120_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AgencyConfig::from_yaml_str("max_handoffs: 2\nwork_dir: /tmp/agency\n").unwrap();
        assert_eq!(config.max_handoffs, 2);
        assert_eq!(config.max_turns, 25);
        assert_eq!(config.work_dir, Some(PathBuf::from("/tmp/agency")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = AgencyConfig::from_yaml_str("max_handofs: 2\n").unwrap_err();
        assert!(matches!(err, AgencyError::Yaml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_turns: 7").unwrap();
        let config = AgencyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_turns, 7);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AGENCY_MAX_HANDOFFS", "4"),
            ("AGENCY_SHELL_TIMEOUT_MS", " 500 "),
            ("AGENCY_WORK_DIR", "/srv/work"),
        ]
        .into_iter()
        .collect();
        let config = AgencyConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_handoffs, 4);
        assert_eq!(config.shell_timeout_ms, 500);
        assert_eq!(config.work_dir, Some(PathBuf::from("/srv/work")));

        let err = AgencyConfig::default()
            .with_overrides(|k| (k == "AGENCY_MAX_TURNS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("AGENCY_MAX_TURNS"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = AgencyConfig {
            max_turns: 0,
            ..AgencyConfig::default()
        };
        assert!(matches!(config.validate(), Err(AgencyError::Config(_))));
    }
}
