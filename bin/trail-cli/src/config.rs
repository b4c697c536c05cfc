use std::fs;
use std::path::Path;

use anyhow::Context;
use cloudtrail_runinstances::BatchPolicy;
use serde::Deserialize;

/// Settings after layering defaults, the config file, and command-line flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliConfig {
    pub batch_policy: BatchPolicy,
    pub log_filter: String,
    pub pretty: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::FailFast,
            log_filter: "warn".to_string(),
            pretty: true,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub batch_policy: Option<BatchPolicy>,
    #[serde(default)]
    pub log_filter: Option<String>,
    #[serde(default)]
    pub pretty: Option<bool>,
}

impl CliConfig {
    pub fn layered(
        file: Option<FileConfig>,
        policy_flag: Option<BatchPolicy>,
        compact_flag: bool,
    ) -> Self {
        let mut cfg = CliConfig::default();

        if let Some(file) = file {
            if let Some(policy) = file.batch_policy {
                cfg.batch_policy = policy;
            }
            if let Some(filter) = file.log_filter.filter(|f| !f.trim().is_empty()) {
                cfg.log_filter = filter;
            }
            if let Some(pretty) = file.pretty {
                cfg.pretty = pretty;
            }
        }

        if let Some(policy) = policy_flag {
            cfg.batch_policy = policy;
        }
        if compact_flag {
            cfg.pretty = false;
        }

        cfg
    }
}

pub fn load_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_file_config(&raw).with_context(|| format!("failed to parse config file {}", path.display()))
}

pub fn parse_file_config(raw: &str) -> anyhow::Result<FileConfig> {
    if raw.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    Ok(serde_yml::from_str(raw)?)
}
