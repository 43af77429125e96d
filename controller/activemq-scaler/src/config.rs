//! Configuration for the standalone ActiveMQ scaler binary

use crate::metadata::TriggerConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the ActiveMQ scaler host
#[derive(Debug, Clone, Parser)]
#[command(name = "activemq-scaler")]
#[command(about = "Polls an ActiveMQ queue and reports its depth as a scaling metric")]
pub struct Config {
    /// Trigger definition (YAML or JSON) with triggerMetadata, authParams and resolvedEnv
    #[arg(long, env)]
    pub trigger_file: PathBuf,

    /// Overrides the scalerIndex from the trigger file
    #[arg(long, env)]
    pub scaler_index: Option<usize>,

    /// HTTP timeout for management endpoint requests, overrides the trigger file
    #[arg(long, env)]
    pub http_timeout_ms: Option<u64>,

    /// Seconds between polls
    #[arg(long, env, default_value_t = 30)]
    pub poll_interval_secs: u64,

    /// Poll once and exit
    #[arg(long, env)]
    pub once: bool,

    /// Output logs in JSON format
    #[arg(long, env)]
    pub log_json: bool,
}

impl Config {
    /// Parse configuration from command-line args and environment variables
    pub fn parse_config() -> Self {
        Config::parse()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Read the trigger file and apply command-line overrides and the process environment
    pub fn load_trigger_config(&self) -> Result<TriggerConfig> {
        let content = fs::read_to_string(&self.trigger_file).with_context(|| {
            format!("Failed to read trigger file {}", self.trigger_file.display())
        })?;
        let trigger: TriggerConfig =
            serde_yaml::from_str(&content).context("Failed to parse trigger file")?;

        Ok(self.apply_overrides(trigger, std::env::vars()))
    }

    /// Apply overrides; `env` fills resolvedEnv only when the trigger file has none
    pub fn apply_overrides(
        &self,
        mut trigger: TriggerConfig,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> TriggerConfig {
        if let Some(index) = self.scaler_index {
            trigger.scaler_index = index;
        }
        if let Some(timeout_ms) = self.http_timeout_ms {
            trigger.global_http_timeout_ms = timeout_ms;
        }
        if trigger.resolved_env.is_empty() {
            trigger.resolved_env = env.into_iter().collect();
        }
        trigger
    }
}
