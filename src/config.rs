use crate::{
    reminders::{REMINDER_COOLDOWN_DAYS, REMINDER_INTERVAL_DAYS},
    search::HttpAiRanker,
    storage::{self, StorageManager},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Default timeout for the AI ranking call.
const DEFAULT_AI_TIMEOUT_SECS: u64 = 10;

/// Configuration for the external AI search collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiSearchConfig {
    /// Enable or disable the `ai:` query mode.
    #[serde(default)]
    pub enabled: bool,

    /// Ranking endpoint. Required when enabled.
    #[serde(default)]
    pub endpoint: String,

    /// Request timeout in seconds. No timely answer counts as a failed
    /// call and the local match takes over.
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional basic auth for the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for AiSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
            username: None,
            password: None,
        }
    }
}

impl AiSearchConfig {
    /// Build the HTTP ranker, or None when AI search is not usable.
    pub fn ranker(&self) -> Option<HttpAiRanker> {
        if !self.enabled || self.endpoint.is_empty() {
            return None;
        }

        let mut ranker = HttpAiRanker::new(&self.endpoint, self.timeout_secs);
        if let Some(username) = self.username.clone() {
            ranker = ranker.with_basic_auth(username, self.password.clone());
        }

        Some(ranker)
    }
}

fn default_ai_timeout_secs() -> u64 {
    DEFAULT_AI_TIMEOUT_SECS
}

/// Reminder scheduling knobs. The defaults are the product behavior;
/// overrides exist for deployments that want a different cadence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_interval_days")]
    pub interval_days: i64,

    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_days: REMINDER_INTERVAL_DAYS,
            cooldown_days: REMINDER_COOLDOWN_DAYS,
        }
    }
}

fn default_interval_days() -> i64 {
    REMINDER_INTERVAL_DAYS
}

fn default_cooldown_days() -> i64 {
    REMINDER_COOLDOWN_DAYS
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: ReminderConfig,

    #[serde(default)]
    pub ai_search: AiSearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    fn validate(&self) {
        if self.reminders.interval_days < 1 {
            panic!(
                "reminders.interval_days must be at least 1, got {}",
                self.reminders.interval_days
            );
        }

        if self.reminders.cooldown_days < 1 {
            panic!(
                "reminders.cooldown_days must be at least 1, got {}",
                self.reminders.cooldown_days
            );
        }

        if self.ai_search.enabled && self.ai_search.endpoint.is_empty() {
            panic!("ai_search.enabled requires ai_search.endpoint to be set");
        }

        if self.ai_search.timeout_secs == 0 {
            panic!("ai_search.timeout_secs must be greater than 0");
        }
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            store.write(
                "config.yaml",
                serde_yml::to_string(&Self::default())
                    .context("serializing default config")?
                    .as_bytes(),
            )?;
        }

        let config_str = String::from_utf8(store.read("config.yaml")?)
            .context("config file is not valid utf8")?;
        let mut config: Self =
            serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write("config.yaml", config_str.as_bytes())?;

        Ok(())
    }
}
