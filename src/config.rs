// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required fields and provides sensible defaults for optional ones
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub responses: ResponseConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the live platform API
    pub api_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Channel whose live streams are monitored
    pub channel_id: String,
    /// The bot's own channel ids, used to drop its own messages
    #[serde(default)]
    pub bot_channel_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Phrases that trigger on a single occurrence
    #[serde(default)]
    pub phrases: Vec<String>,
    /// Keywords counted toward the occurrence threshold
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_user_cooldown_secs")]
    pub user_cooldown_secs: u64,
    /// Flag file watched for the manual "check now" signal
    #[serde(default = "default_trigger_file")]
    pub flag_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Completion endpoint for the primary generator; fallback-only if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_url: Option<String>,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            generator_url: None,
            greeting: default_greeting(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// User ids allowed to run moderation commands
    #[serde(default)]
    pub moderators: Vec<String>,
    #[serde(default = "default_events_path")]
    pub events_path: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            moderators: Vec::new(),
            events_path: default_events_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_chat_poll_secs")]
    pub chat_poll_secs: u64,
    /// Floor applied to the platform's polling hint
    #[serde(default = "default_chat_poll_floor_secs")]
    pub chat_poll_floor_secs: u64,
    #[serde(default = "default_viewer_poll_secs")]
    pub viewer_poll_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chat_poll_secs: default_chat_poll_secs(),
            chat_poll_floor_secs: default_chat_poll_floor_secs(),
            viewer_poll_secs: default_viewer_poll_secs(),
        }
    }
}

fn default_user_cooldown_secs() -> u64 {
    60
}

fn default_trigger_file() -> String {
    "warden.trigger".to_string()
}

fn default_greeting() -> String {
    "Warden online. Keeping an eye on chat.".to_string()
}

fn default_events_path() -> String {
    "moderation_events.jsonl".to_string()
}

fn default_chat_poll_secs() -> u64 {
    5
}

fn default_chat_poll_floor_secs() -> u64 {
    2
}

fn default_viewer_poll_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no env overrides, no validation)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WARDEN_API_BASE") {
            self.platform.api_base = val;
        }
        if let Ok(val) = std::env::var("WARDEN_API_KEY") {
            self.platform.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("WARDEN_CHANNEL_ID") {
            self.platform.channel_id = val;
        }
        if let Ok(val) = std::env::var("WARDEN_BOT_CHANNEL_IDS") {
            self.platform.bot_channel_ids = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(val) = std::env::var("WARDEN_TRIGGER_FILE") {
            self.triggers.flag_file = val;
        }
        if let Ok(val) = std::env::var("WARDEN_GENERATOR_URL") {
            self.responses.generator_url = Some(val);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform.api_base.trim().is_empty() {
            anyhow::bail!(
                "platform.api_base is required (set in config file or WARDEN_API_BASE env var)"
            );
        }
        if self.platform.channel_id.trim().is_empty() {
            anyhow::bail!(
                "platform.channel_id is required (set in config file or WARDEN_CHANNEL_ID env var)"
            );
        }
        if self
            .platform
            .api_key
            .as_deref()
            .unwrap_or("")
            .trim()
            .is_empty()
        {
            anyhow::bail!(
                "platform.api_key is required (set in config file or WARDEN_API_KEY env var)"
            );
        }
        let has_patterns = self
            .triggers
            .phrases
            .iter()
            .chain(self.triggers.keywords.iter())
            .any(|p| !p.trim().is_empty());
        if !has_patterns {
            anyhow::bail!("triggers must define at least one phrase or keyword");
        }
        if self.session.chat_poll_floor_secs == 0 {
            anyhow::bail!("session.chat_poll_floor_secs must be at least 1");
        }
        Ok(())
    }

    /// Convert bot_channel_ids Vec to HashSet for efficient lookups
    pub fn bot_channel_id_set(&self) -> HashSet<String> {
        self.platform.bot_channel_ids.iter().cloned().collect()
    }

    /// Moderator allowlist as a set
    pub fn moderator_set(&self) -> HashSet<String> {
        self.moderation.moderators.iter().cloned().collect()
    }

    pub fn user_cooldown(&self) -> Duration {
        Duration::from_secs(self.triggers.user_cooldown_secs)
    }

    pub fn chat_poll_default(&self) -> Duration {
        Duration::from_secs(self.session.chat_poll_secs)
    }

    pub fn chat_poll_floor(&self) -> Duration {
        Duration::from_secs(self.session.chat_poll_floor_secs)
    }

    pub fn viewer_poll(&self) -> Duration {
        Duration::from_secs(self.session.viewer_poll_secs)
    }
}
