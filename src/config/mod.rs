use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use anyhow::{Result, Context};

pub const API_KEY_ENV: &str = "JULEP_API_KEY";
pub const BASE_URL_ENV: &str = "JULEP_BASE_URL";
pub const MODEL_ENV: &str = "JULEP_MODEL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub poll: PollSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_agent_about")]
    pub about: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "https://api.julep.ai/api".to_string() }
fn default_model() -> String { "gpt-4o".to_string() }
fn default_agent_name() -> String { "pdf-rdf-analyzer".to_string() }
fn default_agent_about() -> String {
    "You analyze PDF documents and RDF data to answer questions.".to_string()
}
fn default_request_timeout() -> u64 { 120 }
fn default_poll_interval() -> u64 { 1 }
fn default_poll_timeout() -> u64 { 300 }

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            name: default_agent_name(),
            about: default_agent_about(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            timeout_secs: default_poll_timeout(),
        }
    }
}

impl Configuration {
    /// Load configuration from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        Ok(config)
    }

    /// Load configuration from the environment alone
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.fill_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Fill unset values from environment variables
    pub fn fill_from_env(&mut self) {
        if self.agent.api_key.is_none() {
            self.agent.api_key = env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        if let Ok(url) = env::var(BASE_URL_ENV) {
            self.agent.base_url = url;
        }
        if let Ok(model) = env::var(MODEL_ENV) {
            self.agent.model = model;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.agent.api_key.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!("{} environment variable is not set", API_KEY_ENV);
        }

        if self.agent.base_url.is_empty() {
            anyhow::bail!("No base URL configured for the agent API");
        }

        if self.agent.model.is_empty() {
            anyhow::bail!("No model configured for the agent");
        }

        if self.agent.name.is_empty() {
            anyhow::bail!("No agent name configured");
        }

        Ok(())
    }

    /// Create an example configuration
    pub fn example() -> Self {
        Configuration {
            agent: AgentSettings {
                base_url: default_base_url(),
                api_key: None,
                model: default_model(),
                name: "pdf-rdf-analyzer".to_string(),
                about: default_agent_about(),
                request_timeout_secs: default_request_timeout(),
            },
            poll: PollSettings::default(),
        }
    }
}
