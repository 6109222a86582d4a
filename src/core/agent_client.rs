use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::config::PollSettings;

#[derive(Debug, Error)]
pub enum AgentApiError {
    #[error("invalid API credential: {0}")]
    InvalidCredential(#[from] reqwest::header::InvalidHeaderValue),

    #[error("request to agent API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("agent API error {status}: {detail}")]
    Api {
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("execution {id} did not reach a terminal status within {waited_secs}s")]
    ExecutionTimeout { id: String, waited_secs: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// One prompt step of a task definition, with the declared output shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStep {
    pub prompt: Vec<ChatMessage>,
    #[serde(rename = "return")]
    pub expected_output: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub about: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Starting,
    Running,
    AwaitingInput,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CreateAgentRequest<'a> {
    name: &'a str,
    model: &'a str,
    about: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    name: &'a str,
    description: &'a str,
    main: &'a [TaskStep],
}

#[derive(Debug, Serialize)]
struct CreateExecutionRequest<'a> {
    input: &'a Value,
}

/// Client for the hosted agent service (agents, tasks, executions).
pub struct JulepClient {
    client: reqwest::Client,
    base_url: String,
}

impl JulepClient {
    pub fn new(base_url: &str, api_key: &str, timeout: u64) -> Result<Self, AgentApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn create_agent(
        &self,
        name: &str,
        model: &str,
        about: &str,
    ) -> Result<Agent, AgentApiError> {
        let url = format!("{}/agents", self.base_url);
        self.post_json(&url, &CreateAgentRequest { name, model, about }).await
    }

    pub async fn create_task(
        &self,
        agent_id: &str,
        name: &str,
        description: &str,
        steps: &[TaskStep],
    ) -> Result<Task, AgentApiError> {
        let url = format!("{}/agents/{}/tasks", self.base_url, agent_id);
        self.post_json(&url, &CreateTaskRequest { name, description, main: steps }).await
    }

    pub async fn create_execution(
        &self,
        task_id: &str,
        input: &Value,
    ) -> Result<Execution, AgentApiError> {
        let url = format!("{}/tasks/{}/executions", self.base_url, task_id);
        self.post_json(&url, &CreateExecutionRequest { input }).await
    }

    pub async fn get_execution(&self, execution_id: &str) -> Result<Execution, AgentApiError> {
        let url = format!("{}/executions/{}", self.base_url, execution_id);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    /// Poll an execution at a fixed interval until it reaches a terminal
    /// status, or until the configured timeout elapses.
    pub async fn wait_for_execution(
        &self,
        execution_id: &str,
        poll: &PollSettings,
    ) -> Result<Execution, AgentApiError> {
        let interval = Duration::from_secs(poll.interval_secs);
        let deadline = Duration::from_secs(poll.timeout_secs);
        let start = Instant::now();

        loop {
            let execution = self.get_execution(execution_id).await?;
            if execution.status.is_terminal() {
                return Ok(execution);
            }

            if start.elapsed() >= deadline {
                return Err(AgentApiError::ExecutionTimeout {
                    id: execution_id.to_string(),
                    waited_secs: start.elapsed().as_secs(),
                });
            }

            debug!(
                "Execution {} is {:?}, polling again in {:?}",
                execution_id, execution.status, interval
            );
            tokio::time::sleep(interval).await;
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, AgentApiError> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AgentApiError> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentApiError::Api { status, detail });
        }

        Ok(response.json().await?)
    }
}
