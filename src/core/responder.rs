use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PollSettings;
use crate::core::agent_client::{
    Agent, AgentApiError, ChatMessage, ExecutionStatus, JulepClient, TaskStep,
};

const TASK_NAME: &str = "PDF and RDF Question Answering";
const TASK_DESCRIPTION: &str = "Analyze data from PDFs and RDF graphs.";

// Keeps the composed prompt within the model context window.
const MAX_DOCUMENT_CHARS: usize = 8000;

const QA_PROMPT_TEMPLATE: &str = r#"You are an intelligent assistant that analyzes data from PDF documents and RDF graphs.

## PDF Data
{{pdf_data}}

## RDF Data
{{rdf_data}}

## User Question
{{question}}

Provide a clear and concise response."#;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no question provided")]
    EmptyQuestion,

    #[error("no data from the PDF or the RDF graph")]
    NoSourceData,

    #[error("agent is not initialized")]
    AgentUnavailable,

    #[error("remote execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Api(#[from] AgentApiError),

    #[error("failed to render prompt template: {0}")]
    Template(#[from] handlebars::RenderError),
}

pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string("qa_prompt", QA_PROMPT_TEMPLATE)
            .expect("built-in prompt template compiles");

        Self { handlebars }
    }

    pub fn build_qa_prompt(
        &self,
        question: &str,
        pdf_text: &str,
        rdf_results: &str,
    ) -> Result<String, handlebars::RenderError> {
        let pdf_block = truncate_chars(pdf_text, MAX_DOCUMENT_CHARS);

        self.handlebars.render(
            "qa_prompt",
            &json!({
                "pdf_data": pdf_block,
                "rdf_data": rdf_results,
                "question": question,
            }),
        )
    }

    pub fn system_prompt() -> &'static str {
        "You are a data assistant analyzing PDF documents and RDF graphs."
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub id: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub processing_time_seconds: f64,
}

/// Generates an answer to a question from extracted PDF text and RDF query
/// results via a one-step remote task execution.
pub struct ResponseGenerator {
    client: JulepClient,
    agent: Option<Agent>,
    poll: PollSettings,
    prompts: PromptBuilder,
}

impl ResponseGenerator {
    pub fn new(client: JulepClient, agent: Option<Agent>, poll: PollSettings) -> Self {
        Self {
            client,
            agent,
            poll,
            prompts: PromptBuilder::new(),
        }
    }

    pub async fn generate(
        &self,
        question: &str,
        pdf_text: &str,
        rdf_results: &str,
    ) -> Result<AnswerResult, GenerateError> {
        if question.trim().is_empty() {
            return Err(GenerateError::EmptyQuestion);
        }

        if pdf_text.is_empty() && rdf_results.is_empty() {
            return Err(GenerateError::NoSourceData);
        }

        let agent = self.agent.as_ref().ok_or(GenerateError::AgentUnavailable)?;

        let start = Instant::now();
        let prompt = self.prompts.build_qa_prompt(question, pdf_text, rdf_results)?;

        let step = TaskStep {
            prompt: vec![
                ChatMessage::system(PromptBuilder::system_prompt()),
                ChatMessage::user(prompt),
            ],
            expected_output: HashMap::from([(
                "result".to_string(),
                "Answer to the user's question.".to_string(),
            )]),
        };

        let task = self
            .client
            .create_task(&agent.id, TASK_NAME, TASK_DESCRIPTION, &[step])
            .await?;
        debug!("Created task: {}", task.id);

        let execution = self.client.create_execution(&task.id, &json!({})).await?;
        info!("Execution {} submitted", execution.id);

        let finished = self
            .client
            .wait_for_execution(&execution.id, &self.poll)
            .await?;

        match finished.status {
            ExecutionStatus::Succeeded => {
                let answer = extract_answer(finished.output.as_ref());
                info!(
                    "Execution {} succeeded in {:.2}s",
                    finished.id,
                    start.elapsed().as_secs_f64()
                );

                Ok(AnswerResult {
                    id: Uuid::new_v4().to_string(),
                    answer,
                    created_at: Utc::now(),
                    processing_time_seconds: start.elapsed().as_secs_f64(),
                })
            }
            status => Err(GenerateError::Execution(
                finished
                    .error
                    .unwrap_or_else(|| format!("execution ended with status {:?}", status)),
            )),
        }
    }
}

/// Pull the answer text out of the execution output, defaulting to an
/// empty string at each missing level.
fn extract_answer(output: Option<&Value>) -> String {
    output
        .and_then(|o| o.pointer("/choices/0/message/content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_client(base_url: &str) -> JulepClient {
        JulepClient::new(base_url, "test-key", 5).unwrap()
    }

    fn test_agent() -> Agent {
        Agent {
            id: "agent1".to_string(),
            name: "pdf-rdf-analyzer".to_string(),
            model: "gpt-4o".to_string(),
            about: String::new(),
            created_at: None,
        }
    }

    fn fast_poll() -> PollSettings {
        PollSettings { interval_secs: 0, timeout_secs: 5 }
    }

    #[test]
    fn test_prompt_contains_all_sections() {
        let prompts = PromptBuilder::new();
        let prompt = prompts
            .build_qa_prompt("Summarize", "Revenue grew 10%.", "(s, p, o)")
            .unwrap();

        assert!(prompt.contains("## PDF Data\nRevenue grew 10%."));
        assert!(prompt.contains("## RDF Data\n(s, p, o)"));
        assert!(prompt.contains("## User Question\nSummarize"));
    }

    #[test]
    fn test_prompt_truncates_long_documents() {
        let prompts = PromptBuilder::new();
        let long_text = "x".repeat(MAX_DOCUMENT_CHARS + 100);
        let prompt = prompts.build_qa_prompt("q", &long_text, "").unwrap();

        assert!(!prompt.contains(&long_text));
        assert!(prompt.contains(&"x".repeat(MAX_DOCUMENT_CHARS)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "日本語テキスト";
        assert_eq!(truncate_chars(text, 3), "日本語");
        assert_eq!(truncate_chars(text, 100), text);
    }

    #[test]
    fn test_extract_answer_defaults_to_empty() {
        assert_eq!(extract_answer(None), "");
        assert_eq!(extract_answer(Some(&json!({}))), "");
        assert_eq!(extract_answer(Some(&json!({"choices": []}))), "");
        assert_eq!(
            extract_answer(Some(&json!({"choices": [{"message": {}}]}))),
            ""
        );
        assert_eq!(
            extract_answer(Some(
                &json!({"choices": [{"message": {"content": "hi"}}]})
            )),
            "hi"
        );
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_question() {
        let generator =
            ResponseGenerator::new(test_client("http://localhost:9"), Some(test_agent()), fast_poll());
        let err = generator.generate("", "pdf text", "").await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyQuestion));
    }

    #[tokio::test]
    async fn test_generate_rejects_missing_data() {
        let generator =
            ResponseGenerator::new(test_client("http://localhost:9"), Some(test_agent()), fast_poll());
        let err = generator.generate("Summarize", "", "").await.unwrap_err();
        assert!(matches!(err, GenerateError::NoSourceData));
    }

    #[tokio::test]
    async fn test_generate_requires_agent() {
        let generator = ResponseGenerator::new(test_client("http://localhost:9"), None, fast_poll());
        let err = generator
            .generate("Summarize", "pdf text", "")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::AgentUnavailable));
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;

        let task_mock = server
            .mock("POST", "/agents/agent1/tasks")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("Summarize".to_string()),
                Matcher::Regex("Revenue grew 10%".to_string()),
            ]))
            .with_status(201)
            .with_body(json!({"id": "task1"}).to_string())
            .create_async()
            .await;

        server
            .mock("POST", "/tasks/task1/executions")
            .with_status(201)
            .with_body(json!({"id": "exec1", "status": "queued"}).to_string())
            .create_async()
            .await;

        server
            .mock("GET", "/executions/exec1")
            .with_status(200)
            .with_body(
                json!({
                    "id": "exec1",
                    "status": "succeeded",
                    "output": {
                        "choices": [{"message": {"content": "Revenue grew 10% year over year."}}]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let generator =
            ResponseGenerator::new(test_client(&server.url()), Some(test_agent()), fast_poll());
        let result = generator
            .generate("Summarize", "Revenue grew 10%.", "")
            .await
            .unwrap();

        assert_eq!(result.answer, "Revenue grew 10% year over year.");
        task_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_reports_failed_execution() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/agents/agent1/tasks")
            .with_status(201)
            .with_body(json!({"id": "task1"}).to_string())
            .create_async()
            .await;

        server
            .mock("POST", "/tasks/task1/executions")
            .with_status(201)
            .with_body(json!({"id": "exec1", "status": "queued"}).to_string())
            .create_async()
            .await;

        server
            .mock("GET", "/executions/exec1")
            .with_status(200)
            .with_body(
                json!({"id": "exec1", "status": "failed", "error": "model overloaded"}).to_string(),
            )
            .create_async()
            .await;

        let generator =
            ResponseGenerator::new(test_client(&server.url()), Some(test_agent()), fast_poll());
        let err = generator
            .generate("Summarize", "pdf text", "")
            .await
            .unwrap_err();

        match err {
            GenerateError::Execution(detail) => assert_eq!(detail, "model overloaded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
