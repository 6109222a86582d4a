pub mod agent_client;
pub mod responder;

pub use agent_client::{Agent, AgentApiError, Execution, ExecutionStatus, JulepClient, Task};
pub use responder::{AnswerResult, GenerateError, PromptBuilder, ResponseGenerator};
