use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::clients::call::extract_json_from_response;
use crate::config::ModelSelection;
use crate::error::SynthesisError;
use crate::prompt::Prompt;
use crate::schema::Schema;

/// One structured-output request from an agent.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: Prompt,
    /// Agent the call is made on behalf of
    pub agent: Option<String>,
    /// Component that issued the call, when different from `agent`
    pub caller: Option<String>,
    pub model: ModelSelection,
}

impl LlmRequest {
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            agent: None,
            caller: None,
            model: ModelSelection::default(),
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_model(mut self, model: ModelSelection) -> Self {
        self.model = model;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl AgentError {
    /// Synthesis failures are deterministic; everything else may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AgentError::Synthesis(_))
    }
}

/// Produces a JSON instance shaped like `schema` for a request.
#[async_trait]
pub trait StructuredAgent: Send + Sync {
    async fn invoke(&self, request: &LlmRequest, schema: &Schema) -> Result<Value, AgentError>;
}

/// A backend that only returns free text.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<String, AgentError>;
}

/// Structured output for text-only backends: the reply is parsed as JSON,
/// or the first ```json fenced block is extracted from it.
pub struct JsonModeAdapter<C: TextCompletion> {
    backend: C,
}

impl<C: TextCompletion> JsonModeAdapter<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<C: TextCompletion> StructuredAgent for JsonModeAdapter<C> {
    async fn invoke(&self, request: &LlmRequest, schema: &Schema) -> Result<Value, AgentError> {
        let reply = self.backend.complete(request).await?;
        let parsed = serde_json::from_str::<Value>(reply.trim())
            .ok()
            .filter(Value::is_object)
            .or_else(|| extract_json_from_response(&reply));
        parsed.ok_or_else(|| {
            AgentError::Parse(format!("no JSON object for '{}' in model reply", schema.name))
        })
    }
}
