//! Retrying structured call path with default-response fallback.

use serde_json::Value;

use crate::clients::traits::{AgentError, LlmRequest, StructuredAgent};
use crate::schema::{ResponseModel, Schema};
use crate::synth::{DefaultOverrides, instantiate, synthesize};

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

pub type DefaultFactory = Box<dyn Fn() -> Value + Send + Sync>;

pub struct CallOptions {
    /// Attempts before falling back; values below 1 are treated as 1
    pub max_retries: u32,
    pub overrides: DefaultOverrides,
    /// Produces the fallback instead of schema synthesis when set
    pub default_factory: Option<DefaultFactory>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            overrides: DefaultOverrides::new(),
            default_factory: None,
        }
    }
}

impl CallOptions {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_overrides(mut self, overrides: DefaultOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_factory = Some(Box::new(factory));
        self
    }
}

/// Invoke `agent`, retrying retryable failures up to `max_retries` times.
///
/// After the last failed attempt the default factory (or schema synthesis)
/// supplies the answer. Synthesis failures are returned immediately and
/// never retried.
pub async fn call_llm<A>(
    agent: &A,
    request: &LlmRequest,
    schema: &Schema,
    options: &CallOptions,
) -> Result<Value, AgentError>
where
    A: StructuredAgent + ?Sized,
{
    let attempts = options.max_retries.max(1);
    let agent_name = request.agent.as_deref().unwrap_or("unknown");

    for attempt in 1..=attempts {
        match agent.invoke(request, schema).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    agent = agent_name,
                    "Error - retry {}/{}: {}",
                    attempt,
                    attempts,
                    e
                );
                if attempt == attempts {
                    tracing::error!(
                        agent = agent_name,
                        "Error in LLM call after {} attempts: {}",
                        attempts,
                        e
                    );
                }
            }
        }
    }

    if let Some(factory) = &options.default_factory {
        return Ok(factory());
    }
    let instance = synthesize(schema, &options.overrides)?;
    Ok(Value::Object(instance))
}

/// Typed variant of [`call_llm`] for a concrete response model.
pub async fn call_llm_model<T, A>(
    agent: &A,
    request: &LlmRequest,
    options: &CallOptions,
) -> Result<T, AgentError>
where
    T: ResponseModel,
    A: StructuredAgent + ?Sized,
{
    let schema = T::schema();
    let value = call_llm(agent, request, &schema, options).await?;
    Ok(instantiate(&schema.name, value)?)
}

/// Pull the first ```json fenced block out of a model reply.
pub fn extract_json_from_response(content: &str) -> Option<Value> {
    let start = content.find(JSON_FENCE)?;
    let rest = &content[start + JSON_FENCE.len()..];
    let end = rest.find(FENCE)?;
    match serde_json::from_str(rest[..end].trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Error extracting JSON from response: {}", e);
            None
        }
    }
}
