//! Agent that never reaches a model: it records the prompt and answers with
//! a synthesized default instance.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use crate::clients::traits::{AgentError, LlmRequest, StructuredAgent};
use crate::config::ShimConfig;
use crate::prompt::extract_ticker;
use crate::schema::Schema;
use crate::synth::{DefaultOverrides, synthesize};
use crate::transcript::Transcript;

#[derive(Debug, Clone)]
pub struct InterceptingAgent {
    output_dir: PathBuf,
    console_echo: bool,
    overrides: DefaultOverrides,
}

impl InterceptingAgent {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            console_echo: true,
            overrides: DefaultOverrides::new(),
        }
    }

    pub fn from_config(config: &ShimConfig) -> Self {
        Self::new(config.output_dir.clone()).with_console_echo(config.console_echo)
    }

    pub fn with_console_echo(mut self, enabled: bool) -> Self {
        self.console_echo = enabled;
        self
    }

    pub fn with_overrides(mut self, overrides: DefaultOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn transcript(&self, request: &LlmRequest, schema: &Schema) -> Transcript {
        let ticker = extract_ticker(&request.prompt);
        tracing::debug!("Ticker extraction: found '{}' from prompt", ticker);
        Transcript {
            agent: request.agent.clone(),
            caller: request.caller.clone(),
            ticker,
            model_name: request.model.name.clone(),
            model_provider: request.model.provider.clone(),
            response_model: schema.name.clone(),
            prompt: request.prompt.clone(),
        }
    }

    /// Console and file sinks are best-effort; neither can fail the call.
    fn record(&self, transcript: &Transcript) {
        self.record_to(transcript, &mut std::io::stdout().lock());
    }

    fn record_to<W: Write>(&self, transcript: &Transcript, console: &mut W) {
        if self.console_echo
            && let Err(e) = transcript.echo(console)
        {
            tracing::warn!("Failed to echo intercepted call: {}", e);
        }

        match transcript.write_to_dir(&self.output_dir, Local::now()) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "LLM call content saved");
                if self.console_echo {
                    let _ = writeln!(console, "LLM call content saved to: {}", path.display());
                }
            }
            Err(e) => {
                tracing::error!("Failed to save intercepted call: {}", e);
                if self.console_echo {
                    let _ = writeln!(console, "Failed to save to file: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl StructuredAgent for InterceptingAgent {
    async fn invoke(&self, request: &LlmRequest, schema: &Schema) -> Result<Value, AgentError> {
        tracing::info!(
            agent = request.agent.as_deref().unwrap_or("unknown"),
            response_model = %schema.name,
            "LLM call intercepted"
        );
        let transcript = self.transcript(request, schema);
        self.record(&transcript);

        let instance = synthesize(schema, &self.overrides)?;
        Ok(Value::Object(instance))
    }
}
