//! Console and file rendering of an intercepted LLM call.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::prompt::Prompt;

const RULE_WIDTH: usize = 80;

/// Everything recorded about one intercepted call.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub agent: Option<String>,
    pub caller: Option<String>,
    pub ticker: String,
    pub model_name: String,
    pub model_provider: String,
    pub response_model: String,
    pub prompt: Prompt,
}

impl Transcript {
    /// Lines shared by the console and the file sink.
    pub fn render(&self) -> Vec<String> {
        let rule = "=".repeat(RULE_WIDTH);
        let mut lines = vec![
            rule.clone(),
            format!(
                "LLM CALL INTERCEPTED - Agent: {}",
                self.agent.as_deref().unwrap_or("Unknown")
            ),
            format!(
                "CALLING AGENT: {}",
                self.caller.as_deref().unwrap_or("Unknown")
            ),
            format!("TICKER: {}", self.ticker),
            format!("Model: {} ({})", self.model_name, self.model_provider),
            format!("Response Model: {}", self.response_model),
            rule.clone(),
        ];

        match &self.prompt {
            Prompt::Messages(_) => {
                lines.push("PROMPT MESSAGES:".to_string());
                lines.push("  Combined Content:".to_string());
                let combined = self.prompt.combined_content().unwrap_or_default();
                lines.extend(combined.split('\n').map(|line| format!("    {}", line)));
            }
            Prompt::Content(content) => {
                lines.push("PROMPT CONTENT:".to_string());
                lines.push(format!("    {}", content));
            }
            Prompt::Raw(raw) => {
                lines.push("PROMPT (raw):".to_string());
                lines.push(format!("    {}", raw));
            }
        }
        lines.push(String::new());

        lines.push(rule.clone());
        lines.push("LLM CALL SKIPPED - Returning default response".to_string());
        lines.push(rule);
        lines.push(String::new());
        lines
    }

    /// `llm_call_<ticker>_<agent>_<YYYYmmdd_HHMMSS>.txt`
    pub fn file_name(&self, at: DateTime<Local>) -> String {
        format!(
            "llm_call_{}_{}_{}.txt",
            path_safe(&self.ticker),
            path_safe(self.agent.as_deref().unwrap_or("unknown")),
            at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write the transcript into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: &Path, at: DateTime<Local>) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name(at));
        std::fs::write(&path, self.render().join("\n"))?;
        Ok(path)
    }

    pub fn echo<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for line in self.render() {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

fn path_safe(s: &str) -> String {
    s.replace(['/', '\\'], "_")
}
