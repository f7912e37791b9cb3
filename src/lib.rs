//! Prompt interception shim for structured LLM calls.
//!
//! Instead of reaching a model, an [`clients::InterceptingAgent`] records the
//! prompt to the console and to a transcript file, then answers with a
//! default instance synthesized from the response schema.

pub mod clients;
pub mod config;
pub mod error;
pub mod prompt;
pub mod schema;
pub mod schemas;
pub mod synth;
pub mod transcript;

pub use clients::{CallOptions, InterceptingAgent, LlmRequest, StructuredAgent, call_llm};
pub use error::{Result, ShimError, SynthesisError};
pub use schema::{Field, FieldType, ResponseModel, Schema};
pub use synth::{DefaultOverrides, PLACEHOLDER_TEXT, synthesize, synthesize_model};

