pub mod call;
pub mod intercept;
pub mod traits;

pub use call::{CallOptions, call_llm, call_llm_model, extract_json_from_response};
pub use intercept::InterceptingAgent;
pub use traits::{AgentError, JsonModeAdapter, LlmRequest, StructuredAgent, TextCompletion};
