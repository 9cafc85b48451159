//! These models represent the objects passed around by the agent
//!
//! There are several different related formats we need to interact with:
//! - anthropic messages/tools, sent from the agent to the LLM
//! - openai messages/tools, sent from the agent to the LLM
//! - bridge requests/responses, sent between remote callers and the tool registry
//!
//! We always immediately convert those data models into the internal structs using
//! to/from helpers, so the internal models are not an exact match to any of these formats.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
