//! LLM access for relevance scoring and content synthesis
//!
//! This module handles:
//! - The completion capability the pipeline depends on
//! - HTTP clients for Gemini, OpenAI-compatible and Ollama endpoints
//! - A pool of clients spread over several API keys
//! - System instructions and code-fence stripping of responses

mod client;
mod pool;
mod prompts;

pub use client::{LlmClient, LlmConfig, LlmProvider, LlmResponse, MockLlmClient};
pub use pool::ClientPool;
pub use prompts::{
    reference_block, OUTLINE_INSTRUCTION, SCORING_INSTRUCTION, USAGE_FROM_OUTLINE_INSTRUCTION,
    USAGE_INSTRUCTION,
};

use crate::Result;

/// One completion call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// Fixed instruction for the model
    pub system_instruction: String,
    /// Reference blocks sent ahead of the query
    pub context_documents: Vec<String>,
    /// The feature-specific request
    pub user_query: String,
}

impl CompletionRequest {
    pub fn new(system_instruction: &str, user_query: String) -> Self {
        Self {
            system_instruction: system_instruction.to_string(),
            context_documents: Vec::new(),
            user_query,
        }
    }

    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.context_documents = documents;
        self
    }

    /// Context documents followed by the query, for single-prompt backends
    pub fn user_text(&self) -> String {
        let mut text = String::new();
        for document in &self.context_documents {
            text.push_str(document);
            text.push_str("\n\n");
        }
        text.push_str(&self.user_query);
        text
    }
}

/// Trait for text completion backends
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a completion and return the raw response text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Info strings recognized on a single-line fence
const FENCE_LANGUAGES: [&str; 3] = ["yaml", "yml", "json"];

/// Strip a surrounding Markdown code fence from a model response
///
/// Removes a leading "```" with its info string (e.g. `yaml`, `json`) and a
/// trailing "```". Text without a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => FENCE_LANGUAGES
                .iter()
                .find_map(|lang| rest.strip_prefix(lang))
                .unwrap_or(rest),
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}
