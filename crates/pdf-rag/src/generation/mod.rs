//! Answer generation over retrieved context

pub mod prompt;

pub use prompt::PromptBuilder;

use std::sync::Arc;

use crate::providers::LlmProvider;

/// Prefix of the answer shown when the model cannot be reached but
/// documents were retrieved
pub const MODEL_UNAVAILABLE_PREFIX: &str = "Chat model unavailable. Showing retrieved documents:";

/// Answer shown when the model failed and there is no context to fall back on
pub const CANNOT_PROCESS: &str = "Sorry, I could not process your question.";

/// Turns a question and its context into an answer, never failing
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Generate an answer
    ///
    /// Model failures are logged and replaced by the raw context, or by a
    /// fixed apology when there is none.
    pub async fn answer(&self, question: &str, context: &str) -> String {
        let prompt = PromptBuilder::build_rag_prompt(question, context);

        match self.llm.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("{} chat error: {}", self.llm.name(), e);
                fallback_answer(context)
            }
        }
    }
}

fn fallback_answer(context: &str) -> String {
    if context.is_empty() {
        CANNOT_PROCESS.to_string()
    } else {
        format!("{}\n\n{}", MODEL_UNAVAILABLE_PREFIX, context)
    }
}
