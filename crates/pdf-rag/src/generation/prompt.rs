//! Prompt templates for RAG generation

use crate::types::SearchMatch;

/// Separator between numbered context entries
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Context placeholder when retrieval found nothing
pub const NO_CONTEXT: &str = "NO CONTEXT FOUND";

/// The sentence the model is told to give when the context lacks the answer
pub const NOT_FOUND_ANSWER: &str = "I could not find the answer in the provided document.";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the context block from search matches
    ///
    /// Each entry is `[n] text`, numbered from 1 in match order. Matches
    /// without stored text are skipped and do not consume a number.
    pub fn build_context(matches: &[SearchMatch]) -> String {
        matches
            .iter()
            .filter_map(SearchMatch::text)
            .enumerate()
            .map(|(i, text)| format!("[{}] {}", i + 1, text))
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Build the full RAG prompt, grounded on `context` only
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        let context = if context.is_empty() { NO_CONTEXT } else { context };

        format!(
            r#"
You are a helpful assistant.

Use ONLY the following document context to answer the user's question.
If the answer is not found in the context, say:
"{not_found}"

--------------------
DOCUMENT CONTEXT:
{context}
--------------------

USER QUESTION:
{question}
"#,
            not_found = NOT_FOUND_ANSWER,
            context = context,
            question = question,
        )
    }
}
