//! Query-time retrieval: embed the question, search, build context

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::SearchMatch;

/// Outcome of a retrieval attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Embedding or search failed; already logged
    Failed,
    /// The namespace had nothing to return
    NoMatches,
    Found {
        matches: Vec<SearchMatch>,
        context: String,
    },
}

impl Retrieval {
    /// Context for the prompt, empty unless documents were found
    pub fn context(&self) -> &str {
        match self {
            Self::Found { context, .. } => context,
            _ => "",
        }
    }

    pub fn match_count(&self) -> usize {
        match self {
            Self::Found { matches, .. } => matches.len(),
            _ => 0,
        }
    }
}

/// Retrieves context for questions from one namespace
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    namespace: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            embedder,
            store,
            namespace: config.vector_db.namespace.clone(),
            top_k: config.retrieval.top_k,
        }
    }

    /// Retrieve context for a question; failures degrade to `Retrieval::Failed`
    pub async fn retrieve(&self, question: &str) -> Retrieval {
        match self.search(question).await {
            Ok(matches) if matches.is_empty() => Retrieval::NoMatches,
            Ok(matches) => {
                let context = PromptBuilder::build_context(&matches);
                Retrieval::Found { matches, context }
            }
            Err(e) => {
                tracing::warn!("Error searching {}: {}", self.store.name(), e);
                Retrieval::Failed
            }
        }
    }

    async fn search(&self, question: &str) -> Result<Vec<SearchMatch>> {
        tracing::debug!("Generating embedding for query: {}", question);
        let vector = self.embedder.embed(question).await?;

        tracing::debug!("Searching {} namespace '{}'", self.store.name(), self.namespace);
        self.store
            .query(&self.namespace, &vector, self.top_k, true)
            .await
    }
}
