//! Offline providers and fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pdf_rag::config::RagConfig;
use pdf_rag::error::{Error, Result};
use pdf_rag::generation::prompt::NOT_FOUND_ANSWER;
use pdf_rag::providers::{EmbeddingProvider, LlmProvider};

pub const DIMENSIONS: usize = 64;

/// Config for the in-memory backend with small chunks
pub fn test_config() -> RagConfig {
    RagConfig::from_lookup(|key| {
        let value = match key {
            "VECTOR_BACKEND" => "memory",
            "EMBEDDING_DIMENSIONS" => "64",
            "CHUNK_SIZE" => "200",
            "CHUNK_OVERLAP" => "40",
            "UPSERT_BATCH_SIZE" => "2",
            "MAX_CONCURRENCY" => "2",
            "TOP_K" => "3",
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}

/// Config for the in-memory backend with default chunking and top-K
pub fn default_chunking_config() -> RagConfig {
    RagConfig::from_lookup(|key| match key {
        "VECTOR_BACKEND" => Some("memory".to_string()),
        "EMBEDDING_DIMENSIONS" => Some(DIMENSIONS.to_string()),
        _ => None,
    })
    .unwrap()
}

/// Bag-of-words embedder: each lowercase word hashes into one bucket
pub struct HashingEmbedder {
    dimensions: usize,
    pub calls: AtomicUsize,
    pub fail_after: Option<usize>,
    pub delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: DIMENSIONS,
            calls: AtomicUsize::new(0),
            fail_after: None,
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Fail every call after the first `n`
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::new()
        }
    }

    /// Embed into `dimensions` buckets instead of the default
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Self::new()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            values[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }
        values
    }

    async fn track<T>(&self, work: impl FnOnce() -> T) -> Result<T> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.map_or(false, |n| call >= n) {
            return Err(Error::embedding("embedding service unavailable"));
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(work())
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.track(|| self.vector(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.track(|| texts.iter().map(|t| self.vector(t)).collect())
            .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        "hashing-test"
    }
}

/// Answers from the prompt's context by echoing the sentence that mentions
/// the question's last word, or the not-found sentence
pub struct ContextEchoLlm {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl ContextEchoLlm {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    fn answer(prompt: &str) -> String {
        let context = section(prompt, "DOCUMENT CONTEXT:\n", "\n--------------------");
        let question = section(prompt, "USER QUESTION:\n", "\n");
        let keyword = question
            .trim_end_matches('?')
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_lowercase();

        context
            .split(|c| c == '.' || c == '\n')
            .map(str::trim)
            .find(|sentence| !keyword.is_empty() && sentence.to_lowercase().contains(&keyword))
            .map(|sentence| {
                let marker = |c: char| c == '[' || c == ']' || c == ' ' || c.is_ascii_digit();
                format!("{}.", sentence.trim_start_matches(marker))
            })
            .unwrap_or_else(|| NOT_FOUND_ANSWER.to_string())
    }
}

fn section<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    text.split_once(start)
        .map(|(_, rest)| rest.split_once(end).map_or(rest, |(s, _)| s))
        .unwrap_or_default()
}

#[async_trait]
impl LlmProvider for ContextEchoLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail {
            return Err(Error::generation("model overloaded"));
        }
        Ok(Self::answer(prompt))
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-test"
    }
}

/// Write a PDF with one page per entry, each line drawn as its own text run
pub fn write_pdf(dir: &Path, name: &str, pages: &[&[&str]]) -> PathBuf {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![16.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for line in lines.iter() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// The three-page atlas used across tests; the capital is only on page 2
pub fn write_freedonia_pdf(dir: &Path) -> PathBuf {
    write_pdf(
        dir,
        "freedonia.pdf",
        &[
            &[
                "Freedonia is a small country on the coast.",
                "Its people are known for their music and their bread.",
            ],
            &[
                "The capital of Freedonia is Lepidopolis.",
                "Lepidopolis lies on a river delta.",
            ],
            &[
                "The national bird is the grey heron.",
                "Winters are mild and summers are dry.",
            ],
        ],
    )
}
