use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use lazy_static::lazy_static;
use ndarray::Array1;
use regex::Regex;
use reqwest::{Client, StatusCode};
use rustc_hash::{FxHashSet, FxHasher};
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::config::{EmbedderKind, RagConfig};
use crate::error::{RagError, Result};
use crate::llm::classify_request_error;

/// Maps text to fixed-length vectors. The same embedder must be used for
/// indexing and for questions, otherwise similarities are meaningless.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("embedder returned no vector".into()))
    }

    /// Identifies backend and model; part of the index fingerprint.
    fn model_id(&self) -> String;
}

pub fn embedder_from_config(config: &RagConfig) -> Box<dyn Embedder> {
    match config.embedder {
        EmbedderKind::Ollama => Box::new(OllamaEmbedder::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
        )),
        EmbedderKind::Hashing { dimension } => Box::new(HashingEmbedder::new(dimension)),
    }
}

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    http: Client,
    dimension: Mutex<Option<usize>>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http: Client::new(),
            dimension: Mutex::new(None),
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        debug!(model = %self.model, chars = text.len(), "requesting embedding");

        let response = self
            .http
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|err| classify_request_error(&self.base_url, err, RagError::Embedding))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::ModelUnavailable {
                model: self.model.clone(),
                reason: body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        self.check_dimension(parsed.embedding.len())?;
        Ok(parsed.embedding)
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(RagError::Embedding(format!(
                "model '{}' returned an empty embedding",
                self.model
            )));
        }
        let mut dimension = self
            .dimension
            .lock()
            .map_err(|_| RagError::Embedding("dimension lock poisoned".into()))?;
        match *dimension {
            Some(expected) if expected != len => Err(RagError::Embedding(format!(
                "expected embedding dimension {expected}, got {len}"
            ))),
            Some(_) => Ok(()),
            None => {
                *dimension = Some(len);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_one(text).await?);
        }
        Ok(out)
    }

    fn model_id(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

/// Bag-of-words vectors built by hashing normalised tokens into a fixed
/// number of buckets. Needs no model download and is fully deterministic.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

lazy_static! {
    static ref STOP_WORDS: FxHashSet<&'static str> = {
        let words = vec![
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
            "has", "he", "in", "is", "it", "its", "of", "on", "that", "the",
            "to", "was", "were", "will", "with", "what", "which", "who",
        ];
        words.into_iter().collect()
    };
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("valid regex");
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn tokenize(text: &str) -> Vec<String> {
        let text = text.nfc().collect::<String>().to_lowercase();
        let text = NON_WORD.replace_all(&text, " ");

        text.split_whitespace()
            .filter(|&token| !STOP_WORDS.contains(token))
            .map(|token| token.to_string())
            .collect()
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = FxHasher::default();
        token.hash(&mut hasher);
        (hasher.finish() % self.dimension as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = Array1::<f32>::zeros(self.dimension);
        for token in Self::tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
        }

        let norm = vector.dot(&vector).sqrt();
        if norm > 0.0 {
            vector /= norm;
        }
        vector.to_vec()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }

    fn model_id(&self) -> String {
        format!("hashing:{}", self.dimension)
    }
}
