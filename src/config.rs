use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RagError, Result};

/// Which embedding backend turns chunks and questions into vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Pretrained sentence-embedding model served by Ollama.
    Ollama,
    /// Offline lexical feature hashing, mostly useful without a running service.
    Hashing { dimension: usize },
}

impl EmbedderKind {
    pub fn name(&self) -> &'static str {
        match self {
            EmbedderKind::Ollama => "ollama",
            EmbedderKind::Hashing { .. } => "hashing",
        }
    }
}

impl FromStr for EmbedderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(EmbedderKind::Ollama),
            "hashing" => Ok(EmbedderKind::Hashing {
                dimension: DEFAULT_HASHING_DIMENSION,
            }),
            other => Err(RagError::Config(format!("unknown embedder '{other}'"))),
        }
    }
}

pub const DEFAULT_HASHING_DIMENSION: usize = 384;

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub data_file: PathBuf,
    pub persist_directory: PathBuf,
    pub embedding_model: String,
    pub embedder: EmbedderKind,
    pub llm_model: String,
    pub ollama_url: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("speech.txt"),
            persist_directory: PathBuf::from("./chroma_db"),
            embedding_model: "all-minilm".to_string(),
            embedder: EmbedderKind::Ollama,
            llm_model: "mistral".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            retrieval_k: 1,
        }
    }
}

impl RagConfig {
    /// Defaults, then environment overrides, then the first positional
    /// argument as the data file.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        if let Some(path) = std::env::args().nth(1) {
            config.data_file = PathBuf::from(path);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("RAG_DATA_FILE") {
            config.data_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("RAG_PERSIST_DIR") {
            config.persist_directory = PathBuf::from(v);
        }
        if let Some(v) = lookup("RAG_EMBED_MODEL") {
            config.embedding_model = v;
        }
        if let Some(v) = lookup("RAG_EMBEDDER") {
            config.embedder = v.parse()?;
        }
        if let Some(v) = lookup("RAG_LLM_MODEL") {
            config.llm_model = v;
        }
        if let Some(v) = lookup("OLLAMA_HOST") {
            config.ollama_url = normalize_host(&v);
        }
        if let Some(v) = lookup("RAG_CHUNK_SIZE") {
            config.chunk_size = parse_number("RAG_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("RAG_CHUNK_OVERLAP") {
            config.chunk_overlap = parse_number("RAG_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("RAG_TOP_K") {
            config.retrieval_k = parse_number("RAG_TOP_K", &v)?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.retrieval_k == 0 {
            return Err(RagError::Config("retrieval k must be at least 1".into()));
        }
        if let EmbedderKind::Hashing { dimension: 0 } = self.embedder {
            return Err(RagError::Config("hashing dimension must be positive".into()));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| RagError::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

// OLLAMA_HOST is commonly set without a scheme, e.g. "127.0.0.1:11434".
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
