use std::hash::Hasher;

use rustc_hash::FxHasher;
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, Document, load_document};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::prompt::Prompt;
use crate::retriever::{Context, Retriever};
use crate::splitter::TextSplitter;
use crate::vector_db::VectorDB;

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub context: Context,
}

/// Retriever, prompt and model, called one after another for each question.
pub struct RagPipeline {
    retriever: Retriever,
    llm: Box<dyn LanguageModel>,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, llm: Box<dyn LanguageModel>) -> Self {
        Self { retriever, llm }
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let context = self.retriever.retrieve(question).await?;
        if context.is_empty() {
            debug!("no context retrieved");
        }
        let prompt = Prompt::new(context.text(), question);
        let text = self.llm.generate(&prompt.render()).await?;
        Ok(Answer { text, context })
    }
}

/// Startup: load, split, index, then hand over the model client. The first
/// failing stage ends the run.
pub async fn build_pipeline(
    config: &RagConfig,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn LanguageModel>,
) -> Result<RagPipeline> {
    config.validate()?;

    println!("Loading document...");
    let document = load_document(&config.data_file)?;

    println!("Splitting text...");
    let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
    let chunks = splitter.split_document(&document);
    info!(chunks = chunks.len(), "split document");
    if chunks.is_empty() {
        warn!(source = %document.source_id, "document is empty, answers will have no context");
    }

    println!("Creating vector store...");
    let mut vector_db = VectorDB::open(&config.persist_directory)?;
    index_chunks(&mut vector_db, &document, &chunks, config, embedder.as_ref()).await?;

    let retriever = Retriever::new(vector_db, embedder, config.retrieval_k);
    info!(records = retriever.len(), model = llm.model(), "pipeline ready");
    println!("RAG chain created. You can now ask questions.");
    Ok(RagPipeline::new(retriever, llm))
}

/// Makes the store hold exactly one record per chunk of this document.
/// A store already built from the same text, splitting and embedder is
/// reused as is; anything else is rebuilt from scratch.
pub async fn index_chunks(
    vector_db: &mut VectorDB,
    document: &Document,
    chunks: &[Chunk],
    config: &RagConfig,
    embedder: &dyn Embedder,
) -> Result<()> {
    let fingerprint = index_fingerprint(document, config, embedder);

    if vector_db.fingerprint() == Some(fingerprint.as_str()) && vector_db.len() == chunks.len() {
        info!(records = vector_db.len(), "reusing persisted index");
        return Ok(());
    }

    if !vector_db.is_empty() {
        info!(stale = vector_db.len(), "rebuilding persisted index");
    }
    vector_db.clear();

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    vector_db.add(chunks, vectors)?;
    vector_db.set_fingerprint(fingerprint);
    vector_db.persist()?;

    info!(records = vector_db.len(), "indexed document");
    Ok(())
}

fn index_fingerprint(document: &Document, config: &RagConfig, embedder: &dyn Embedder) -> String {
    let mut hasher = FxHasher::default();
    hasher.write(document.source_id.as_bytes());
    hasher.write_u8(0);
    hasher.write(document.text.as_bytes());
    hasher.write_u8(0);
    hasher.write_usize(config.chunk_size);
    hasher.write_usize(config.chunk_overlap);
    hasher.write(embedder.model_id().as_bytes());
    format!("{:016x}", hasher.finish())
}
