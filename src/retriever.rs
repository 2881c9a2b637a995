use tracing::debug;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_db::VectorDB;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
}

/// What the retriever hands to the prompt: the best chunks, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub chunks: Vec<RetrievedChunk>,
}

impl Context {
    pub fn text(&self) -> String {
        self.chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

pub struct Retriever {
    vector_db: VectorDB,
    embedder: Box<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(vector_db: VectorDB, embedder: Box<dyn Embedder>, top_k: usize) -> Self {
        Retriever {
            vector_db,
            embedder,
            top_k,
        }
    }

    pub fn len(&self) -> usize {
        self.vector_db.len()
    }

    pub async fn retrieve(&self, question: &str) -> Result<Context> {
        if self.vector_db.is_empty() {
            debug!("vector store is empty, returning no context");
            return Ok(Context::default());
        }

        let query = self.embedder.embed(question).await?;
        let chunks = self
            .vector_db
            .query(&query, self.top_k)?
            .into_iter()
            .map(|(score, record)| RetrievedChunk {
                text: record.text.clone(),
                score,
            })
            .collect::<Vec<_>>();

        debug!(
            hits = chunks.len(),
            best = chunks.first().map(|c| c.score),
            top_k = self.top_k,
            "retrieved context"
        );
        Ok(Context { chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;
    use crate::embedding::HashingEmbedder;
    use tempfile::tempdir;

    async fn store_with(texts: &[&str], embedder: &HashingEmbedder, dir: &std::path::Path) -> VectorDB {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                text: text.to_string(),
                source_id: "speech.txt".to_string(),
                offset: i * 100,
            })
            .collect();
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let mut db = VectorDB::open(dir).unwrap();
        db.add(&chunks, vectors).unwrap();
        db
    }

    #[tokio::test]
    async fn test_single_chunk_always_wins() -> Result<()> {
        let dir = tempdir()?;
        let embedder = HashingEmbedder::new(64);
        let db = store_with(&["The sky is blue."], &embedder, dir.path()).await;
        let retriever = Retriever::new(db, Box::new(embedder), 1);

        let context = retriever.retrieve("Completely unrelated question about cheese").await?;
        assert_eq!(context.text(), "The sky is blue.");
        Ok(())
    }

    #[tokio::test]
    async fn test_picks_most_similar_chunk() -> Result<()> {
        let dir = tempdir()?;
        let embedder = HashingEmbedder::new(256);
        let db = store_with(
            &[
                "Grass is green in spring.",
                "Sky color: the sky is blue.",
                "Snow is white and cold.",
            ],
            &embedder,
            dir.path(),
        )
        .await;
        let retriever = Retriever::new(db, Box::new(embedder), 1);

        let context = retriever.retrieve("What color is the sky?").await?;
        assert_eq!(context.chunks.len(), 1);
        assert_eq!(context.text(), "Sky color: the sky is blue.");
        Ok(())
    }

    #[tokio::test]
    async fn test_top_k_joins_chunks() -> Result<()> {
        let dir = tempdir()?;
        let embedder = HashingEmbedder::new(4096);
        let db = store_with(&["one", "two", "three"], &embedder, dir.path()).await;
        let retriever = Retriever::new(db, Box::new(embedder), 2);

        let context = retriever.retrieve("two").await?;
        assert_eq!(context.chunks.len(), 2);
        assert!(context.text().starts_with("two\n\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_store_gives_empty_context() -> Result<()> {
        let dir = tempdir()?;
        let db = VectorDB::open(dir.path())?;
        let retriever = Retriever::new(db, Box::new(HashingEmbedder::new(8)), 1);
        let context = retriever.retrieve("anything").await?;
        assert!(context.is_empty());
        assert_eq!(context.text(), "");
        Ok(())
    }
}
