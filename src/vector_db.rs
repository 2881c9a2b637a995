use std::fs::{self, DirBuilder};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::Chunk;

const COLLECTION_FILE: &str = "collection.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
    pub offset: usize,
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub text: String,
    pub metadata: RecordMetadata,
    pub embedding: Array1<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    fingerprint: Option<String>,
    records: Vec<Record>,
}

/// Flat on-disk vector collection searched by brute-force cosine similarity.
/// Single process, single writer.
pub struct VectorDB {
    path: PathBuf,
    collection: Collection,
}

/// Creates a directory if it doesn't exist
fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    DirBuilder::new().recursive(true).create(path)?;
    Ok(())
}

impl VectorDB {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        ensure_dir(dir)
            .with_context(|| format!("failed to create persist directory {}", dir.display()))?;

        let path = dir.join(COLLECTION_FILE);
        let collection = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Collection::default()
        };

        info!(path = %path.display(), records = collection.records.len(), "opened vector store");
        Ok(VectorDB { path, collection })
    }

    pub fn len(&self) -> usize {
        self.collection.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.records.is_empty()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.collection.fingerprint.as_deref()
    }

    pub fn set_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.collection.fingerprint = Some(fingerprint.into());
    }

    pub fn dimension(&self) -> Option<usize> {
        self.collection.records.first().map(|r| r.embedding.len())
    }

    pub fn clear(&mut self) {
        self.collection.records.clear();
        self.collection.fingerprint = None;
    }

    /// Appends one record per chunk. Nothing is deduplicated.
    pub fn add(&mut self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            bail!(
                "got {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            );
        }

        let mut dimension = self.dimension();
        let first_index = self.len();
        let mut records = Vec::with_capacity(chunks.len());

        for (i, (chunk, vector)) in chunks.iter().zip(vectors).enumerate() {
            match dimension {
                Some(d) if d != vector.len() => {
                    bail!("vector dimension {} does not match store dimension {d}", vector.len())
                }
                None => dimension = Some(vector.len()),
                _ => {}
            }

            records.push(Record {
                id: Uuid::new_v4(),
                text: chunk.text.clone(),
                metadata: RecordMetadata {
                    source: chunk.source_id.clone(),
                    offset: chunk.offset,
                    chunk_index: first_index + i,
                },
                embedding: Array1::from(vector),
            });
        }

        debug!(added = records.len(), "appending records");
        self.collection.records.extend(records);
        Ok(())
    }

    /// Writes the collection to a temporary file and renames it into place.
    pub fn persist(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_string(&self.collection)?;
        fs::write(&tmp, raw).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move {} into place", tmp.display()))?;
        Ok(())
    }

    /// The `k` records most similar to `query`, best first. Equal scores keep
    /// insertion order.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<(f32, &Record)>> {
        if let Some(d) = self.dimension() {
            if d != query.len() {
                return Err(anyhow!(
                    "query dimension {} does not match store dimension {d}",
                    query.len()
                ));
            }
        }

        let query = ArrayView1::from(query);
        let mut similarities: Vec<(f32, &Record)> = self
            .collection
            .records
            .iter()
            .map(|record| (cosine_similarity(record.embedding.view(), query), record))
            .collect();

        similarities.sort_by(|a, b| b.0.total_cmp(&a.0));
        similarities.truncate(k);
        Ok(similarities)
    }
}

fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let dot_product = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
