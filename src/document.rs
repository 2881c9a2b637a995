use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::info;

use crate::error::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source_id: String,
}

/// A contiguous span of a document. `offset` counts characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub offset: usize,
}

/// Reads a UTF-8 text file into a single document identified by its path.
pub fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();

    // A directory is not a readable file either.
    if path.is_dir() {
        return Err(RagError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(RagError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(RagError::SourceUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    info!(path = %path.display(), chars = text.chars().count(), "loaded document");
    Ok(Document {
        text,
        source_id: path.display().to_string(),
    })
}
