//! Persisted vector store
//!
//! An owned handle over the indexed chunks: records live in memory for exact
//! cosine search and are persisted as a single JSON file in the service's
//! directory. The store is written only during indexing; queries are
//! read-only and safe for concurrent callers.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::RagError;

const STORE_FILE: &str = "chunks.json";

/// Provenance of a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_url: String,
    pub title: String,
    /// Ordinal of the section within the corpus.
    pub section: usize,
    /// Ordinal of the chunk within its section.
    pub chunk: usize,
}

/// One indexed chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Stable id, deterministic for a fixed corpus.
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk<'a> {
    pub score: f32,
    pub record: &'a ChunkRecord,
}

/// In-memory chunk index with JSON persistence.
pub struct VectorStore {
    dir: PathBuf,
    records: Vec<ChunkRecord>,
}

impl VectorStore {
    /// Create an empty store rooted at `dir`.
    pub fn empty(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            records: Vec::new(),
        }
    }

    /// Whether a persisted store exists under `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(STORE_FILE).is_file()
    }

    /// Load a persisted store.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self, RagError> {
        let dir = dir.into();
        let path = dir.join(STORE_FILE);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| RagError::Store(format!("failed to read {}: {}", path.display(), e)))?;
        let records: Vec<ChunkRecord> = serde_json::from_str(&raw)
            .map_err(|e| RagError::Store(format!("corrupt store {}: {}", path.display(), e)))?;
        Ok(Self { dir, records })
    }

    /// Replace the store contents.
    pub fn replace_all(&mut self, records: Vec<ChunkRecord>) {
        self.records = records;
    }

    /// Persist the store. Writes to a temp file and renames so a crash never
    /// leaves a half-written store behind.
    pub fn persist(&self) -> Result<(), RagError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| RagError::Store(format!("failed to create store dir: {}", e)))?;
        let tmp = self.dir.join(format!("{}.tmp", STORE_FILE));
        let path = self.dir.join(STORE_FILE);
        let raw = serde_json::to_string(&self.records)
            .map_err(|e| RagError::Store(e.to_string()))?;
        std::fs::write(&tmp, raw)
            .map_err(|e| RagError::Store(format!("failed to write store: {}", e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| RagError::Store(format!("failed to finalize store: {}", e)))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    /// Exact cosine top-`n`; ties keep insertion order.
    pub fn search(&self, query: &[f32], n: usize) -> Vec<ScoredChunk<'_>> {
        let mut scored: Vec<ScoredChunk<'_>> = self
            .records
            .iter()
            .map(|record| ScoredChunk {
                score: cosine(query, &record.embedding),
                record,
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n);
        scored
    }
}

/// Cosine similarity; zero when either vector has zero norm or lengths
/// differ.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
