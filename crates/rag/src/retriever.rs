//! Retrieval facade
//!
//! Owns the corpus, the vector store handle and the embedder; everything
//! else in the gateway talks to retrieval through this type. After indexing
//! the retriever is read-only and shared across sessions.

use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

use voice_gateway_config::RetrievalSettings;

use crate::chunker::chunk_text;
use crate::corpus::{load_corpus, Section};
use crate::embeddings::Embedder;
use crate::keyword::keyword_search;
use crate::store::{ChunkMetadata, ChunkRecord, VectorStore};
use crate::RagError;

/// Returned when neither search path produced a hit.
pub const NO_RESULTS_MESSAGE: &str = "No relevant information found in the knowledge base.";

/// Read-only retrieval service.
pub struct Retriever {
    settings: RetrievalSettings,
    sections: Vec<Section>,
    embedder: Option<Arc<dyn Embedder>>,
    store: RwLock<Option<VectorStore>>,
}

impl Retriever {
    /// Build the retriever: load the corpus (fatal if missing) and prepare
    /// the vector store, reusing a persisted index unless a rebuild is
    /// forced. Embedding failure during indexing is fatal.
    pub async fn initialize(
        settings: RetrievalSettings,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self, RagError> {
        let sections = load_corpus(Path::new(&settings.corpus_path))?;
        tracing::info!(sections = sections.len(), "Loaded knowledge corpus");

        let retriever = Self {
            settings,
            sections,
            embedder,
            store: RwLock::new(None),
        };

        if !retriever.settings.use_vector_store {
            tracing::info!("Vector store disabled, keyword fallback only");
            return Ok(retriever);
        }

        let Some(embedder) = retriever.embedder.clone() else {
            tracing::warn!("No embedder configured, keyword fallback only");
            return Ok(retriever);
        };

        let dir = Path::new(&retriever.settings.persist_dir);
        if !retriever.settings.force_reindex && VectorStore::exists(dir) {
            let store = VectorStore::load(dir)?;
            tracing::info!(chunks = store.len(), "Loaded persisted vector store");
            *retriever.store.write() = Some(store);
        } else {
            let store = retriever.build_index(embedder.as_ref()).await?;
            tracing::info!(chunks = store.len(), "Indexed knowledge corpus");
            *retriever.store.write() = Some(store);
        }

        Ok(retriever)
    }

    /// Chunk, embed and persist the whole corpus.
    async fn build_index(&self, embedder: &dyn Embedder) -> Result<VectorStore, RagError> {
        let mut texts = Vec::new();
        let mut metas = Vec::new();

        for (section_idx, section) in self.sections.iter().enumerate() {
            let chunks = chunk_text(&section.text, self.settings.chunk_size, self.settings.overlap);
            for (chunk_idx, chunk) in chunks.into_iter().enumerate() {
                metas.push(ChunkMetadata {
                    source_url: section.source_url.clone(),
                    title: section.title.clone(),
                    section: section_idx,
                    chunk: chunk_idx,
                });
                texts.push(chunk);
            }
        }

        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "embedded {} of {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        let records = texts
            .into_iter()
            .zip(embeddings)
            .zip(metas)
            .map(|((text, embedding), metadata)| ChunkRecord {
                id: chunk_id(&metadata),
                text,
                embedding,
                metadata,
            })
            .collect();

        let mut store = VectorStore::empty(&self.settings.persist_dir);
        store.replace_all(records);
        store.persist()?;
        Ok(store)
    }

    /// Whether vector search is live (as opposed to fallback-only).
    pub fn vector_ready(&self) -> bool {
        self.store.read().as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Answer a knowledge query with up to `k` formatted passages.
    ///
    /// Vector path: embed once, retrieve top `2k` by cosine, dedup by exact
    /// text keeping the first, take `k`. Any embedding failure at query time
    /// degrades to the keyword fallback for this query.
    pub async fn query(&self, text: &str, k: usize) -> String {
        let k = if k == 0 { self.settings.default_top_k } else { k };

        if self.vector_ready() {
            if let Some(embedder) = &self.embedder {
                match embedder.embed(text).await {
                    Ok(query_vec) => return self.vector_query(&query_vec, k),
                    Err(e) => {
                        tracing::warn!(error = %e, "Embedding failed, using keyword fallback");
                    }
                }
            }
        }

        self.fallback_query(text, k)
    }

    fn vector_query(&self, query_vec: &[f32], k: usize) -> String {
        let guard = self.store.read();
        let Some(store) = guard.as_ref() else {
            return NO_RESULTS_MESSAGE.to_string();
        };

        let hits = store.search(query_vec, 2 * k);
        let mut seen = std::collections::HashSet::new();
        let passages: Vec<String> = hits
            .iter()
            .filter(|hit| seen.insert(hit.record.text.as_str()))
            .take(k)
            .map(|hit| format_passage(&hit.record.metadata.title, &hit.record.text))
            .collect();

        join_passages(passages)
    }

    fn fallback_query(&self, text: &str, k: usize) -> String {
        let hits = keyword_search(text, &self.sections, k);
        let passages: Vec<String> = hits
            .iter()
            .map(|hit| format_passage(&hit.section.title, &hit.section.text))
            .collect();
        join_passages(passages)
    }
}

/// Deterministic chunk id: slug of the title plus section/chunk ordinals.
fn chunk_id(meta: &ChunkMetadata) -> String {
    let slug: String = meta
        .title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(40)
        .collect();
    format!("{}-s{}-c{}", slug, meta.section, meta.chunk)
}

fn format_passage(title: &str, text: &str) -> String {
    format!("[{}]\n{}", title, text.trim())
}

fn join_passages(passages: Vec<String>) -> String {
    if passages.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }
    passages.join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::SimpleEmbedder;
    use async_trait::async_trait;

    fn write_corpus(dir: &Path) -> String {
        let path = dir.join("knowledge.txt");
        std::fs::write(
            &path,
            "SOURCE: https://bank.example/cards\n\
             TITLE: How to freeze a card\n\
             To freeze your card, open the app and tap the freeze button. \
             A frozen card declines all new payments until you unfreeze it.\n\
             =====\n\
             SOURCE: https://bank.example/fees\n\
             TITLE: Account fees\n\
             The account has no monthly fee. International transfers cost a \
             small fixed fee shown before you confirm.\n\
             =====\n\
             TITLE: Savings interest\n\
             Savings balances earn interest, paid monthly into the savings pot.\n",
        )
        .unwrap();
        path.display().to_string()
    }

    fn settings(dir: &Path) -> RetrievalSettings {
        RetrievalSettings {
            corpus_path: write_corpus(dir),
            persist_dir: dir.join("store").display().to_string(),
            use_vector_store: true,
            force_reindex: false,
            chunk_size: 500,
            overlap: 100,
            default_top_k: 3,
        }
    }

    #[tokio::test]
    async fn test_indexes_and_answers() {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(SimpleEmbedder::new(64));
        let retriever = Retriever::initialize(settings(dir.path()), Some(embedder))
            .await
            .unwrap();

        assert!(retriever.vector_ready());
        let answer = retriever.query("how do I freeze my card", 3).await;
        assert!(answer.starts_with('['), "answer should carry a title prefix");
        assert!(answer.contains("freeze"));
    }

    #[tokio::test]
    async fn test_reindex_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(SimpleEmbedder::new(64));

        let mut s = settings(dir.path());
        s.force_reindex = true;

        let r1 = Retriever::initialize(s.clone(), Some(embedder.clone()))
            .await
            .unwrap();
        let ids1: Vec<String> = r1.store.read().as_ref().unwrap().records().iter().map(|r| r.id.clone()).collect();
        let answer1 = r1.query("freeze card", 2).await;

        let r2 = Retriever::initialize(s, Some(embedder)).await.unwrap();
        let ids2: Vec<String> = r2.store.read().as_ref().unwrap().records().iter().map(|r| r.id.clone()).collect();
        let answer2 = r2.query("freeze card", 2).await;

        assert_eq!(ids1, ids2);
        assert_eq!(answer1, answer2);
    }

    #[tokio::test]
    async fn test_persisted_store_reused() {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(SimpleEmbedder::new(64));
        let s = settings(dir.path());

        let _first = Retriever::initialize(s.clone(), Some(embedder.clone()))
            .await
            .unwrap();
        assert!(VectorStore::exists(Path::new(&s.persist_dir)));

        // Second boot loads the persisted store instead of re-embedding.
        let second = Retriever::initialize(s, Some(embedder)).await.unwrap();
        assert!(second.vector_ready());
    }

    #[tokio::test]
    async fn test_vector_store_disabled_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.use_vector_store = false;

        let retriever = Retriever::initialize(s, None).await.unwrap();
        assert!(!retriever.vector_ready());

        let answer = retriever.query("freeze card", 2).await;
        assert!(answer.contains("[How to freeze a card]"));
    }

    struct FailingEmbedder {
        inner: SimpleEmbedder,
        fail_queries: bool,
    }

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            // Indexing embeds many texts at once; queries embed one.
            if self.fail_queries && texts.len() == 1 {
                return Err(RagError::Embedding("service down".to_string()));
            }
            self.inner.embed_batch(texts).await
        }
    }

    #[tokio::test]
    async fn test_query_embedding_failure_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(FailingEmbedder {
            inner: SimpleEmbedder::new(64),
            fail_queries: true,
        });

        let retriever = Retriever::initialize(settings(dir.path()), Some(embedder))
            .await
            .unwrap();
        assert!(retriever.vector_ready());

        let answer = retriever.query("freeze card", 2).await;
        // Fallback formats whole sections, still with the title prefix.
        assert!(answer.contains("[How to freeze a card]"));
    }

    #[tokio::test]
    async fn test_no_match_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.use_vector_store = false;
        let retriever = Retriever::initialize(s, None).await.unwrap();

        let answer = retriever.query("zebra migration patterns", 3).await;
        assert_eq!(answer, NO_RESULTS_MESSAGE);
    }

    #[test]
    fn test_chunk_id_is_slugged() {
        let meta = ChunkMetadata {
            source_url: String::new(),
            title: "How to freeze a card".to_string(),
            section: 2,
            chunk: 5,
        };
        assert_eq!(chunk_id(&meta), "how-to-freeze-a-card-s2-c5");
    }

    #[test]
    fn test_passages_joined_with_separator() {
        let joined = join_passages(vec![
            format_passage("A", "first"),
            format_passage("B", "second"),
        ]);
        assert_eq!(joined, "[A]\nfirst\n---\n[B]\nsecond");
    }
}
