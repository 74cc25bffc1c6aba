//! SQLite-backed policy index.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use claimpilot_llm::SharedEmbedder;
use claimpilot_types::{PolicyExcerpt, PolicySection};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};
use crate::retriever::{PolicyIndexer, PolicyRetriever, similarity_from_distance};
use crate::vector;

/// Policy sections and their embeddings in a single SQLite file.
///
/// The connection sits behind a mutex and every query runs on tokio's
/// blocking pool, so the index can be shared freely between concurrent runs.
pub struct PolicyIndex {
    conn: Arc<Mutex<Connection>>,
    embedder: SharedEmbedder,
    dims: usize,
}

impl std::fmt::Debug for PolicyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyIndex")
            .field("embedder", &self.embedder.name())
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl PolicyIndex {
    /// Open or create an index at `path`.
    pub fn open(path: impl AsRef<Path>, embedder: SharedEmbedder) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|_| {
                    RetrievalError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
                })?;
            }
        }

        vector::init_vector_extension();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let index = Self::with_connection(conn, embedder)?;
        info!(path = ?path, dims = index.dims, "Policy index opened");
        Ok(index)
    }

    /// Create an in-memory index (useful for testing).
    pub fn open_in_memory(embedder: SharedEmbedder) -> Result<Self> {
        vector::init_vector_extension();
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, embedder)
    }

    fn with_connection(conn: Connection, embedder: SharedEmbedder) -> Result<Self> {
        let dims = embedder.dimensions();
        vector::create_tables(&conn, dims)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            dims,
        })
    }

    /// Embedding size this index accepts.
    pub fn dimensions(&self) -> usize {
        self.dims
    }

    fn check_dims(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dims {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dims,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RetrievalError::Internal("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| RetrievalError::Internal(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl PolicyRetriever for PolicyIndex {
    async fn retrieve(&self, query: &str, payer: &str, top_k: usize) -> Result<Vec<PolicyExcerpt>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        self.check_dims(&embedding)?;

        let payer_owned = payer.to_string();
        let matches = self
            .with_conn(move |conn| vector::search_payer(conn, &embedding, &payer_owned, top_k))
            .await?;

        let excerpts: Vec<PolicyExcerpt> = matches
            .into_iter()
            .map(|m| m.section.into_excerpt(similarity_from_distance(m.distance)))
            .collect();

        debug!(payer, top_k, found = excerpts.len(), "Retrieved policy excerpts");
        Ok(PolicyExcerpt::rank(excerpts, top_k))
    }
}

#[async_trait]
impl PolicyIndexer for PolicyIndex {
    async fn index_section(&self, section: PolicySection) -> Result<()> {
        let embedding = self.embedder.embed(&section.section_text).await?;
        self.check_dims(&embedding)?;
        self.with_conn(move |conn| vector::store_section(conn, &section, &embedding))
            .await
    }

    async fn index_sections(&self, sections: Vec<PolicySection>) -> Result<usize> {
        if sections.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = sections.iter().map(|s| s.section_text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != sections.len() {
            return Err(RetrievalError::InvalidData(format!(
                "embedder returned {} vectors for {} sections",
                embeddings.len(),
                sections.len()
            )));
        }
        for embedding in &embeddings {
            self.check_dims(embedding)?;
        }

        let count = self
            .with_conn(move |conn| {
                let items = sections.iter().zip(embeddings.iter().map(Vec::as_slice));
                vector::store_sections(conn, items)
            })
            .await?;

        info!(count, "Indexed policy sections");
        Ok(count)
    }

    async fn list_payers(&self) -> Result<Vec<(String, usize)>> {
        self.with_conn(vector::list_payers).await
    }

    async fn count_sections(&self, payer: Option<&str>) -> Result<usize> {
        let payer = payer.map(str::to_string);
        self.with_conn(move |conn| vector::count_sections(conn, payer.as_deref()))
            .await
    }

    async fn clear_payer(&self, payer: &str) -> Result<usize> {
        let payer = payer.to_string();
        self.with_conn(move |conn| vector::clear_payer(conn, &payer))
            .await
    }
}
