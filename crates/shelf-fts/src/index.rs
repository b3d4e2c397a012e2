//! Tantivy product index.
//!
//! [`TantivyProductIndex`] implements [`SearchIndex`] over a single Tantivy
//! index. Writes go through one `IndexWriter` behind a mutex and are
//! committed before the call returns, so a search issued afterwards sees
//! them. All Tantivy work runs on the blocking thread pool.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shelf_fts::{AnalysisSettings, TantivyProductIndex};
//!
//! let settings = AnalysisSettings::embedded()?;
//! let index = TantivyProductIndex::open_or_create(&data_dir, &settings)?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use shelf_core::{
    Error, Highlight, Hit, IndexSchema, PageRequest, ProductDocument, Result, SearchIndex,
    SearchQuery,
};
use tantivy::collector::TopDocs;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::document::{SourceValue, from_tantivy, source_value, to_tantivy};
use crate::highlight::highlight;
use crate::query::{CompiledQuery, QueryCompiler};
use crate::schema::TantivyMapping;
use crate::settings::AnalysisSettings;

/// Index writer buffer size (50MB).
const WRITER_BUFFER_SIZE: usize = 50_000_000;

struct Inner {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    mapping: TantivyMapping,
    path: Option<PathBuf>,
}

/// Product index backed by Tantivy.
#[derive(Clone)]
pub struct TantivyProductIndex {
    inner: Arc<Inner>,
}

impl TantivyProductIndex {
    /// Create an in-memory index (for testing).
    pub fn create_in_ram(settings: &AnalysisSettings) -> Result<Self> {
        let index_schema = IndexSchema::products();
        let mapping = TantivyMapping::build(&index_schema);
        let index = Index::create_in_ram(mapping.schema().clone());
        Self::from_index(index, mapping, settings, None)
    }

    /// Open the product index under `root`, creating it if absent.
    ///
    /// The index lives in `root/<index name>`. An existing index is never
    /// recreated; its schema must match the product schema.
    ///
    /// # Errors
    ///
    /// - [`Error::SchemaIncompatible`] if an existing index has a different mapping
    /// - [`Error::Config`] if `settings` lack an analyzer the schema uses
    /// - [`Error::Index`] if Tantivy cannot open or create the index
    pub fn open_or_create(root: &Path, settings: &AnalysisSettings) -> Result<Self> {
        let index_schema = IndexSchema::products();
        let path = root.join(index_schema.name());

        if Self::index_exists(&path) {
            let index = Index::open_in_dir(&path).map_err(|e| {
                Error::index_with_source(format!("Failed to open index at {}", path.display()), e)
            })?;
            let mapping = TantivyMapping::bind(&index_schema, &index.schema())?;
            log::info!("Opened index '{}' at {}", index_schema.name(), path.display());
            Self::from_index(index, mapping, settings, Some(path))
        } else {
            std::fs::create_dir_all(&path)?;
            let mapping = TantivyMapping::build(&index_schema);
            let index = Index::create_in_dir(&path, mapping.schema().clone()).map_err(|e| {
                Error::index_with_source(format!("Failed to create index at {}", path.display()), e)
            })?;
            log::info!("Created index '{}' at {}", index_schema.name(), path.display());
            Self::from_index(index, mapping, settings, Some(path))
        }
    }

    /// Check if an index exists at the given directory.
    pub fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    fn from_index(
        index: Index,
        mapping: TantivyMapping,
        settings: &AnalysisSettings,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        settings.register(index.tokenizers(), &mapping.index_schema().analyzers())?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::index_with_source("Failed to create index reader", e))?;

        let writer = index
            .writer_with_num_threads(1, WRITER_BUFFER_SIZE)
            .map_err(|e| Error::index_with_source("Failed to create index writer", e))?;

        Ok(Self {
            inner: Arc::new(Inner {
                index,
                reader,
                writer: Mutex::new(writer),
                mapping,
                path,
            }),
        })
    }

    /// Directory of an on-disk index.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// The field mapping in use.
    pub fn mapping(&self) -> &TantivyMapping {
        &self.inner.mapping
    }

    /// Number of searchable documents.
    pub fn num_docs(&self) -> u64 {
        self.inner.reader.searcher().num_docs()
    }

    /// Apply a write under the writer lock, commit, and refresh the reader.
    ///
    /// A failed write is rolled back, so nothing it queued survives.
    async fn write<F>(&self, operation: &'static str, apply: F) -> Result<()>
    where
        F: FnOnce(&Inner, &mut IndexWriter) -> Result<()> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut writer = inner.lock_writer()?;
            let applied = apply(&inner, &mut writer).and_then(|()| {
                writer.commit().map(drop).map_err(|e| {
                    Error::index_with_source(format!("Failed to commit {operation}"), e)
                })
            });
            // Pending operations of a failed write must not ride on the next commit
            if let Err(e) = applied {
                if let Err(rollback) = writer.rollback() {
                    log::error!("Failed to roll back index {operation}: {rollback}");
                }
                return Err(e);
            }
            inner
                .reader
                .reload()
                .map_err(|e| Error::index_with_source("Failed to reload index reader", e))
        })
        .await
        .map_err(|e| Error::index_with_source(format!("Index {operation} task failed"), e))?
    }
}

impl Inner {
    fn lock_writer(&self) -> Result<MutexGuard<'_, IndexWriter>> {
        self.writer
            .lock()
            .map_err(|_| Error::index("Index writer lock poisoned"))
    }

    fn id_term(&self, id: &str) -> Result<Term> {
        Ok(Term::from_field_text(self.mapping.id_field()?.field, id))
    }

    fn search(
        &self,
        query: &SearchQuery,
        page: PageRequest,
        highlight: Option<&Highlight>,
    ) -> Result<Vec<Hit>> {
        if page.size == 0 {
            return Ok(Vec::new());
        }
        page.check()?;

        let compiled =
            QueryCompiler::new(&self.mapping, self.index.tokenizers()).compile(query)?;
        let searcher = self.reader.searcher();
        let collector = TopDocs::with_limit(page.size)
            .and_offset(page.offset)
            .order_by_score();
        let top_docs = searcher
            .search(&compiled.query, &collector)
            .map_err(|e| Error::query_with_source("Search failed", e))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let stored: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| Error::query_with_source("Failed to load document", e))?;
            let document = from_tantivy(&stored, &self.mapping)?;
            let highlights = match highlight {
                Some(request) => self.highlights(&document, &compiled, request)?,
                None => Default::default(),
            };
            hits.push(Hit {
                document,
                score,
                highlights,
            });
        }
        Ok(hits)
    }

    fn highlights(
        &self,
        document: &ProductDocument,
        compiled: &CompiledQuery,
        request: &Highlight,
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut out = HashMap::new();

        for path in &request.fields {
            let mapped = self.mapping.require(path)?;
            let matchers = compiled.highlight_terms.for_field(path);
            let Some(SourceValue::Text(text)) = source_value(document, mapped.source()) else {
                continue;
            };
            let Some(mut analyzer) = self.index.tokenizers().get(mapped.tokenizer()) else {
                continue;
            };

            let fragments = highlight(text, &mut analyzer, matchers, &request.pre_tag, &request.post_tag);
            if !fragments.is_empty() {
                out.insert(path.clone(), fragments);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SearchIndex for TantivyProductIndex {
    async fn upsert(&self, id: &str, document: &ProductDocument) -> Result<()> {
        let id = id.to_string();
        let mut document = document.clone();
        document.id.clone_from(&id);

        self.write("upsert", move |inner, writer| {
            let tantivy_doc = to_tantivy(&document, &inner.mapping, inner.index.tokenizers())?;
            writer.delete_term(inner.id_term(&id)?);
            writer
                .add_document(tantivy_doc)
                .map_err(|e| Error::index_with_source("Failed to add document", e))?;
            log::debug!("Indexed product document {id}");
            Ok(())
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.write("delete", move |inner, writer| {
            writer.delete_term(inner.id_term(&id)?);
            log::debug!("Deleted product document {id}");
            Ok(())
        })
        .await
    }

    async fn search(
        &self,
        query: &SearchQuery,
        page: PageRequest,
        highlight: Option<&Highlight>,
    ) -> Result<Vec<Hit>> {
        log::debug!(
            "Searching '{}' (offset {}, size {}): {}",
            self.inner.mapping.index_schema().name(),
            page.offset,
            page.size,
            query.to_json_string()
        );

        let inner = Arc::clone(&self.inner);
        let query = query.clone();
        let highlight = highlight.cloned();
        tokio::task::spawn_blocking(move || inner.search(&query, page, highlight.as_ref()))
            .await
            .map_err(|e| Error::query_with_source("Search task failed", e))?
    }

    async fn clear(&self) -> Result<()> {
        self.write("clear", |_, writer| {
            writer
                .delete_all_documents()
                .map_err(|e| Error::index_with_source("Failed to clear index", e))?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}

impl std::fmt::Debug for TantivyProductIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyProductIndex")
            .field("index", &self.inner.mapping.index_schema().name())
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
