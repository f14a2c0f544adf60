use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tantivy::{Index, IndexWriter, TantivyDocument, Term, directory::MmapDirectory};
use tracing::{debug, info, warn};

use super::schema::PageSchema;
use super::tokenizer::{register_tokenizers, uses_japanese_segmentation};
use crate::error::IndexError;
use crate::index::{IndexRequest, SearchDocument, SearchIndex};

/// Default heap size for index writer (50MB)
pub const DEFAULT_WRITER_HEAP_SIZE: usize = 50_000_000;

/// Minimum heap size accepted by tantivy (15MB)
pub const MIN_WRITER_HEAP_SIZE: usize = 15_000_000;

/// Outcome of a full rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    pub errors: usize,
}

/// Writes search documents into the page index
#[derive(Debug, Clone)]
pub struct PageIndexer {
    index: Index,
    schema: PageSchema,
}

impl PageIndexer {
    /// Create a new indexer
    pub fn new(index: Index, schema: PageSchema) -> Self {
        Self { index, schema }
    }

    /// Open the index in `path`, creating it when missing
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).context("Failed to create index directory")?;

        let schema = PageSchema::new();

        // Reuse an index left by an earlier run
        let directory = MmapDirectory::open(path).context("Failed to open index directory")?;

        let index = if Index::exists(&directory)? {
            info!("Using existing index: {:?}", path);
            Index::open(directory).context("Failed to open existing index")?
        } else {
            info!("Creating new index: {:?}", path);
            Index::create(directory, schema.schema.clone(), Default::default())
                .context("Failed to create new index")?
        };

        // Tokenizers are not persisted with the index
        register_tokenizers(&index)?;
        Ok(Self::new(index, schema))
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn schema(&self) -> &PageSchema {
        &self.schema
    }

    /// Create an index writer
    pub fn create_writer(&self, heap_size: usize) -> Result<IndexWriter> {
        self.index
            .writer(heap_size.max(MIN_WRITER_HEAP_SIZE))
            .context("Failed to create index writer")
    }

    /// Create a tantivy document from a search document
    pub fn create_document(&self, doc: &SearchDocument) -> TantivyDocument {
        let mut tantivy_doc = TantivyDocument::new();

        // Stored fields shown in results
        tantivy_doc.add_text(self.schema.id, &doc.id);
        tantivy_doc.add_text(self.schema.title, &doc.title);
        tantivy_doc.add_text(self.schema.url, &doc.url);

        if let Some(description) = &doc.description {
            tantivy_doc.add_text(self.schema.description, description);
        }

        // Searchable text
        tantivy_doc.add_text(self.schema.text, &doc.text);
        if uses_japanese_segmentation(&doc.language) {
            tantivy_doc.add_text(self.schema.text_ja, &doc.text);
        }

        // Filter fields
        tantivy_doc.add_text(self.schema.language, &doc.language);
        tantivy_doc.add_u64(self.schema.site_id, doc.site_id);
        tantivy_doc.add_bool(self.schema.login_required, doc.login_required);

        if let Some(pub_date) = doc.pub_date {
            tantivy_doc.add_i64(self.schema.pub_date, pub_date.timestamp());
        }

        tantivy_doc
    }

    /// Build a record's document and add it to the writer
    fn index_object<I: SearchIndex>(
        &self,
        writer: &mut IndexWriter,
        search_index: &I,
        obj: &I::Record,
        language: &str,
    ) -> Result<()> {
        let request = IndexRequest::new(language, search_index.prepare_site_id(obj), Utc::now());
        let doc = search_index.build_document(obj, language, &request)?;
        writer.add_document(self.create_document(&doc))?;
        Ok(())
    }

    /// Replace every document of `language` with freshly built ones.
    ///
    /// Records that fail to build are skipped and counted, except for a
    /// missing placeholder policy entry, which aborts the run without
    /// committing anything.
    pub fn build_index<I: SearchIndex>(
        &self,
        search_index: &I,
        language: &str,
    ) -> Result<IndexReport> {
        if !search_index.use_for_indexing() {
            info!("Page indexing is disabled, skipping {}", language);
            return Ok(IndexReport::default());
        }

        let records = search_index.get_index_queryset(language)?;
        info!("Building {} index for {} pages", language, records.len());

        // Clear the language's documents; nothing is visible until commit
        let mut writer = self.create_writer(DEFAULT_WRITER_HEAP_SIZE)?;
        writer.delete_term(Term::from_field_text(self.schema.language, language));

        let mut report = IndexReport::default();
        for obj in &records {
            match self.index_object(&mut writer, search_index, obj, language) {
                Ok(()) => report.indexed += 1,
                Err(e) if is_configuration_error(&e) => {
                    // Keep the previous index intact
                    writer.rollback()?;
                    return Err(e);
                }
                Err(e) => {
                    warn!("Failed to index {}: {:#}", search_index.document_id(obj), e);
                    report.errors += 1;
                }
            }
        }

        writer.commit().context("Failed to commit index")?;

        info!(
            "Index built for {}: {} successful, {} errors",
            language, report.indexed, report.errors
        );

        Ok(report)
    }

    /// Reindex one record after it changed.
    ///
    /// Returns whether a document for the record is in the index afterwards.
    pub fn update_object<I: SearchIndex>(
        &self,
        search_index: &I,
        obj: &I::Record,
        language: &str,
    ) -> Result<bool> {
        if !search_index.use_for_indexing() || !search_index.should_update(obj) {
            debug!("Skipping update of {}", search_index.document_id(obj));
            return Ok(false);
        }

        let doc_id = search_index.document_id(obj);

        // The stored record may have left the eligible set since it changed
        let current = search_index
            .get_index_queryset(language)?
            .into_iter()
            .find(|r| search_index.document_id(r) == doc_id);

        // Delete first, then re-add if still eligible
        let mut writer = self.create_writer(MIN_WRITER_HEAP_SIZE)?;
        writer.delete_term(Term::from_field_text(self.schema.id, &doc_id));

        let indexed = match &current {
            Some(record) => {
                self.index_object(&mut writer, search_index, record, language)?;
                true
            }
            None => false,
        };

        writer.commit()?;
        debug!("Updated {} in index (indexed: {})", doc_id, indexed);

        Ok(indexed)
    }

    /// Delete a document from the index
    pub fn remove_object(&self, doc_id: &str) -> Result<()> {
        let mut writer = self.create_writer(MIN_WRITER_HEAP_SIZE)?;
        writer.delete_term(Term::from_field_text(self.schema.id, doc_id));
        writer.commit()?;
        debug!("Deleted {} from index", doc_id);
        Ok(())
    }
}

fn is_configuration_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::MissingPolicyEntry { .. } | IndexError::InvalidSettings(_))
    )
}
