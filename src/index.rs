use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{PlaceholderPolicy, Settings};
use crate::content::{BlockTextExtractor, PluginTextExtractor, clean_join, collapse_whitespace};
use crate::error::IndexError;
use crate::models::TitleRecord;
use crate::store::{ContentStore, TitleQuery};

/// Context a document is built in
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    pub language: String,
    pub site_id: u64,
    pub now: DateTime<Utc>,
}

impl IndexRequest {
    pub fn new(language: &str, site_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            language: language.to_string(),
            site_id,
            now,
        }
    }

    /// Request for building a title's document in `language` right now
    pub fn for_title(title: &TitleRecord, language: &str) -> Self {
        Self::new(language, title.page.site_id, Utc::now())
    }
}

/// Flattened, indexable view of one page in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    /// Text extracted from the page content
    pub body: String,
    /// Full indexed text: the body, prefixed with the title when titles are indexed
    pub text: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub language: String,
    pub site_id: u64,
    pub login_required: bool,
}

/// What the search sink asks of an indexable model
pub trait SearchIndex {
    type Record;

    fn prepare_pub_date(&self, obj: &Self::Record) -> Option<DateTime<Utc>>;
    fn prepare_login_required(&self, obj: &Self::Record) -> bool;
    fn prepare_site_id(&self, obj: &Self::Record) -> u64;
    fn get_language(&self, obj: &Self::Record) -> String;
    fn get_url(&self, obj: &Self::Record) -> String;
    fn get_title(&self, obj: &Self::Record) -> String;
    fn get_description(&self, obj: &Self::Record) -> Option<String>;

    /// Body text of the record's document
    fn get_search_data(
        &self,
        obj: &Self::Record,
        language: &str,
        request: &IndexRequest,
    ) -> Result<String>;

    /// Records eligible for indexing in `language`
    fn get_index_queryset(&self, language: &str) -> Result<Vec<Self::Record>>;

    /// Whether a change to the record should reach the index
    fn should_update(&self, obj: &Self::Record) -> bool;

    /// Key of the record's document in the index
    fn document_id(&self, obj: &Self::Record) -> String;

    /// Whether the title is part of the indexed text
    fn index_title(&self) -> bool {
        true
    }

    /// Whether this index takes part in indexing at all
    fn use_for_indexing(&self) -> bool {
        true
    }

    fn build_document(
        &self,
        obj: &Self::Record,
        language: &str,
        request: &IndexRequest,
    ) -> Result<SearchDocument> {
        let record_language = self.get_language(obj);
        if record_language != language {
            return Err(IndexError::LanguageMismatch {
                document: self.document_id(obj),
                record: record_language,
                requested: language.to_string(),
            }
            .into());
        }

        let title = self.get_title(obj);
        let body = self.get_search_data(obj, &record_language, request)?;
        let text = if self.index_title() {
            clean_join(" ", [title.as_str(), body.as_str()])
        } else {
            body.clone()
        };

        Ok(SearchDocument {
            id: self.document_id(obj),
            url: self.get_url(obj),
            description: self.get_description(obj),
            pub_date: self.prepare_pub_date(obj),
            language: record_language,
            site_id: self.prepare_site_id(obj),
            login_required: self.prepare_login_required(obj),
            title,
            body,
            text,
        })
    }
}

/// Index key of a title's document
pub fn title_document_id(title_id: u64) -> String {
    format!("cms.title.{title_id}")
}

/// Search index over CMS page titles
#[derive(Debug, Clone)]
pub struct TitleIndex<S, E = PluginTextExtractor> {
    store: S,
    extractor: E,
    policy: PlaceholderPolicy,
    index_title: bool,
    use_for_indexing: bool,
}

impl<S: ContentStore> TitleIndex<S> {
    pub fn new(store: S, settings: &Settings) -> Self {
        let extractor = PluginTextExtractor::new(settings);
        Self::with_extractor(store, extractor, settings)
    }
}

impl<S: ContentStore, E: BlockTextExtractor> TitleIndex<S, E> {
    pub fn with_extractor(store: S, extractor: E, settings: &Settings) -> Self {
        Self {
            store,
            extractor,
            policy: settings.placeholders_search_list.clone(),
            index_title: settings.index_title,
            use_for_indexing: settings.cms_page,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Eligible titles in `language` as of `now`
    pub fn get_index_queryset_at(
        &self,
        language: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<TitleRecord>> {
        self.store.titles(&TitleQuery::indexable(language, now))
    }

    fn block_texts(
        &self,
        obj: &TitleRecord,
        language: &str,
        request: &IndexRequest,
    ) -> Result<Vec<String>> {
        let page = &obj.page;
        let slots = self.policy.resolve(page.reverse_id.as_deref())?;
        let placeholders = self.store.placeholders(page.id, &slots)?;
        let blocks = self.store.blocks(&placeholders, language)?;

        debug!(
            "Title {}: {} placeholders, {} blocks in {}",
            obj.id,
            placeholders.len(),
            blocks.len(),
            language
        );

        let mut texts = Vec::with_capacity(blocks.len());
        for block in &blocks {
            texts.push(self.extractor.extract_text(block, request)?);
        }
        Ok(texts)
    }
}

impl<S: ContentStore, E: BlockTextExtractor> SearchIndex for TitleIndex<S, E> {
    type Record = TitleRecord;

    fn prepare_pub_date(&self, obj: &TitleRecord) -> Option<DateTime<Utc>> {
        obj.page.publication_date
    }

    fn prepare_login_required(&self, obj: &TitleRecord) -> bool {
        obj.page.login_required
    }

    fn prepare_site_id(&self, obj: &TitleRecord) -> u64 {
        obj.page.site_id
    }

    fn get_language(&self, obj: &TitleRecord) -> String {
        obj.language.clone()
    }

    fn get_url(&self, obj: &TitleRecord) -> String {
        obj.page.absolute_url.clone()
    }

    fn get_title(&self, obj: &TitleRecord) -> String {
        obj.title.clone()
    }

    fn get_description(&self, obj: &TitleRecord) -> Option<String> {
        obj.meta_description.clone().filter(|d| !d.is_empty())
    }

    fn get_search_data(
        &self,
        obj: &TitleRecord,
        language: &str,
        request: &IndexRequest,
    ) -> Result<String> {
        let mut bits = self.block_texts(obj, language, request)?;

        if let Some(description) = self.store.meta_description(obj.page.id, language, false)? {
            bits.push(description);
        }
        if let Some(keywords) = &obj.page.meta_keywords {
            bits.push(keywords.clone());
        }

        // Fragments are plain text already; only the joins need tidying
        Ok(collapse_whitespace(&clean_join(" ", bits)))
    }

    fn get_index_queryset(&self, language: &str) -> Result<Vec<TitleRecord>> {
        self.get_index_queryset_at(language, Utc::now())
    }

    fn should_update(&self, obj: &TitleRecord) -> bool {
        !obj.publisher_is_draft
    }

    fn document_id(&self, obj: &TitleRecord) -> String {
        title_document_id(obj.id)
    }

    fn index_title(&self) -> bool {
        self.index_title
    }

    fn use_for_indexing(&self) -> bool {
        self.use_for_indexing
    }
}
