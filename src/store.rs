use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::SlotSelection;
use crate::error::IndexError;
use crate::models::{ContentBlock, Page, Placeholder, TitleRecord};

/// Filter over title records, evaluated by the store
#[derive(Debug, Clone, PartialEq)]
pub struct TitleQuery {
    pub language: String,
    /// Reference time for the publication window
    pub now: DateTime<Utc>,
    /// Only published, non-draft titles
    pub public_only: bool,
    /// Only pages inside their publication window
    pub published_window: bool,
    /// Drop titles with a non-empty redirect
    pub exclude_redirects: bool,
}

impl TitleQuery {
    /// Every filter enabled: titles that may be indexed
    pub fn indexable(language: &str, now: DateTime<Utc>) -> Self {
        Self {
            language: language.to_string(),
            now,
            public_only: true,
            published_window: true,
            exclude_redirects: true,
        }
    }

    pub fn matches(&self, title: &TitleRecord) -> bool {
        title.language == self.language
            && (!self.public_only || title.is_public())
            && (!self.published_window || title.page.is_within_publication_window(self.now))
            && (!self.exclude_redirects || !title.has_redirect())
    }
}

/// Read access to the CMS content model
pub trait ContentStore {
    /// Titles matching the query, without duplicates, ordered by id
    fn titles(&self, query: &TitleQuery) -> Result<Vec<TitleRecord>>;

    fn title(&self, id: u64) -> Result<Option<TitleRecord>>;

    /// Placeholders of a page restricted to the selected slots
    fn placeholders(&self, page_id: u64, slots: &SlotSelection) -> Result<Vec<Placeholder>>;

    /// Blocks in the given placeholders and language, ordered by placeholder then position
    fn blocks(&self, placeholders: &[Placeholder], language: &str) -> Result<Vec<ContentBlock>>;

    /// Meta description of a page in a language.
    ///
    /// With `fallback` set, other languages of the page are tried when the
    /// requested one has none.
    fn meta_description(
        &self,
        page_id: u64,
        language: &str,
        fallback: bool,
    ) -> Result<Option<String>>;
}

impl<T: ContentStore + ?Sized> ContentStore for &T {
    fn titles(&self, query: &TitleQuery) -> Result<Vec<TitleRecord>> {
        (**self).titles(query)
    }

    fn title(&self, id: u64) -> Result<Option<TitleRecord>> {
        (**self).title(id)
    }

    fn placeholders(&self, page_id: u64, slots: &SlotSelection) -> Result<Vec<Placeholder>> {
        (**self).placeholders(page_id, slots)
    }

    fn blocks(&self, placeholders: &[Placeholder], language: &str) -> Result<Vec<ContentBlock>> {
        (**self).blocks(placeholders, language)
    }

    fn meta_description(
        &self,
        page_id: u64,
        language: &str,
        fallback: bool,
    ) -> Result<Option<String>> {
        (**self).meta_description(page_id, language, fallback)
    }
}

/// JSON shape of a content snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub titles: Vec<SnapshotTitle>,
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

/// Title row of a snapshot, referencing its page by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTitle {
    pub id: u64,
    pub page_id: u64,
    pub language: String,
    pub title: String,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub publisher_is_draft: bool,
    #[serde(default = "default_true")]
    pub published: bool,
    #[serde(default)]
    pub redirect: Option<String>,
}

fn default_true() -> bool {
    true
}

/// In-memory content store, typically loaded from a JSON snapshot
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pages: Vec<Page>,
    titles: Vec<TitleRecord>,
    placeholders: Vec<Placeholder>,
    blocks: Vec<ContentBlock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse content snapshot {}", path.display()))?;
        Self::from_snapshot(snapshot)
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut store = Self::new();
        for page in snapshot.pages {
            store.add_page(page);
        }
        for t in snapshot.titles {
            let page = store
                .page(t.page_id)
                .cloned()
                .ok_or(IndexError::PageNotFound(t.page_id))?;
            store.add_title(TitleRecord {
                id: t.id,
                page,
                language: t.language,
                title: t.title,
                meta_description: t.meta_description,
                publisher_is_draft: t.publisher_is_draft,
                published: t.published,
                redirect: t.redirect,
            });
        }
        for placeholder in snapshot.placeholders {
            store.add_placeholder(placeholder);
        }
        for block in snapshot.blocks {
            store.add_block(block);
        }
        Ok(store)
    }

    pub fn page(&self, id: u64) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Add or replace a page; titles of the page see the new version
    pub fn add_page(&mut self, page: Page) {
        for title in self.titles.iter_mut().filter(|t| t.page.id == page.id) {
            title.page = page.clone();
        }
        self.pages.retain(|p| p.id != page.id);
        self.pages.push(page);
    }

    /// Add or replace a title
    pub fn add_title(&mut self, title: TitleRecord) {
        self.titles.retain(|t| t.id != title.id);
        self.titles.push(title);
    }

    pub fn add_placeholder(&mut self, placeholder: Placeholder) {
        self.placeholders.retain(|p| p.id != placeholder.id);
        self.placeholders.push(placeholder);
    }

    pub fn add_block(&mut self, block: ContentBlock) {
        self.blocks.retain(|b| b.id != block.id);
        self.blocks.push(block);
    }
}

impl ContentStore for MemoryStore {
    fn titles(&self, query: &TitleQuery) -> Result<Vec<TitleRecord>> {
        // Ids are unique, `add_title` replaces rows with the same id
        let mut titles: Vec<TitleRecord> = self
            .titles
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        titles.sort_by_key(|t| t.id);
        Ok(titles)
    }

    fn title(&self, id: u64) -> Result<Option<TitleRecord>> {
        Ok(self.titles.iter().find(|t| t.id == id).cloned())
    }

    fn placeholders(&self, page_id: u64, slots: &SlotSelection) -> Result<Vec<Placeholder>> {
        let mut placeholders: Vec<Placeholder> = self
            .placeholders
            .iter()
            .filter(|p| p.page_id == page_id && slots.includes(&p.slot))
            .cloned()
            .collect();
        placeholders.sort_by_key(|p| p.id);
        Ok(placeholders)
    }

    fn blocks(&self, placeholders: &[Placeholder], language: &str) -> Result<Vec<ContentBlock>> {
        let mut blocks: Vec<ContentBlock> = self
            .blocks
            .iter()
            .filter(|b| b.language == language)
            .filter(|b| placeholders.iter().any(|p| p.id == b.placeholder_id))
            .cloned()
            .collect();
        blocks.sort_by_key(|b| (b.placeholder_id, b.position, b.id));
        Ok(blocks)
    }

    fn meta_description(
        &self,
        page_id: u64,
        language: &str,
        fallback: bool,
    ) -> Result<Option<String>> {
        // Only the public version of a title; drafts never leak into the index
        let candidate = |t: &&TitleRecord| {
            t.page.id == page_id
                && t.is_public()
                && t.meta_description.as_deref().is_some_and(|d| !d.is_empty())
        };

        let own = self
            .titles
            .iter()
            .filter(|t| t.language == language)
            .find(candidate);
        if let Some(title) = own {
            return Ok(title.meta_description.clone());
        }
        if !fallback {
            return Ok(None);
        }

        let mut others: Vec<&TitleRecord> = self
            .titles
            .iter()
            .filter(|t| t.language != language)
            .filter(candidate)
            .collect();
        others.sort_by_key(|t| t.id);
        Ok(others.first().and_then(|t| t.meta_description.clone()))
    }
}
