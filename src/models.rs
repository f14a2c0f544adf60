use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A CMS page: the language-independent part of what gets indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: u64,
    /// Human-assigned lookup key used to target settings at a page
    #[serde(default)]
    pub reverse_id: Option<String>,
    pub site_id: u64,
    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub publication_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub login_required: bool,
    pub absolute_url: String,
    #[serde(default)]
    pub meta_keywords: Option<String>,
}

impl Page {
    /// Whether `now` falls inside the page's publication window.
    ///
    /// The start bound is exclusive and the end bound inclusive; unset bounds
    /// are open.
    pub fn is_within_publication_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.publication_date.is_none_or(|start| start < now);
        let not_ended = self.publication_end_date.is_none_or(|end| end >= now);
        started && not_ended
    }
}

/// One language version of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: u64,
    pub page: Page,
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

impl TitleRecord {
    /// Public copies are the published, non-draft side of a title
    pub fn is_public(&self) -> bool {
        self.published && !self.publisher_is_draft
    }

    pub fn has_redirect(&self) -> bool {
        self.redirect.as_deref().is_some_and(|r| !r.is_empty())
    }
}

fn default_true() -> bool {
    true
}

/// Named content slot of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub id: u64,
    pub page_id: u64,
    pub slot: String,
}

/// Plugin-specific payload attached to a content block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginInstance {
    /// Text attributes of the plugin, by field name
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Fields whose values are indexed
    #[serde(default)]
    pub search_fields: Vec<String>,
    /// Per-instance override of whether rendered output is indexed
    #[serde(default)]
    pub search_fulltext: Option<bool>,
    /// Rendered markup of the plugin
    #[serde(default)]
    pub rendered: Option<String>,
}

/// One unit of content in a placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: u64,
    pub placeholder_id: u64,
    pub language: String,
    #[serde(default)]
    pub position: u32,
    pub plugin_type: String,
    /// `None` for an empty plugin
    #[serde(default)]
    pub instance: Option<PluginInstance>,
}
