use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::IndexError;

/// Policy key matching every page without its own entry
pub const WILDCARD_KEY: &str = "*";

/// Prefix marking a slot name as excluded
pub const EXCLUDE_PREFIX: char = '-';

/// Site settings for the page search index
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Which placeholders to search, per page reverse id (empty means all)
    #[serde(default, alias = "PLACEHOLDERS_SEARCH_LIST")]
    pub placeholders_search_list: PlaceholderPolicy,

    /// Whether CMS titles take part in indexing at all
    #[serde(default = "default_true")]
    pub cms_page: bool,

    /// Prefix the indexed text with the page title
    #[serde(default = "default_true")]
    pub index_title: bool,

    /// Languages indexed when a rebuild names none
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Whether rendered plugin output is indexed when nothing more specific says so
    #[serde(default)]
    pub search_fulltext_default: bool,

    /// Per plugin type override of `search_fulltext_default`
    #[serde(default)]
    pub plugin_fulltext: HashMap<String, bool>,

    /// Directory of the tantivy index
    #[serde(default)]
    pub index_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            placeholders_search_list: PlaceholderPolicy::default(),
            cms_page: true,
            index_title: true,
            languages: default_languages(),
            search_fulltext_default: false,
            plugin_fulltext: HashMap::new(),
            index_dir: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

impl Settings {
    /// Load settings from a JSON file and validate them
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values that can never match anything
    pub fn validate(&self) -> Result<(), IndexError> {
        self.placeholders_search_list.validate()?;
        if self.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(IndexError::InvalidSettings(
                "languages must not contain empty codes".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether rendered output of a plugin type is indexed by default
    pub fn plugin_search_fulltext(&self, plugin_type: &str) -> bool {
        self.plugin_fulltext
            .get(plugin_type)
            .copied()
            .unwrap_or(self.search_fulltext_default)
    }

    /// Index directory, falling back to the platform data directory
    pub fn resolved_index_dir(&self) -> PathBuf {
        self.index_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cms-page-search")
                .join("index")
        })
    }
}

/// Placeholders to search on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSelection {
    /// Every placeholder of the page
    All,
    /// Only placeholders with these slot names, in configured order
    Only(Vec<String>),
}

impl SlotSelection {
    pub fn includes(&self, slot: &str) -> bool {
        match self {
            SlotSelection::All => true,
            SlotSelection::Only(slots) => slots.iter().any(|s| s == slot),
        }
    }
}

/// Mapping of page reverse id (or `*`) to slot names.
///
/// A leading `-` marks a slot as excluded. Excluded names are only left out
/// of the inclusion list; they do not filter anything on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PlaceholderPolicy(BTreeMap<String, Vec<String>>);

impl PlaceholderPolicy {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        for (key, slots) in &self.0 {
            if key.is_empty() {
                return Err(IndexError::InvalidSettings(
                    "PLACEHOLDERS_SEARCH_LIST keys must not be empty".to_string(),
                ));
            }
            if slots
                .iter()
                .any(|s| s.trim_start_matches(EXCLUDE_PREFIX).is_empty())
            {
                return Err(IndexError::InvalidSettings(format!(
                    "PLACEHOLDERS_SEARCH_LIST entry {key:?} has an empty slot name"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the slots to search for a page with the given reverse id.
    ///
    /// A page's own entry wins over `*`. A non-empty policy that has neither
    /// is a configuration error.
    pub fn resolve(&self, reverse_id: Option<&str>) -> Result<SlotSelection, IndexError> {
        if self.0.is_empty() {
            return Ok(SlotSelection::All);
        }

        let reverse_id = reverse_id.filter(|r| !r.is_empty());
        let entry = reverse_id
            .and_then(|r| self.0.get(r))
            .or_else(|| self.0.get(WILDCARD_KEY))
            .ok_or_else(|| IndexError::MissingPolicyEntry {
                reverse_id: reverse_id.map(str::to_string),
            })?;

        let slots = entry
            .iter()
            .filter(|s| !s.starts_with(EXCLUDE_PREFIX))
            .cloned()
            .collect();
        Ok(SlotSelection::Only(slots))
    }
}
