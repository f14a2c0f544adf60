use anyhow::Result;
use regex::Regex;
use scraper::Html;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::Settings;
use crate::index::IndexRequest;
use crate::models::ContentBlock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Turns one content block into plain-text fragments
pub trait BlockTextExtractor {
    fn extract(&self, block: &ContentBlock, request: &IndexRequest) -> Result<Vec<String>>;

    /// All fragments of a block joined into one string
    fn extract_text(&self, block: &ContentBlock, request: &IndexRequest) -> Result<String> {
        Ok(clean_join(" ", self.extract(block, request)?))
    }
}

/// Extractor for plugin blocks.
///
/// Indexes the plugin's `search_fields` and, when full-text search is on for
/// the block, the text of its rendered markup.
#[derive(Debug, Clone, Default)]
pub struct PluginTextExtractor {
    search_fulltext_default: bool,
    plugin_fulltext: HashMap<String, bool>,
}

impl PluginTextExtractor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            search_fulltext_default: settings.search_fulltext_default,
            plugin_fulltext: settings.plugin_fulltext.clone(),
        }
    }

    fn search_fulltext(&self, block: &ContentBlock, instance_override: Option<bool>) -> bool {
        instance_override
            .or_else(|| self.plugin_fulltext.get(&block.plugin_type).copied())
            .unwrap_or(self.search_fulltext_default)
    }
}

impl BlockTextExtractor for PluginTextExtractor {
    fn extract(&self, block: &ContentBlock, _request: &IndexRequest) -> Result<Vec<String>> {
        // Empty plugin
        let Some(instance) = &block.instance else {
            return Ok(Vec::new());
        };

        let mut bits: Vec<String> = instance
            .search_fields
            .iter()
            .filter_map(|field| instance.fields.get(field))
            .map(|value| strip_tags(value))
            .collect();

        if self.search_fulltext(block, instance.search_fulltext) {
            if let Some(rendered) = &instance.rendered {
                bits.extend(cleaned_bits(rendered));
            }
        }

        bits.retain(|b| !b.is_empty());
        Ok(bits)
    }
}

/// Remove markup, keeping the text of every node separated by single spaces
pub fn strip_tags(markup: &str) -> String {
    if !markup.contains('<') && !markup.contains('&') {
        return collapse_whitespace(markup);
    }
    let fragment = Html::parse_fragment(markup);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

/// Text nodes of rendered markup, each trimmed, empty ones dropped
pub fn cleaned_bits(markup: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(markup);
    fragment
        .root_element()
        .text()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Trim every bit, drop empty ones and join the rest with `separator`
pub fn clean_join<I, S>(separator: &str, bits: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for bit in bits {
        let trimmed = bit.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push_str(separator);
        }
        text.push_str(trimmed);
    }
    text
}

/// Trim and turn every whitespace run into a single space
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PluginInstance;
    use chrono::Utc;

    fn request() -> IndexRequest {
        IndexRequest::new("en", 1, Utc::now())
    }

    fn block(plugin_type: &str, instance: Option<PluginInstance>) -> ContentBlock {
        ContentBlock {
            id: 1,
            placeholder_id: 1,
            language: "en".to_string(),
            position: 0,
            plugin_type: plugin_type.to_string(),
            instance,
        }
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello</p><p>world</p>"), "Hello world");
        assert_eq!(strip_tags("  plain\n\ttext "), "plain text");
        assert_eq!(strip_tags("Fish &amp; <b>chips</b>"), "Fish & chips");
        assert_eq!(strip_tags(""), "");
    }

    #[test]
    fn test_clean_join() {
        assert_eq!(clean_join(" ", ["  a ", "", "  ", "b"]), "a b");
        assert_eq!(clean_join(", ", Vec::<String>::new()), "");
    }

    #[test]
    fn test_empty_plugin_yields_nothing() {
        let extractor = PluginTextExtractor::default();
        let text = extractor
            .extract_text(&block("TextPlugin", None), &request())
            .unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_search_fields_are_stripped() {
        let mut instance = PluginInstance::default();
        instance
            .fields
            .insert("body".to_string(), "<p>Hello <em>world</em></p>".to_string());
        instance
            .fields
            .insert("secret".to_string(), "not indexed".to_string());
        instance.search_fields = vec!["body".to_string(), "missing".to_string()];

        let extractor = PluginTextExtractor::default();
        let bits = extractor
            .extract(&block("TextPlugin", Some(instance)), &request())
            .unwrap();
        assert_eq!(bits, vec!["Hello world".to_string()]);
    }

    #[test]
    fn test_fulltext_precedence() {
        let instance = PluginInstance {
            rendered: Some("<div><h2>Title</h2>\n<p>Body text</p></div>".to_string()),
            ..Default::default()
        };

        let settings = Settings {
            plugin_fulltext: HashMap::from([("TextPlugin".to_string(), true)]),
            ..Default::default()
        };
        let extractor = PluginTextExtractor::new(&settings);

        let text = extractor
            .extract_text(&block("TextPlugin", Some(instance.clone())), &request())
            .unwrap();
        assert_eq!(text, "Title Body text");

        // Plugin type without an override falls back to the default (off)
        let text = extractor
            .extract_text(&block("LinkPlugin", Some(instance.clone())), &request())
            .unwrap();
        assert!(text.is_empty());

        // Instance override beats the plugin type setting
        let disabled = PluginInstance {
            search_fulltext: Some(false),
            ..instance
        };
        let text = extractor
            .extract_text(&block("TextPlugin", Some(disabled)), &request())
            .unwrap();
        assert!(text.is_empty());
    }
}
