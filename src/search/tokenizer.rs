use anyhow::{Context, Result};
use lindera::dictionary::{DictionaryKind, load_dictionary_from_kind};
use lindera::mode::{Mode, Penalty};
use lindera::segmenter::Segmenter;
use lindera_tantivy::tokenizer::LinderaTokenizer;
use tantivy::Index;
use tracing::debug;

/// Tokenizer name for Japanese text
pub const JAPANESE_TOKENIZER_NAME: &str = "lang_ja";

/// Whether documents in `language` get a morphologically segmented text field
pub fn uses_japanese_segmentation(language: &str) -> bool {
    let primary = language.split(['-', '_']).next().unwrap_or(language);
    primary.eq_ignore_ascii_case("ja")
}

/// Register the tokenizers the page schema refers to.
///
/// Must run on every opened or created index before it is written or searched.
pub fn register_tokenizers(index: &Index) -> Result<()> {
    let dictionary = load_dictionary_from_kind(DictionaryKind::IPADIC)
        .context("Failed to load IPADIC dictionary")?;

    // Decompose compound nouns so partial words match
    let segmenter = Segmenter::new(Mode::Decompose(Penalty::default()), dictionary, None);

    index
        .tokenizers()
        .register(JAPANESE_TOKENIZER_NAME, LinderaTokenizer::from_segmenter(segmenter));

    debug!("Registered {} tokenizer", JAPANESE_TOKENIZER_NAME);
    Ok(())
}
