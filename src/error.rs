use thiserror::Error;

/// Errors raised while turning CMS content into search documents.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The placeholder policy is set but has neither an entry for the page
    /// nor a `*` entry.
    #[error(
        "no placeholder search entry for page {reverse_id:?}: leave PLACEHOLDERS_SEARCH_LIST empty or set up at least the generic \"*\" handling"
    )]
    MissingPolicyEntry { reverse_id: Option<String> },

    /// A record was asked for a document in a language it is not written in.
    #[error("{document} is in {record:?}, cannot build a {requested:?} document")]
    LanguageMismatch {
        document: String,
        record: String,
        requested: String,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Page not found: {0}")]
    PageNotFound(u64),

    #[error("Title not found: {0}")]
    TitleNotFound(u64),
}
