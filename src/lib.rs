//! Search documents for CMS pages.
//!
//! [`index::TitleIndex`] turns one page title into a [`index::SearchDocument`],
//! pulling content from a [`store::ContentStore`] and text from a
//! [`content::BlockTextExtractor`]. [`search::PageIndexer`] writes the
//! documents into a tantivy index that [`search::PageSearcher`] queries.

pub mod config;
pub mod content;
pub mod error;
pub mod index;
pub mod models;
pub mod search;
pub mod store;

pub use config::{PlaceholderPolicy, Settings, SlotSelection};
pub use error::IndexError;
pub use index::{IndexRequest, SearchDocument, SearchIndex, TitleIndex};
pub use store::{ContentStore, MemoryStore, TitleQuery};
