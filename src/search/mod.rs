// Module declarations
pub mod indexer;
pub mod schema;
pub mod searcher;
pub mod tokenizer;

// Re-export public APIs
pub use indexer::{IndexReport, PageIndexer};
pub use schema::PageSchema;
pub use searcher::{PageSearcher, SearchHit, SearchParams};
