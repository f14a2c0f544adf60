use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tantivy::{
    Index, IndexReader, ReloadPolicy, TantivyDocument, Term,
    collector::TopDocs,
    query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, TermQuery},
    schema::{IndexRecordOption, Value},
};
use tracing::debug;

use super::indexer::PageIndexer;
use super::schema::PageSchema;

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub language: String,
    /// Restrict hits to one site
    pub site_id: Option<u64>,
    /// Also return pages that need a login
    pub include_login_required: bool,
    pub limit: usize,
}

impl SearchParams {
    pub fn new(query: &str, language: &str) -> Self {
        Self {
            query: query.to_string(),
            language: language.to_string(),
            site_id: None,
            include_login_required: false,
            limit: 20,
        }
    }
}

/// A page matching a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub language: String,
    pub site_id: u64,
    pub login_required: bool,
    pub score: f32,
}

/// Handles search operations on the page index
pub struct PageSearcher {
    index: Index,
    schema: PageSchema,
    reader: IndexReader,
}

impl std::fmt::Debug for PageSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSearcher")
            .field("index", &"Index")
            .field("schema", &self.schema)
            .finish()
    }
}

impl PageSearcher {
    /// Create a searcher over the indexer's index
    pub fn new(indexer: &PageIndexer) -> Result<Self> {
        let index = indexer.index().clone();
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create index reader")?;

        Ok(Self {
            index,
            schema: indexer.schema().clone(),
            reader,
        })
    }

    /// Reload the index reader to see new commits
    pub fn reload(&self) -> Result<()> {
        self.reader.reload()?;
        Ok(())
    }

    /// Number of documents in the index
    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Full-text search restricted by language, site and login requirement
    pub fn search(&self, params: &SearchParams) -> Result<Vec<SearchHit>> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        if params.query.trim().is_empty() {
            subqueries.push((Occur::Must, Box::new(AllQuery)));
        } else {
            let query_parser =
                QueryParser::for_index(&self.index, self.schema.text_fields(&params.language));
            let text_query = query_parser
                .parse_query(&params.query)
                .context("Failed to parse search query")?;
            subqueries.push((Occur::Must, text_query));
        }

        subqueries.push((
            Occur::Must,
            term_query(Term::from_field_text(self.schema.language, &params.language)),
        ));

        if let Some(site_id) = params.site_id {
            subqueries.push((
                Occur::Must,
                term_query(Term::from_field_u64(self.schema.site_id, site_id)),
            ));
        }

        if !params.include_login_required {
            subqueries.push((
                Occur::Must,
                term_query(Term::from_field_bool(self.schema.login_required, false)),
            ));
        }

        let query = BooleanQuery::new(subqueries);
        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(params.limit.max(1)))
            .context("Search failed")?;

        debug!("Query {:?} matched {} pages", params.query, top_docs.len());

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            results.push(self.doc_to_hit(&doc, score));
        }
        Ok(results)
    }

    /// Get a page by document id
    pub fn get_by_id(&self, id: &str) -> Result<Option<SearchHit>> {
        let searcher = self.reader.searcher();
        let query = term_query(Term::from_field_text(self.schema.id, id));

        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;

        if let Some((score, doc_address)) = top_docs.into_iter().next() {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            Ok(Some(self.doc_to_hit(&doc, score)))
        } else {
            Ok(None)
        }
    }

    fn doc_to_hit(&self, doc: &TantivyDocument, score: f32) -> SearchHit {
        let text = |field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        SearchHit {
            id: text(self.schema.id),
            title: text(self.schema.title),
            url: text(self.schema.url),
            description: doc
                .get_first(self.schema.description)
                .and_then(|v| v.as_str())
                .map(str::to_string),
            language: text(self.schema.language),
            site_id: doc
                .get_first(self.schema.site_id)
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            login_required: doc
                .get_first(self.schema.login_required)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            score,
        }
    }
}

fn term_query(term: Term) -> Box<dyn Query> {
    Box::new(TermQuery::new(term, IndexRecordOption::Basic))
}
