use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{self, EnvFilter};

use cms_page_search::index::title_document_id;
use cms_page_search::search::{PageIndexer, PageSearcher, SearchParams};
use cms_page_search::{
    ContentStore, IndexError, IndexRequest, MemoryStore, SearchIndex, Settings, TitleIndex,
};

#[derive(Debug, Parser)]
#[command(name = "cms-page-search", version, about = "Index CMS pages for full-text search")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Index directory, overriding the settings
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild the index from a content snapshot
    Rebuild {
        #[arg(long)]
        store: PathBuf,
        /// Languages to index (defaults to the configured ones)
        #[arg(long = "language")]
        languages: Vec<String>,
    },
    /// Reindex one title after it changed
    Update {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        title_id: u64,
    },
    /// Drop one title from the index
    Remove {
        #[arg(long)]
        title_id: u64,
    },
    /// Search the index
    Search {
        query: String,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long)]
        site_id: Option<u64>,
        #[arg(long)]
        include_login_required: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the document built for a title
    Inspect {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        title_id: u64,
        /// Must match the title's own language, which is the default
        #[arg(long)]
        language: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let index_dir = cli
        .index_dir
        .clone()
        .unwrap_or_else(|| settings.resolved_index_dir());

    match cli.command {
        Command::Rebuild { store, languages } => {
            let store = MemoryStore::load(&store)?;
            let title_index = TitleIndex::new(&store, &settings);
            let indexer = PageIndexer::open_or_create(&index_dir)?;

            let languages = if languages.is_empty() {
                settings.languages.clone()
            } else {
                languages
            };
            for language in &languages {
                let report = indexer
                    .build_index(&title_index, language)
                    .with_context(|| format!("Failed to rebuild {language} index"))?;
                println!(
                    "{language}: {} indexed, {} errors",
                    report.indexed, report.errors
                );
            }
        }
        Command::Update { store, title_id } => {
            let store = MemoryStore::load(&store)?;
            let title = store
                .title(title_id)?
                .ok_or(IndexError::TitleNotFound(title_id))?;
            let title_index = TitleIndex::new(&store, &settings);
            let indexer = PageIndexer::open_or_create(&index_dir)?;

            let indexed = indexer.update_object(&title_index, &title, &title.language)?;
            if indexed {
                println!("Indexed {}", title_document_id(title_id));
            } else {
                println!("{} is not indexable", title_document_id(title_id));
            }
        }
        Command::Remove { title_id } => {
            let indexer = PageIndexer::open_or_create(&index_dir)?;
            indexer.remove_object(&title_document_id(title_id))?;
            println!("Removed {}", title_document_id(title_id));
        }
        Command::Search {
            query,
            language,
            site_id,
            include_login_required,
            limit,
        } => {
            let indexer = PageIndexer::open_or_create(&index_dir)?;
            let searcher = PageSearcher::new(&indexer)?;
            let params = SearchParams {
                site_id,
                include_login_required,
                limit,
                ..SearchParams::new(&query, &language)
            };
            let hits = searcher.search(&params)?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::Inspect {
            store,
            title_id,
            language,
        } => {
            let store = MemoryStore::load(&store)?;
            let title = store
                .title(title_id)?
                .ok_or(IndexError::TitleNotFound(title_id))?;
            let language = language.unwrap_or_else(|| title.language.clone());
            let title_index = TitleIndex::new(&store, &settings);

            let request = IndexRequest::for_title(&title, &language);
            let doc = title_index.build_document(&title, &language, &request)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(())
}
