mod ingest;
mod sample;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use termrank_core::persist::{export_term_records, save_meta, IndexPaths, MetaFile, META_VERSION};
use termrank_core::store::{reindex, DocumentStore};
use termrank_core::{rank, IdfWeighting, Index, IndexConfig, RankedDocument};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query an n-gram TF-IDF index", long_about = None)]
struct Cli {
    /// Data directory holding the document and term stores
    #[arg(long, global = true, default_value = "./data")]
    data: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the corpus with the built-in sample documents
    Seed,
    /// Replace the corpus with documents from JSON/JSONL files or a directory
    Load {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
    },
    /// Fit the index over the stored corpus and persist the term records
    Build {
        #[command(flatten)]
        index: IndexArgs,
        /// Also write the term records as JSON lines to this path
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Rank the stored corpus against queries (the sample queries if none are given)
    Query {
        #[command(flatten)]
        index: IndexArgs,
        queries: Vec<String>,
    },
    /// Seed, build and run the sample queries
    Demo {
        #[command(flatten)]
        index: IndexArgs,
    },
}

#[derive(Args, Clone)]
struct IndexArgs {
    /// Shortest n-gram in words
    #[arg(long, default_value_t = 1)]
    min_ngram: usize,
    /// Longest n-gram in words
    #[arg(long, default_value_t = 3)]
    max_ngram: usize,
    /// Drop tokens shorter than this many characters
    #[arg(long, default_value_t = 1)]
    min_token_len: usize,
    /// Use IDF = ln(N/df) + 1 instead of ln((1+N)/(1+df)) + 1
    #[arg(long, default_value_t = false)]
    raw_idf: bool,
    /// Decimal digits kept on stored weights
    #[arg(long, default_value_t = 4)]
    precision: u32,
}

impl IndexArgs {
    fn config(&self) -> IndexConfig {
        IndexConfig {
            min_ngram: self.min_ngram,
            max_ngram: self.max_ngram,
            min_token_len: self.min_token_len,
            idf: if self.raw_idf { IdfWeighting::Raw } else { IdfWeighting::Smoothed },
            precision: self.precision,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let paths = IndexPaths::new(&cli.data);

    match cli.command {
        Commands::Seed => seed(&paths),
        Commands::Load { input } => load(&paths, &input),
        Commands::Build { index, export } => build(&paths, index.config(), export).map(|_| ()),
        Commands::Query { index, queries } => query(&paths, index.config(), &queries),
        Commands::Demo { index } => {
            seed(&paths)?;
            build(&paths, index.config(), None)?;
            query(&paths, index.config(), &[])
        }
    }
}

fn seed(paths: &IndexPaths) -> Result<()> {
    let store = paths.open_store()?;
    let docs = sample::documents();
    store.replace_all(&docs)?;
    tracing::info!(num_docs = docs.len(), "seeded sample corpus");
    Ok(())
}

fn load(paths: &IndexPaths, input: &std::path::Path) -> Result<()> {
    let docs = ingest::read_documents(input)?;
    let store = paths.open_store()?;
    store.replace_all(&docs)?;
    Ok(())
}

fn build(paths: &IndexPaths, config: IndexConfig, export: Option<PathBuf>) -> Result<Index> {
    let store = paths.open_store()?;
    let index = reindex(&store, &store, config.clone())?.index;

    if let Some(path) = export {
        export_term_records(&path, &index.materialize())?;
        tracing::info!(path = %path.display(), "exported term records");
    }

    let meta = MetaFile {
        num_docs: index.num_docs() as u32,
        num_terms: index.vocabulary().len() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: META_VERSION,
        config,
    };
    save_meta(paths, &meta)?;

    tracing::info!(data = %paths.root.display(), "index build complete");
    Ok(index)
}

fn query(paths: &IndexPaths, config: IndexConfig, queries: &[String]) -> Result<()> {
    let store = paths.open_store()?;
    let docs = store.documents()?;
    let index = Index::fit(&docs, config)?;

    let queries: Vec<String> = if queries.is_empty() {
        sample::QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        queries.to_vec()
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (n, q) in queries.iter().enumerate() {
        let ranked = rank(q, &index, &docs);
        write!(out, "{}", format_results(n + 1, q, &ranked))?;
    }
    Ok(())
}

fn format_results(n: usize, query: &str, ranked: &[RankedDocument]) -> String {
    let mut s = format!("Query {n}: {query}\n");
    for r in ranked {
        s.push_str(&format!("{}, Score: {:.4}\n", r.content, r.score));
    }
    s.push('\n');
    s
}
