use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hybridrag_core::config::{resolve_with_base, Config, EmbeddingBackend, Settings};
use hybridrag_core::data_processor::DataProcessor;
use hybridrag_core::segmenter::SemanticSegmenter;
use hybridrag_core::traits::{EmbeddingProvider, VectorIndex};
use hybridrag_embed::{CachedEmbedder, HashEmbedder, HttpCompleter, HttpEmbedder, RetryPolicy, RetryingEmbedder};
use hybridrag_hybrid::{FusedResult, HybridRetriever, IngestPipeline, QueryExpander, SearchOptions};
use hybridrag_vector::{LanceVectorIndex, VectorSearchAdapter};

/// Hybrid BM25 + vector retrieval over a local text corpus.
#[derive(Parser)]
#[command(name = "hybridrag", version, about)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Segment, embed and index every .txt/.md file under a directory
    Ingest {
        /// Defaults to `data.raw_txt_dir`
        dir: Option<PathBuf>,
        /// Only load the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run a hybrid query
    Query {
        text: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long, requires = "beta")]
        alpha: Option<f32>,
        #[arg(long, requires = "alpha")]
        beta: Option<f32>,
        /// Broaden the query with LLM-suggested terms first
        #[arg(long)]
        expand: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show index size and chunking settings
    Stats,
    /// Delete every indexed chunk
    Reset {
        /// Required; guards against wiping the index by accident
        #[arg(long)]
        yes: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn build_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    let cfg = &settings.embedding;
    let base: Arc<dyn EmbeddingProvider> = match cfg.provider {
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(cfg.dimension).with_max_input_chars(cfg.max_input_chars)),
        EmbeddingBackend::OpenAi => Arc::new(HttpEmbedder::new(cfg, None)?),
    };
    let retrying = Arc::new(RetryingEmbedder::new(base, RetryPolicy::from(cfg)));
    Ok(Arc::new(CachedEmbedder::new(retrying)))
}

async fn open_index(settings: &Settings, base: &std::path::Path) -> Result<Arc<dyn VectorIndex>> {
    let path = resolve_with_base(base, &settings.data.lancedb_dir);
    let index = LanceVectorIndex::open(&path, &settings.data.table, settings.embedding.dimension)
        .await
        .with_context(|| format!("opening LanceDB at {}", path.display()))?;
    Ok(Arc::new(index))
}

fn print_results(results: &[FusedResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    let rank = |r: Option<usize>| r.map_or_else(|| "-".to_string(), |r| r.to_string());
    for (i, r) in results.iter().enumerate() {
        let source = r.metadata.get("source").map(String::as_str).unwrap_or("?");
        println!(
            "{}. [{:.3}] {}  (vector {:.3} #{}, keyword {:.3} #{})",
            i + 1,
            r.combined_score,
            source,
            r.vector_score,
            rank(r.vector_rank),
            r.keyword_score,
            rank(r.keyword_rank)
        );
        let preview: String = r.content.chars().take(200).collect();
        println!("   {}", preview.replace('\n', " "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_from(&cli.config_dir).context("loading configuration")?;
    let settings = config.settings()?;
    info!("Configuration loaded (env: {})", config.env_name());

    let embedder = build_embedder(&settings)?;
    let index = open_index(&settings, &cli.config_dir).await?;

    match cli.command {
        Command::Ingest { dir, limit } => {
            let data_dir = dir.unwrap_or_else(|| resolve_with_base(&cli.config_dir, &settings.data.raw_txt_dir));
            let processor = DataProcessor::with_max_file_bytes(settings.data.max_file_bytes);
            let documents = match limit {
                Some(n) => processor.load_directory_limited(&data_dir, n)?,
                None => processor.load_directory(&data_dir)?,
            };
            let segmenter = SemanticSegmenter::new(embedder.clone(), settings.chunking.clone());
            let pipeline = IngestPipeline::new(segmenter, embedder, index, &settings.ingest).with_progress(true);
            let report = pipeline.ingest(&documents).await?;
            println!(
                "Ingested {} documents into {} chunks ({} chunks failed)",
                report.documents, report.chunks, report.failed_chunks
            );
        }
        Command::Query { text, top_k, alpha, beta, expand, json } => {
            let adapter = VectorSearchAdapter::new(embedder, index);
            let mut retriever = HybridRetriever::new(adapter, &settings.retrieval)?;
            if let (Some(a), Some(b)) = (alpha, beta) {
                retriever.set_weights(a, b)?;
            }
            let top_k = top_k.unwrap_or(settings.retrieval.top_k);
            let results = if expand {
                let completer = HttpCompleter::new(&settings.expansion, None, settings.embedding.timeout_secs)?;
                let retriever = retriever.with_expander(QueryExpander::new(Arc::new(completer), &settings.expansion));
                retriever.expanded_hybrid_search(&text, top_k).await?
            } else {
                let options = SearchOptions { top_k: Some(top_k), weights: None };
                retriever.search(&text, options).await?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }
        Command::Stats => {
            let segmenter = SemanticSegmenter::new(embedder.clone(), settings.chunking.clone());
            let pipeline = IngestPipeline::new(segmenter, embedder, index, &settings.ingest);
            let stats = pipeline.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to reset {} without --yes", settings.data.table);
            }
            let segmenter = SemanticSegmenter::new(embedder.clone(), settings.chunking.clone());
            IngestPipeline::new(segmenter, embedder, index, &settings.ingest).reset().await?;
            println!("Index {} cleared", settings.data.table);
        }
    }
    Ok(())
}
