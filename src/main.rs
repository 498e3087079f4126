// src/main.rs

//! NGA Crawler CLI
//!
//! Local execution entry point around the aggregation engine.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use nga_crawler::{
    error::Result,
    models::{BoardsIndexFile, Config},
    orchestrator::{CrawlOptions, Orchestrator},
    pacing::PacingController,
    source::{NgaPageSource, SourceDescriptor},
    taxonomy::TaxonomyResolver,
};

/// NGA forum content crawler and board resolver
#[derive(Parser, Debug)]
#[command(name = "nga-crawler", version, about = "NGA forum content crawler")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the boards index JSON file
    #[arg(short, long, default_value = "boards_index.json")]
    index: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a thread and print the assembled posts
    Crawl {
        /// Thread URL (e.g. https://bbs.nga.cn/read.php?tid=XXXX)
        url: String,

        /// Maximum number of posts to gather
        #[arg(long)]
        cap: Option<usize>,

        /// Return gathered posts even if the source fails mid-crawl
        #[arg(long)]
        allow_partial: bool,
    },

    /// List the top topics of a board or collection
    List {
        /// Listing URL (e.g. https://bbs.nga.cn/thread.php?fid=XXX)
        url: String,

        /// Number of topics to return
        #[arg(long)]
        topk: Option<usize>,
    },

    /// Resolve a board or category name against the boards index
    Resolve {
        /// Board or category name (fuzzy)
        query: String,

        /// Number of candidates to return
        #[arg(long, default_value_t = 3)]
        topk: usize,
    },

    /// Print the board taxonomy grouped by category
    Structure,

    /// Validate configuration and boards index
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_taxonomy(index_path: &PathBuf) -> Result<Arc<TaxonomyResolver>> {
    let entries = BoardsIndexFile::load(index_path)?.into_entries();
    let resolver = TaxonomyResolver::new();
    resolver.load(entries)?;
    Ok(Arc::new(resolver))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    config.validate()?;

    let build_orchestrator = |taxonomy: Arc<TaxonomyResolver>| -> Result<Orchestrator<NgaPageSource>> {
        Ok(Orchestrator::new(
            NgaPageSource::new(&config.crawler)?,
            Arc::new(PacingController::new(&config.pacing)),
            taxonomy,
            config.crawler.clone(),
        ))
    };

    match cli.command {
        Command::Crawl {
            url,
            cap,
            allow_partial,
        } => {
            let orchestrator = build_orchestrator(Arc::new(TaxonomyResolver::new()))?;
            let thread = orchestrator
                .crawl_thread(
                    &SourceDescriptor::thread(url),
                    cap.unwrap_or(config.crawler.default_cap),
                    CrawlOptions { allow_partial },
                )
                .await?;
            print_json(&thread)?;
        }

        Command::List { url, topk } => {
            let orchestrator = build_orchestrator(Arc::new(TaxonomyResolver::new()))?;
            let listing = orchestrator
                .list_board(
                    &SourceDescriptor::listing(url),
                    topk.unwrap_or(config.crawler.default_topk),
                )
                .await?;
            print_json(&listing)?;
        }

        Command::Resolve { query, topk } => {
            let taxonomy = load_taxonomy(&cli.index)?;

            // Category names take precedence, as a category query wants
            // every board underneath it, not the k closest names.
            let category_hits = taxonomy.resolve_category(&query)?;
            if !category_hits.is_empty() {
                print_json(&serde_json::json!({
                    "query": query,
                    "query_type": "category",
                    "results": category_hits,
                }))?;
            } else {
                let candidates = taxonomy.resolve(&query, topk)?;
                print_json(&serde_json::json!({
                    "query": query,
                    "query_type": "fuzzy",
                    "results": candidates,
                }))?;
            }
        }

        Command::Structure => {
            let taxonomy = load_taxonomy(&cli.index)?;
            let structure = taxonomy.snapshot()?.structure();
            print_json(&structure)?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK");

            let taxonomy = load_taxonomy(&cli.index)?;
            log::info!("✓ Boards index OK ({} boards)", taxonomy.entries()?.len());

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
