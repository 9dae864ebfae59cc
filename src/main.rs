//! Library Harvest main entry point
//!
//! This is the command-line interface for collecting books from the online
//! library, either by book id range or by catalog page range.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use library_harvest::config::{load_config_with_hash, validate, Config};
use library_harvest::crawler::{
    AssetLayout, BookPipeline, CategoryCrawler, Coordinator, Fetcher, RetryPolicy, SkipOptions,
};
use library_harvest::output::{print_statistics, write_records, EventSink, TracingSink};
use library_harvest::url::book_urls_for_range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Library Harvest: a catalog crawler for online book libraries
///
/// Downloads book texts and cover images and writes a JSON record set
/// describing every collected book.
#[derive(Parser, Debug)]
#[command(name = "library-harvest")]
#[command(version)]
#[command(about = "Collects books from an online library catalog", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Write the log to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download books by id range
    Books {
        /// First book id
        #[arg(short, long, default_value_t = 1)]
        start_id: u32,

        /// Last book id (0 downloads only the first one)
        #[arg(short, long, default_value_t = 0)]
        end_id: u32,

        #[command(flatten)]
        shared: SharedArgs,
    },

    /// Download every book listed on a range of catalog pages
    Category {
        /// First catalog page
        #[arg(short, long, default_value_t = 1)]
        start_page: u32,

        /// Last catalog page (0 walks only the first one)
        #[arg(short, long, default_value_t = 0)]
        end_page: u32,

        /// Catalog category to walk
        #[arg(long)]
        category_id: Option<u32>,

        #[command(flatten)]
        shared: SharedArgs,
    },
}

#[derive(Args, Debug)]
struct SharedArgs {
    /// Folder that receives the texts and images directories
    #[arg(short, long)]
    dest_folder: Option<String>,

    /// Do not download book texts
    #[arg(short = 't', long)]
    skip_txt: bool,

    /// Do not download cover images
    #[arg(short = 'i', long)]
    skip_imgs: bool,

    /// Where to write the JSON record set
    #[arg(short, long)]
    json_path: Option<String>,

    /// Number of books processed at the same time
    #[arg(long)]
    concurrency: Option<u32>,
}

impl SharedArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(dest_folder) = &self.dest_folder {
            config.output.dest_folder = dest_folder.clone();
        }
        if let Some(json_path) = &self.json_path {
            config.output.records_path = json_path.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.run.concurrency = concurrency;
        }
    }

    fn skip_options(&self) -> SkipOptions {
        SkipOptions {
            skip_text: self.skip_txt,
            skip_images: self.skip_imgs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    match &cli.command {
        Command::Books { shared, .. } => shared.apply(&mut config),
        Command::Category {
            category_id,
            shared,
            ..
        } => {
            shared.apply(&mut config);
            if let Some(category_id) = category_id {
                config.site.category_id = *category_id;
            }
        }
    }
    if let Some(log_file) = &cli.log_file {
        config.output.log_path = log_file.display().to_string();
    }
    validate(&config).context("invalid configuration")?;

    setup_logging(cli.verbose, cli.quiet, &config.output.log_path)?;
    match (&cli.config, &config_hash) {
        (Some(path), Some(hash)) => {
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash)
        }
        _ => tracing::info!("Using default configuration"),
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_watcher(cancel.clone());

    let base_url = Url::parse(&config.site.base_url)
        .with_context(|| format!("invalid base URL {}", config.site.base_url))?;
    let fetcher = Fetcher::from_config(&config.http).context("failed to build HTTP client")?;
    let policy = RetryPolicy::from_config(&config.retry);
    let sink: Arc<dyn EventSink> = Arc::new(TracingSink);

    let (book_urls, skip_options, always_write) = match &cli.command {
        Command::Books {
            start_id,
            end_id,
            shared,
        } => {
            let urls = book_urls_for_range(&base_url, *start_id, *end_id)
                .context("failed to build book URLs")?;
            (urls, shared.skip_options(), true)
        }
        Command::Category {
            start_page,
            end_page,
            shared,
            ..
        } => {
            let end_page = if *end_page == 0 { *start_page } else { *end_page };
            let crawler = CategoryCrawler::new(
                fetcher.clone(),
                base_url.clone(),
                config.site.category_id,
                policy,
                Arc::clone(&sink),
                cancel.clone(),
            );
            let urls = crawler.list_book_urls(*start_page, end_page).await;
            (urls, shared.skip_options(), false)
        }
    };

    let pipeline = BookPipeline::new(fetcher, AssetLayout::from_config(&config.output), sink);
    let mut coordinator = Coordinator::new(pipeline, policy, cancel)
        .with_concurrency(config.run.concurrency as usize);
    let records = coordinator.run(&book_urls, skip_options).await;

    let records_path = Path::new(&config.output.records_path);
    if always_write || !records.is_empty() {
        write_records(records_path, &records)
            .with_context(|| format!("failed to write records to {}", records_path.display()))?;
        tracing::info!("Wrote {} records to {}", records.len(), records_path.display());
    } else {
        tracing::warn!("No books collected; {} not written", records_path.display());
    }

    if !cli.quiet {
        print_statistics(coordinator.statistics());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// An empty `log_path` logs to stderr; otherwise the file is truncated and
/// receives the log without colours.
fn setup_logging(verbose: u8, quiet: bool, log_path: &str) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("library_harvest=info,warn"),
            1 => EnvFilter::new("library_harvest=debug,info"),
            2 => EnvFilter::new("library_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    if log_path.is_empty() {
        builder.with_writer(std::io::stderr).init();
    } else {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("failed to create log file {}", log_path))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }

    Ok(())
}

/// Cancels `cancel` on the first Ctrl-C so that the run stops after the
/// current request and the partial record set is still written
fn spawn_interrupt_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupted; finishing with the books collected so far");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}
