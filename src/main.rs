mod config;
mod corpus;
mod embed;
mod error;
mod search;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::{BackendKind, Config, EmbedBackend, Overrides};
use embed::hashing::HashEmbedder;
use embed::ollama::OllamaEmbedder;
use embed::Embedder;
use search::EmbeddedCorpus;
use shell::{Shell, FAREWELL};

#[derive(Parser)]
#[command(name = "minisearch", version, about = "Semantic search over a one-passage-per-line text file")]
struct Cli {
    /// Corpus file, one passage per line [default: data/sample.txt]
    #[arg(long)]
    data: Option<PathBuf>,

    /// Embedding model name [default: all-minilm]
    #[arg(long)]
    model: Option<String>,

    /// Number of results per query [default: 3]
    #[arg(long)]
    top_k: Option<usize>,

    /// Embedding backend [default: ollama]
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Ollama server URL [default: http://localhost:11434]
    #[arg(long)]
    ollama_url: Option<String>,

    /// Config file [default: ./minisearch.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("resolving working directory")?;
    let mut config = Config::load(cli.config.as_deref(), &cwd)?;
    config.apply(Overrides {
        data: cli.data,
        top_k: cli.top_k,
        backend: cli.backend,
        model: cli.model,
        ollama_url: cli.ollama_url,
    });
    debug!(?config, "configuration resolved");

    println!("Loading corpus...");
    let docs = corpus::load(&config.corpus.path)
        .with_context(|| format!("loading corpus {}", config.corpus.path.display()))?;
    info!(documents = docs.len(), path = %config.corpus.path.display(), "corpus loaded");

    println!("Loading model...");
    let embedder = open_embedder(&config)?;
    info!(model = embedder.model_name(), dimensions = embedder.dimensions(), "embedder ready");

    println!("Embedding {} passages...", docs.len());
    let corpus = EmbeddedCorpus::build(docs, embedder.as_ref())?;
    info!(documents = corpus.document_count(), dimensions = corpus.dimensions(), "corpus embedded");

    install_interrupt_handler()?;

    println!("\nReady! Type a query to search, q to quit.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    Shell::new(&corpus, embedder.as_ref(), config.search.top_k).run(stdin.lock(), &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn open_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    let embedder: Box<dyn Embedder> = match &config.embed.backend {
        EmbedBackend::Ollama { model, url } => Box::new(OllamaEmbedder::new(
            url,
            model,
            config.effective_batch_size(),
            config.embed.max_input_bytes,
        )?),
        EmbedBackend::Hash { dimensions } => Box::new(HashEmbedder::new(*dimensions)),
    };
    Ok(embedder)
}

/// Ctrl-C while waiting for input is a normal way out: say goodbye and exit 0.
/// The handler is registered before this returns, so a signal arriving right
/// after startup is not lost.
fn install_interrupt_handler() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting signal runtime")?;

    #[cfg(unix)]
    let mut interrupt = {
        let _guard = runtime.enter();
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .context("registering SIGINT handler")?
    };

    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                #[cfg(unix)]
                let received = interrupt.recv().await.is_some();
                #[cfg(not(unix))]
                let received = tokio::signal::ctrl_c().await.is_ok();

                if received {
                    println!("\n{FAREWELL}");
                    std::process::exit(0);
                }
            })
        })
        .context("spawning interrupt watcher")?;
    Ok(())
}
