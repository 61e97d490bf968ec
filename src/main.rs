use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skypath::graph::ReconstructionStrategy;
use skypath::progress::{NoProgress, ProgressReporter, SearchStats};
use skypath::render::{render_path, PathFormat};
use skypath::server::PathServer;
use skypath::{Config, PathFinder, PathOutcome};
use std::io::Write;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "skypath")]
#[command(about = "Find the shortest follow chain between two Bluesky accounts")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for a follow chain from one account to another
    Find {
        /// Starting handle or DID
        from: String,
        /// Target handle or DID
        to: String,
        /// How hops are printed
        #[arg(long, value_enum, default_value_t = PathFormat::Plain)]
        format: PathFormat,
        /// Override search.reconstruction from config
        #[arg(long, value_enum)]
        strategy: Option<ReconstructionStrategy>,
        /// Do not print live counters
        #[arg(short, long)]
        quiet: bool,
    },
    /// Serve path searches over HTTP (server-sent events)
    Serve {
        /// Override http_server.port from config
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Live edge and request counters on one stderr line
struct TerminalProgress;

impl ProgressReporter for TerminalProgress {
    fn report(&self, stats: SearchStats) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\redges: {:>8}  requests: {:>6}", stats.edges, stats.requests);
        let _ = stderr.flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.skypath.log_level),
    )
    .init();

    match args.command {
        Command::Find {
            from,
            to,
            format,
            strategy,
            quiet,
        } => run_find(&config, &from, &to, format, strategy, quiet).await,
        Command::Serve { port } => run_server(&config, port).await,
    }
}

/// Resolve both accounts, search, and print the path
async fn run_find(
    config: &Config,
    from: &str,
    to: &str,
    format: PathFormat,
    strategy: Option<ReconstructionStrategy>,
    quiet: bool,
) -> Result<()> {
    let finder = PathFinder::from_config(config).await?;

    let (from, to) = finder
        .resolve_endpoints(from, to)
        .await
        .context("Could not resolve accounts")?;

    log::info!("From @{} ({}) to @{} ({})", from.handle, from.id, to.handle, to.id);

    let start = Instant::now();
    let reporter: &dyn ProgressReporter = if quiet { &NoProgress } else { &TerminalProgress };
    let report = finder
        .search(&from.id, &to.id, strategy, reporter)
        .await
        .context("Search failed")?;
    if !quiet {
        eprintln!();
    }

    let hops = match &report.outcome {
        PathOutcome::Found(path) => {
            println!("{}", render_path(path, finder.handles(), format));
            (path.len() - 1).to_string()
        }
        PathOutcome::NotFound => {
            println!("Path not found");
            "-".to_string()
        }
    };

    println!();
    println!("Hops:     {}", hops);
    println!("Edges:    {}", report.stats.edges);
    println!("Requests: {}", report.stats.requests);
    println!("Rounds:   {}", report.rounds);
    println!("Strategy: {:?}", strategy.unwrap_or(finder.strategy()));
    println!("Elapsed:  {:?}", start.elapsed());

    // Distinct from failures, which exit with 1
    if report.outcome == PathOutcome::NotFound {
        std::process::exit(2);
    }

    Ok(())
}

/// Run the HTTP server
async fn run_server(config: &Config, port: Option<u16>) -> Result<()> {
    log::info!("Starting Skypath HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    let finder = PathFinder::from_config(config).await?;
    log::info!("Service: {}", config.service.base_url);
    log::info!(
        "Concurrent searches: {:?}",
        config.http_server.concurrent_searches
    );

    let server = PathServer::new(finder, config.http_server.clone());
    server.run(port.unwrap_or(config.http_server.port)).await?;

    Ok(())
}
