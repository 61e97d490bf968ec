//! List one account's follows or followers, page by page, as the search sees them.

use anyhow::Result;
use clap::Parser;
use skypath::client::XrpcClient;
use skypath::neighbors::NeighborSetBuilder;
use skypath::progress::{LogProgress, SearchStats};
use skypath::{Config, Direction, PathFinder};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "skypath-neighbors")]
#[command(about = "List the follows (or followers) of one account")]
struct Args {
    /// Handle or DID
    actor: String,

    /// List followers instead of follows
    #[arg(long)]
    followers: bool,

    /// Print handles next to DIDs
    #[arg(long)]
    handles: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.skypath.log_level),
    )
    .init();

    let finder: PathFinder<XrpcClient> = PathFinder::from_config(&config).await?;
    let identity = finder.resolve(&args.actor).await?;
    let direction = if args.followers {
        Direction::Incoming
    } else {
        Direction::Outgoing
    };

    log::info!("Listing {} of @{} ({})", direction, identity.handle, identity.id);

    let start = Instant::now();
    let builder = NeighborSetBuilder::new(finder.client(), config.pacing()).with_handles(finder.handles());
    let mut stats = SearchStats::default();
    let neighbors = builder
        .collect(&identity.id, direction, None, &mut stats, &LogProgress)
        .await?;

    for id in &neighbors {
        if args.handles {
            println!("{}\t@{}", id, finder.handles().display(id));
        } else {
            println!("{}", id);
        }
    }

    eprintln!(
        "{} {} in {} requests ({:?})",
        neighbors.len(),
        direction,
        stats.requests,
        start.elapsed()
    );

    Ok(())
}
