// src/main.rs

mod aggregate;
mod avatar;
mod cli;
mod error;
mod graph;
mod identity;
mod input;
mod model;
mod pipeline;
mod requirements;
mod scaffold;
mod vcs;
mod weight;

use clap::Parser;
use cli::{Args, Command};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    let start_time = Instant::now();
    let show_progress = !args.quiet;

    let result = match args.command {
        Command::Network(network) => {
            let config = network.into_config(show_progress);
            pipeline::run(&config, &vcs::SystemBackend::new(), &avatar::HttpFetcher::new()).map(|summary| {
                info!(
                    "Wrote {} with {} packages and {} dependencies ({} new contributor files)",
                    config.network_path().display(),
                    summary.packages,
                    summary.dependencies,
                    summary.contributor_files_written
                );
            })
        }
        Command::Requirements { output, paths } => requirements::write_csv(&output, &paths).map(|total| {
            info!("Done! {} requirements written to {}", total, output.display());
        }),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    info!("Total time: {:.2?}", start_time.elapsed());
}
