use anyhow::Context;
use clap::Parser;
use generator::profile::build_mission;
use log::info;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::watch;
use workflow::config::SessionConfig;
use workflow::runner::{RunSummary, Runner};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic side-scan survey driver for the sonar mosaicking core")]
struct Args {
    /// Load a session config from YAML
    #[arg(long)]
    session: Option<PathBuf>,
    #[arg(long, default_value_t = 400)]
    samples: usize,
    #[arg(long, default_value_t = 3)]
    legs: usize,
    #[arg(long, default_value_t = 250)]
    pings_per_leg: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Directory receiving the CSV tiles and manifests
    #[arg(long)]
    output: Option<PathBuf>,
    /// Replay pings on a wall clock with the async scheduler (Ctrl+C to stop)
    #[arg(long, default_value_t = false)]
    realtime: bool,
    #[arg(long, default_value_t = 10)]
    ping_interval_ms: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session = if let Some(path) = args.session {
        SessionConfig::load(path)?
    } else {
        SessionConfig::from_args(args.samples, args.legs, args.pings_per_leg, args.seed)
    };
    if args.output.is_some() {
        session.output_dir = args.output;
    }

    let events = build_mission(
        &session.mission,
        session.samples(),
        session.pipeline.ingest.bytes_per_sample,
    )?;
    info!(
        "generated {} legs x {} pings, {} samples per channel",
        session.mission.legs,
        session.mission.pings_per_leg,
        session.samples()
    );

    let runner = Runner::new(session);
    let summary: RunSummary = if args.realtime {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for real-time replay")?;
        runtime.block_on(async {
            let (interrupt, shutdown) = watch::channel(false);
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    let _ = interrupt.send(true);
                }
            });
            runner
                .execute_realtime(events, Duration::from_millis(args.ping_interval_ms), shutdown)
                .await
        })?
    } else {
        runner.execute_offline(&events)?
    };

    println!(
        "Run -> mosaics {}, swaths processed {}, skipped {}, dropped {}",
        summary.metrics.mosaics_built,
        summary.metrics.swaths_processed,
        summary.metrics.swaths_skipped,
        summary.metrics.swaths_dropped
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("serializing run summary")?
    );

    Ok(())
}
