use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use rider_watch::config::RiderWatchConfig;
use rider_watch::mot::{IoUTracker, SimpleBlob};
use rider_watch::pipeline::{FrameOrchestrator, Replay, ReplayChannel, ReplayDetector};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Replay recorded detections through rider assignment, violation checks and tracking"
)]
struct Args {
    /// JSON file with per-frame vehicle, rider and helmet detections
    #[arg(long)]
    input: PathBuf,

    /// TOML config, defaults are used when not given
    #[arg(long, env = "RIDER_WATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log failed frames and go on instead of stopping at the first one
    #[arg(long)]
    keep_going: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = RiderWatchConfig::load(args.config.as_deref())
        .with_context(|| format!("loading config {:?}", args.config))?;
    let file = File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let replay = Replay::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", args.input.display()))?;
    log::info!("Replaying {} frames from {}", replay.frames.len(), args.input.display());

    let tracker: IoUTracker<SimpleBlob> = cfg.build_tracker();
    let mut orchestrator = FrameOrchestrator::new(
        ReplayDetector::new(ReplayChannel::Vehicles),
        ReplayDetector::new(ReplayChannel::Riders),
        ReplayDetector::new(ReplayChannel::Helmets),
        tracker,
        &cfg,
    );

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut violations = 0;
    for frame in &replay.frames {
        let report = match orchestrator.process(frame) {
            Ok(report) => report,
            Err(e) if args.keep_going => {
                log::warn!("Frame {} skipped: {}", orchestrator.frames_seen() - 1, e);
                continue;
            }
            Err(e) => {
                let index = orchestrator.frames_seen() - 1;
                return Err(e).with_context(|| format!("frame {}", index));
            }
        };
        violations += report.violations.len();
        serde_json::to_writer(&mut out, &report)?;
        writeln!(out)?;
    }
    out.flush()?;
    log::info!("Done: {} frames, {} violations", orchestrator.frames_seen(), violations);
    Ok(())
}
