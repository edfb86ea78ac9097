use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use volslicer_client::{Session, SlicerView};
use volslicer_core::{overlay::Overlay, SlicerConfig, SlicerRegistry, Volume, VolumeSlicer};

mod synth;

/// Upper bound for a single slider move to be answered and drawn.
const SETTLE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the slider along a path and print the resulting figure
    Demo {
        #[command(flatten)]
        slicer: SlicerArgs,
        /// Slider positions to visit, in order
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_values_t = [5, 5, 3, 4, 5])]
        path: Vec<i64>,
        /// Highlight the bright ball with an overlay
        #[arg(long)]
        overlay: bool,
        /// Write the displayed slice to a PNG file
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Sweep the slider over every index and report cache and latency numbers
    Bench {
        #[command(flatten)]
        slicer: SlicerArgs,
        #[arg(long, default_value_t = 3)]
        rounds: usize,
        /// Keep a single slice in the client cache
        #[arg(long)]
        no_cache: bool,
    },
}

#[derive(Args)]
struct SlicerArgs {
    /// JSON file with slicer settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Overrides the axis from the config file
    #[arg(long)]
    axis: Option<usize>,
    /// Overrides the cache capacity from the config file
    #[arg(long)]
    cache_capacity: Option<usize>,
    /// Shape of the synthetic volume, `z,y,x`
    #[arg(long, value_delimiter = ',', default_values_t = [10, 64, 64])]
    shape: Vec<usize>,
    /// Ask again for a slice whose reply has not arrived after this many milliseconds
    #[arg(long, value_name = "MS")]
    retry_ms: Option<u64>,
}

impl SlicerArgs {
    fn config(&self) -> eyre::Result<SlicerConfig> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str::<SlicerConfig>(&std::fs::read_to_string(path)?)?,
            None => SlicerConfig::default(),
        };
        if let Some(axis) = self.axis {
            config.axis = axis;
        }
        if self.cache_capacity.is_some() {
            config.cache_capacity = self.cache_capacity;
        }
        Ok(config)
    }

    fn retry(&self) -> Option<Duration> {
        self.retry_ms.map(Duration::from_millis)
    }

    fn shape(&self) -> eyre::Result<(usize, usize, usize)> {
        match self.shape[..] {
            [z, y, x] => Ok((z, y, x)),
            _ => Err(eyre::eyre!("Expected three dimensions, got {:?}", self.shape)),
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Demo {
            slicer,
            path,
            overlay,
            out,
        } => demo(&slicer, &path, overlay, out).await,
        Command::Bench {
            slicer,
            rounds,
            no_cache,
        } => bench(&slicer, rounds, no_cache).await,
    }
}

/// Registers the slicer with a fresh endpoint and connects a view to it.
fn connect(
    slicer: &VolumeSlicer<u16>,
    retry: Option<Duration>,
) -> eyre::Result<(Session, JoinHandle<()>)> {
    let registry = Arc::new(SlicerRegistry::new());
    registry.register(slicer.context_id().clone(), slicer.coordinator());

    let (requests, rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(registry.clone().serve(rx));

    let view = SlicerView::new(slicer.layout().clone());
    let mut session = Session::connect(view, &registry, requests)?;
    if let Some(retry) = retry {
        session = session.with_retry(retry);
    }
    Ok((session, server))
}

async fn demo(
    args: &SlicerArgs,
    path: &[i64],
    with_overlay: bool,
    out: Option<PathBuf>,
) -> eyre::Result<()> {
    let config = args.config()?;
    let phantom = synth::phantom(args.shape()?);
    let mut slicer = VolumeSlicer::new(Volume::new(phantom.volume)?, &config)?;
    if with_overlay {
        slicer = slicer.with_overlay(Overlay::from_bool(&phantom.mask))?;
    }

    let (mut session, server) = connect(&slicer, args.retry())?;
    session.start()?;
    session.settle(SETTLE_DEADLINE).await?;

    for &raw in path {
        let sent = session.view().requests_sent();
        session.move_slider(raw)?;
        session.settle(SETTLE_DEADLINE).await?;
        let view = session.view();
        info!(
            index = %view.active(),
            position = view.position(),
            fetched = view.requests_sent() > sent,
            requests = view.requests_sent(),
            renders = view.renders(),
            "Moved slider"
        );
    }

    let view = session.into_view();
    println!("{}", serde_json::to_string_pretty(view.figure())?);

    if let Some(out) = out {
        let png = view
            .cache()
            .peek(view.active())
            .and_then(|response| response.slice.png_bytes())
            .ok_or_else(|| eyre::eyre!("Slice {} is not displayed", view.active()))?;
        std::fs::write(&out, png)?;
        info!(path = %out.display(), "Wrote displayed slice");
    }

    server.await?;
    Ok(())
}

async fn bench(args: &SlicerArgs, rounds: usize, no_cache: bool) -> eyre::Result<()> {
    let mut config = args.config()?;
    if no_cache {
        config.cache_capacity = Some(1);
    }
    let phantom = synth::phantom(args.shape()?);
    let slicer = VolumeSlicer::new(Volume::new(phantom.volume)?, &config)?;
    let len = slicer.info().len() as i64;

    let (mut session, server) = connect(&slicer, args.retry())?;
    let mut round_trips = Vec::new();
    let mut payload_bytes = 0usize;

    let started = Instant::now();
    for round in 0..rounds {
        for raw in 0..len {
            let sent = session.view().requests_sent();
            let moved = Instant::now();
            session.move_slider(raw)?;
            session.settle(SETTLE_DEADLINE).await?;

            let view = session.view();
            if view.requests_sent() > sent {
                round_trips.push(moved.elapsed());
                if let Some(response) = view.cache().peek(view.active()) {
                    payload_bytes += response.slice.as_str().len();
                }
            }
        }
        debug!(round, "Finished sweep");
    }
    let elapsed = started.elapsed();

    let view = session.into_view();
    let stats = view.cache().stats();
    let fetched = round_trips.len();
    let mean_round_trip = match fetched {
        0 => Duration::ZERO,
        n => round_trips.iter().sum::<Duration>() / n as u32,
    };

    println!("slices:          {len}");
    println!("rounds:          {rounds}");
    println!("cache capacity:  {:?}", view.cache().capacity());
    println!("requests sent:   {}", view.requests_sent());
    println!("retries:         {}", view.retries());
    println!("cache hits:      {} ({:.1}%)", stats.hits, stats.hit_rate() * 100.0);
    println!("evictions:       {}", stats.evictions);
    println!("renders:         {}", view.renders());
    println!("mean round trip: {mean_round_trip:?}");
    println!("mean payload:    {} bytes", payload_bytes.checked_div(fetched).unwrap_or(0));
    println!("total time:      {elapsed:?}");

    server.await?;
    Ok(())
}
