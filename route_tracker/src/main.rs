use std::{path::{Path, PathBuf}, sync::Arc};

use clap::{Parser, Subcommand};
use route_tracker::{
    location::GpxReplaySource, HttpRouteRepository, RouteSummary, SavedRoutes, SessionStatus,
    Tracker, TrackerConfig, TrackerEvent,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "route_tracker", about = "Record GPS routes and browse the saved ones")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a route, replaying a GPX file as the location source
    Record {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        gpx: PathBuf,
    },
    /// List saved routes
    List,
    /// Show one saved route
    Show {
        index: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter().into()),
        )
        // stdout carries the command output.
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = TrackerConfig::load(cli.config.as_deref())?;
    let repository = HttpRouteRepository::new(&config.api.base_url, config.api.timeout())?;
    let repository = Arc::new(repository);
    tracing::debug!("Using route API at {}", repository.routes_url());

    match cli.command {
        Command::Record { name, gpx } => record(&name, &gpx, &config, repository).await,
        Command::List => list(repository).await,
        Command::Show { index } => show(index, repository).await,
    }
}

async fn record(
    name: &str,
    gpx: &Path,
    config: &TrackerConfig,
    repository: Arc<HttpRouteRepository>,
) -> anyhow::Result<()> {
    let source = Arc::new(GpxReplaySource::open(gpx, config.location.request())?);
    let (tracker, mut events) = Tracker::new(source.clone(), repository);

    let mut status = tracker.watch_status();
    let progress = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            if let SessionStatus::Recording { last, points } = *status.borrow_and_update() {
                println!("{points:>5}  {:.6}, {:.6}", last.latitude, last.longitude);
            }
        }
    });

    tracker.start(name).await?;
    println!("Tracking {name:?} ({} fixes in file), Ctrl-C to stop", source.len());

    tokio::select! {
        _ = source.wait_finished() => tracing::info!("Reached end of track file"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    let route = tracker.stop().await?;
    progress.abort();
    tracker.with_summary(|summary| print_summary(&route.name, summary));

    match events.recv().await {
        Some(TrackerEvent::RouteSaved(stored)) => println!("Saved route {:?}", stored.name),
        Some(TrackerEvent::SaveFailed { cause, .. }) => println!("Route was not saved: {cause}"),
        None => {},
    }

    Ok(())
}

async fn list(repository: Arc<HttpRouteRepository>) -> anyhow::Result<()> {
    let mut saved = SavedRoutes::new(repository);
    let routes = saved.refresh().await?;

    if routes.is_empty() {
        println!("No saved routes");
    }

    for (index, route) in routes.iter().enumerate() {
        let km = route.length_meters() / 1000.;
        println!("{index:>3}  {:<30} {:>6} points {km:>9.2} km", route.name, route.len());
    }

    Ok(())
}

async fn show(index: usize, repository: Arc<HttpRouteRepository>) -> anyhow::Result<()> {
    let mut saved = SavedRoutes::new(repository);
    let count = saved.refresh().await?.len();

    saved.select(index);
    let Some((route, summary)) = saved.selected() else {
        anyhow::bail!("No saved route at index {index}, there are {count}");
    };
    print_summary(&route.name, summary);

    Ok(())
}

fn default_log_filter() -> String {
    format!("{}=trace", env!("CARGO_CRATE_NAME"))
}

fn print_summary(name: &str, summary: RouteSummary<'_>) {
    println!("Route {name:?}");
    if summary.has_fix() {
        println!("  focus   {:.6}, {:.6}", summary.focus.latitude, summary.focus.longitude);
    } else {
        println!("  focus   none (no fixes recorded)");
    }
    println!("  points  {}", summary.display_points.len());
    println!("  length  {:.2} km", summary.length_meters() / 1000.);

    for point in summary.display_points {
        println!("    {:.6}, {:.6}", point.latitude, point.longitude);
    }
}
