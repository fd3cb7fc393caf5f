use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::{
    filter::{FilterFn, LevelFilter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use moped_nav_core::prelude::*;
use moped_nav_routing::network::HttpFetcher;
use moped_nav_routing::{Coordinate, Incident, ProviderConfig, Route, VehicleClass};

mod presenter;

use presenter::ConsolePresenter;

#[derive(Parser, Debug)]
#[command(
    name = "route-planner",
    author,
    version,
    about = "Plan legal moped routes in Belgium",
    long_about = "Plans a route for a class A (25 km/h) or class B (45 km/h) moped, \
                  falling back from TomTom to OSRM, and prints it as JSON.\n\n\
                  Start and end accept either \"lat,lng\" or a free-text address, \
                  which is geocoded within the configured country. With --simulate \
                  the route is replayed through the live navigation tracker and \
                  every guidance update is printed as a JSON line."
)]
struct Args {
    /// Start as "lat,lng" or an address
    #[arg(short, long, required_unless_present = "suggest")]
    start: Option<Place>,

    /// Destination as "lat,lng" or an address
    #[arg(short, long, required_unless_present = "suggest")]
    end: Option<Place>,

    /// Moped class (A or B)
    #[arg(short, long, default_value = "B")]
    class: VehicleClass,

    /// TomTom API key; without one only OSRM and Nominatim are used
    #[arg(long, env = "TOMTOM_API_KEY", hide_env_values = true)]
    tomtom_key: Option<String>,

    /// Provider config as JSON (endpoints, language, country, timeout)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request timeout in seconds, overrides the config file
    #[arg(long)]
    timeout: Option<u64>,

    /// Print autocomplete suggestions for this query and exit
    #[arg(long)]
    suggest: Option<String>,

    /// Replay the route through the tracker
    #[arg(long)]
    simulate: bool,

    /// Route points skipped between simulated fixes
    #[arg(long, default_value = "5")]
    step: usize,

    /// Pause between simulated fixes in milliseconds
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

/// A coordinate pair or an address still to be geocoded
#[derive(Clone, Debug, PartialEq)]
enum Place {
    Coordinate(Coordinate),
    Address(String),
}

impl FromStr for Place {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty location".into());
        }

        let coordinate = s.split_once(',').and_then(|(lat, lng)| {
            let lat = lat.trim().parse().ok()?;
            let lng = lng.trim().parse().ok()?;
            Some(Coordinate::new(lat, lng))
        });

        match coordinate {
            Some(c) if c.is_valid() => Ok(Self::Coordinate(c)),
            Some(c) => Err(format!("coordinate out of range: {},{}", c.lat, c.lng)),
            None => Ok(Self::Address(s.to_string())),
        }
    }
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    class: VehicleClass,
    route: &'a Route,
    incidents: Vec<Incident>,
}

fn setup_logging(verbose: bool) {
    let filter = FilterFn::new(|meta| {
        let module = meta.module_path().unwrap_or_default();
        module.starts_with("moped_nav") || module.starts_with("route_planner")
    });
    let level = LevelFilter::from_level(if verbose { Level::DEBUG } else { Level::INFO });
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time();

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .with(level)
        .init();
}

fn load_config(args: &Args) -> Result<ProviderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text).context("Invalid provider config")?
        }
        None => ProviderConfig::default(),
    };

    if let Some(key) = &args.tomtom_key {
        config.tomtom_api_key = Some(key.clone());
    }
    if let Some(secs) = args.timeout {
        config.request_timeout_secs = secs;
    }

    Ok(config)
}

async fn resolve(session: &NavigationSession, place: &Place) -> Result<Coordinate> {
    match place {
        Place::Coordinate(c) => Ok(*c),
        Place::Address(query) => {
            let coordinate = session
                .geocode(query)
                .await
                .with_context(|| format!("Failed to geocode \"{query}\""))?;
            info!("{query} -> {:.5},{:.5}", coordinate.lat, coordinate.lng);
            Ok(coordinate)
        }
    }
}

/// Publish every `step`-th route point (and the last one) as a position fix
async fn simulate(
    session: &Arc<NavigationSession>,
    route: &Route,
    class: VehicleClass,
    args: &Args,
) -> Result<()> {
    let feed = SensorFeed::new();
    let subscription = session.follow(&feed);
    session.start_navigation().await?;

    let speed_mps = f64::from(class.speed_cap_kph()) / 3.6;
    let coordinates = route.coordinates();
    let last = coordinates.len() - 1;

    for index in (0..last).step_by(args.step.max(1)).chain(std::iter::once(last)) {
        feed.publish(PositionFix::new(coordinates[index], Some(speed_mps)));
        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }

    subscription.cancel().await;

    match session.state().await {
        Some(state) if state.has_arrived() => info!("arrived"),
        Some(state) => warn!(index = state.closest_route_index, "simulation ended before arrival"),
        None => warn!("no guidance produced"),
    }

    session.stop_navigation().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = load_config(&args)?;
    if !config.tomtom_enabled() {
        info!("No TomTom key, using OSRM and Nominatim only");
    }

    let fetcher = HttpFetcher::from_config(&config).context("Failed to build HTTP client")?;
    let session = Arc::new(NavigationSession::from_config(
        &config,
        Arc::new(fetcher),
        Arc::new(ConsolePresenter::new(args.simulate)),
    ));

    if let Some(query) = &args.suggest {
        let suggestions = session.suggest(query).await;
        if suggestions.is_empty() {
            warn!("No suggestions for \"{query}\"");
        }
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    let (Some(start), Some(end)) = (&args.start, &args.end) else {
        bail!("--start and --end are required");
    };

    let start = resolve(&session, start).await?;
    let end = resolve(&session, end).await?;

    info!("Planning class {} route", args.class);
    let route = session
        .plan_route(start, end, args.class)
        .await
        .context("Failed to plan route")?;

    info!(
        "{} via {}: {:.1} km, {} min, {} instructions",
        args.class,
        route.provider(),
        route.total_distance_m() / 1000.0,
        (route.total_duration_s() / 60.0).round(),
        route.instructions().len()
    );

    let output = PlanOutput {
        class: args.class,
        route: &route,
        incidents: session.incidents().await,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.simulate {
        simulate(&session, &route, args.class, &args).await?;
    }

    Ok(())
}
