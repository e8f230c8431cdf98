//! Garden Map CLI
//!
//! Composition root for a scripted garden map session. Loads configuration,
//! shares one SDK loader with the map controller, realizes the map against the
//! simulated provider and draws a few garden regions on it.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use garden_map_core::{
    ContainerId, ContainerSlot, Credential, GardenMapConfig, LifecycleStatus, LoaderCoordinator,
    MapLifecycleController, OverlayId, ShapeKind, ShapeObserver, SimulatedProvider,
};

/// Default container the map renders into
const CONTAINER_ID: &str = "garden-map";

/// Simulated network latency of one SDK fetch
const FETCH_LATENCY_MS: u64 = 250;

/// Garden map session driver
#[derive(Parser, Debug)]
#[command(name = "garden-map")]
#[command(about = "Realize a garden map and draw regions on it")]
struct Args {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(long, short = 'c', env = "GARDEN_MAP_CONFIG")]
    config: Option<String>,

    /// Realize a view-only map without the drawing surface
    #[arg(long)]
    no_drawing: bool,

    /// Reject the SDK fetch
    #[arg(long)]
    fail_load: bool,

    /// Mount the map container this many milliseconds after start
    #[arg(long, default_value_t = 0)]
    container_delay_ms: u64,
}

/// Prints shape events as the user would see them
struct ConsoleObserver;

impl ShapeObserver for ConsoleObserver {
    fn on_shape_created(&self, kind: ShapeKind, overlay: OverlayId) {
        println!("  + {kind} ({overlay})");
    }

    fn on_shape_deleted(&self, overlay: OverlayId) {
        println!("  - {overlay}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "garden_map_core=info,garden_map=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            tracing::info!(path = %path, "Loading configuration");
            GardenMapConfig::from_file(path)?
        }
        None => GardenMapConfig::default(),
    };
    let mut init_options = config.init_options();
    if args.no_drawing {
        init_options = init_options.without_drawing();
    }

    tracing::info!(
        zoom = config.map.zoom,
        drawing = init_options.drawing.is_some(),
        poll_interval_ms = config.container.poll_interval_ms,
        max_attempts = config.container.max_attempts,
        "Configuration loaded"
    );

    let credential = Credential::from_env().unwrap_or_else(|| Credential::new(""));

    // One loader per process; every map shares it.
    let provider = Arc::new(
        SimulatedProvider::new().with_fetch_delay(Duration::from_millis(FETCH_LATENCY_MS)),
    );
    if args.fail_load {
        provider.fail_next_fetches(1);
    }
    let loader = Arc::new(LoaderCoordinator::new(
        provider.clone(),
        config.loader.clone(),
    ));
    let controller = MapLifecycleController::new(provider.clone(), loader)
        .with_container_wait(config.container.clone())
        .with_observer(Arc::new(ConsoleObserver));

    let slot = ContainerSlot::new();

    let (outcome, ()) = tokio::join!(
        controller.initialize(
            &slot,
            &credential,
            config.map.center,
            config.map.zoom,
            &init_options,
        ),
        async {
            if args.container_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(args.container_delay_ms)).await;
            }
            slot.mount(ContainerId::new(CONTAINER_ID));
        }
    );

    let map = match outcome {
        Ok(map) => map,
        Err(e) => {
            tracing::debug!(status = controller.status().as_str(), "Session failed");
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };
    println!(
        "Map {map} ready at ({}, {}) zoom {}",
        config.map.center.lat, config.map.center.lng, config.map.zoom
    );

    if let Some(surface) = controller.with_overlays(|overlays| overlays.surface()) {
        println!("Drawing garden regions:");
        let drawn: Vec<OverlayId> = ShapeKind::ALL
            .into_iter()
            .filter_map(|kind| provider.draw(surface, kind))
            .collect();

        // Right-click the second region to delete it.
        if let Some(&second) = drawn.get(1) {
            provider.right_click(second);
        }

        let shapes = controller
            .with_overlays(|overlays| overlays.shapes())
            .unwrap_or_default();
        println!("{} region(s) on the map:", shapes.len());
        for shape in &shapes {
            println!("  {} {} ({})", shape.id.0, shape.kind, shape.overlay);
        }
    } else {
        println!("Drawing disabled; map is view-only");
    }

    controller.teardown();
    debug_assert_eq!(controller.status(), LifecycleStatus::TornDown);
    tracing::info!("Session finished");

    Ok(ExitCode::SUCCESS)
}
