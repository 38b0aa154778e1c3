//! Terminal runner for geotrack screens.
//!
//! Run with: cargo run -p geotrack-demo -- replay tools/geotrack-demo/routes/kowloon-bay.json

mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use geotrack_location::{ReplayProvider, ReplayStep, Sampler};
use geotrack_map::MapRenderer;
use geotrack_tracking::{PresenterView, ScreenConfig, TrackingSession, TrackingStatus};
use owo_colors::OwoColorize;

use crate::console::ConsoleRenderer;

#[derive(Parser)]
#[command(name = "geotrack-demo")]
#[command(about = "Runs a tracking screen in the terminal", long_about = None)]
struct Cli {
    /// Screen preset: live, dashboard or altitude
    #[arg(long, global = true, default_value = "dashboard")]
    screen: String,
    /// Screen configuration as JSON, used instead of the preset
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded route
    Replay {
        /// Route file: a JSON array of replay steps
        route: PathBuf,
    },
    /// Sample the device's location
    Platform {
        /// Stop after this many outcomes
        #[arg(long, default_value_t = 10)]
        fixes: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = screen_config(&cli)?;

    match cli.command {
        Commands::Replay { route } => {
            let steps = load_route(&route)?;
            println!(
                "{}",
                format!("Replaying {} steps from {}", steps.len(), route.display())
                    .green()
                    .bold()
            );
            let sampler = Sampler::new(Arc::new(ReplayProvider::new(steps)));
            run(config, sampler, usize::MAX).await
        }
        Commands::Platform { fixes } => {
            let sampler = Sampler::platform();
            if !sampler.is_supported() {
                println!("{}", "No location provider on this platform".yellow());
            }
            run(config, sampler, fixes).await
        }
    }
}

fn screen_config(cli: &Cli) -> Result<ScreenConfig> {
    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("Invalid screen configuration in {}", path.display()));
    }
    ScreenConfig::preset(&cli.screen)
        .with_context(|| format!("Unknown screen preset '{}'", cli.screen))
}

fn load_route(path: &Path) -> Result<Vec<ReplayStep>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid route in {}", path.display()))
}

async fn run(config: ScreenConfig, sampler: Sampler, limit: usize) -> Result<()> {
    let renderer: Arc<dyn MapRenderer> = Arc::new(ConsoleRenderer::default());
    let mut session =
        TrackingSession::mount(config, sampler, Some(renderer)).context("Failed to mount screen")?;

    let mut feed = session.start().await.context("Failed to start tracking")?;
    print_view(session.view());

    let mut seen = 0;
    while seen < limit {
        let Some(event) = feed.next().await else {
            break;
        };
        seen += 1;
        if session.handle(event).context("Failed to update the map")? {
            print_view(session.view());
        }
    }

    session.unmount().context("Failed to unmount screen")?;
    log::info!("processed {seen} outcomes");
    Ok(())
}

fn print_view(view: &PresenterView) {
    let status = match view.status {
        TrackingStatus::Found => view.status_line.green().bold().to_string(),
        TrackingStatus::Idle | TrackingStatus::Detecting => view.status_line.yellow().to_string(),
        _ => view.status_line.red().bold().to_string(),
    };
    println!("{status}");
    if view.status != TrackingStatus::Found {
        return;
    }

    let readout = &view.readout;
    println!("  Latitude:  {}", readout.latitude);
    println!("  Longitude: {}", readout.longitude);
    println!("  Accuracy:  {}", readout.accuracy);
    println!("  Altitude:  {} ({})", readout.altitude, readout.altitude_accuracy);
    println!("  Speed:     {} ({})", readout.speed, readout.motion);
    println!("  Heading:   {}", readout.heading);
    if let Some(compass) = view.compass {
        println!("  Compass:   {}", compass.bold());
    }
}
