//! Wirenet churn simulation
//!
//! Hammer a wired topology from several threads and check it afterwards.
//!
//! Usage: wirenet-sim [nodes] [workers] [steps] [seed]

use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wirenet_sim::{Simulation, SimulationConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wirenet_sim=info,wirenet_topology=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line args
    let args: Vec<String> = env::args().collect();
    let defaults = SimulationConfig::default();

    let config = SimulationConfig {
        nodes: args.get(1).and_then(|s| s.parse().ok()).unwrap_or(defaults.nodes),
        workers: args.get(2).and_then(|s| s.parse().ok()).unwrap_or(defaults.workers),
        steps_per_worker: args
            .get(3)
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.steps_per_worker),
        seed: args.get(4).and_then(|s| s.parse().ok()).unwrap_or(defaults.seed),
        ..defaults
    };

    println!("Wirenet Churn Simulation");
    println!("========================");
    println!();
    println!(
        "{} nodes, {} workers, {} steps each, seed {}",
        config.nodes, config.workers, config.steps_per_worker, config.seed
    );

    let sim = Simulation::new(config)?;
    let report = sim.run()?;

    println!();
    println!("Simulation complete:");
    println!("  Links: {}", report.links);
    println!("  Unlinks: {}", report.unlinks);
    println!("  Replacements: {}", report.replacements);
    println!("  Wired transmissions: {}", report.wired_transmissions);
    println!("  Wireless transmissions: {}", report.wireless_transmissions);
    println!("  Deliveries: {}", report.deliveries);
    println!("  Stale handles: {}", report.stale_handles);
    println!("  Networks: {}", report.networks);
    println!("  Largest network: {}", report.largest_network);
    println!();
    println!("Connectivity check passed.");

    Ok(())
}
