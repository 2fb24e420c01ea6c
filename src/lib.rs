pub mod actions;
pub mod config;
pub mod entities;
pub mod error;
pub mod persistence;
pub mod scripting;
pub mod telemetry;
pub mod world;

#[cfg(test)]
mod test_support;

pub use actions::deny::{DenyReason, DenyResult};
pub use config::{AppConfig, Rules, WorldConfig};
pub use error::WorldError;
pub use world::containment::Location;
pub use world::events::WorldEvent;
pub use world::state::World;

use tracing::{error, info};

/// Loads the world file under the asset root, builds an empty world from
/// it and reports what it found.
pub fn run(args: &[String]) -> Result<(), String> {
    let config = AppConfig::from_args(args)?;
    let log_path = telemetry::logging::init(&config.root)?;
    let world_config = config.world_config().map_err(|err| err.to_string())?;
    let world = World::from_config(&world_config).map_err(|err| err.to_string())?;
    let rules = world.rules();
    info!(
        config = %config.config_path.display(),
        reach = rules.reach_range,
        walk_ms = rules.walk_step_ms,
        "worldcore ready"
    );

    println!("worldcore: world loaded");
    println!("- root: {}", config.root.display());
    println!("- config: {}", config.config_path.display());
    println!("- log: {}", log_path.display());
    println!("- templates: {}", world.defs().len());
    println!("- regions: {}", world_config.map.regions.len());
    println!(
        "- map: {}x{} on {} plane(s)",
        world_config.map.width, world_config.map.height, world_config.map.planes
    );
    println!(
        "- rules: reach={}, walk={}ms, mounted={}ms",
        rules.reach_range, rules.walk_step_ms, rules.mounted_step_ms
    );

    let problems = world.check_invariants();
    if !problems.is_empty() {
        for problem in &problems {
            error!(%problem, "invariant check failed");
            eprintln!("worldcore: {}", problem);
        }
        return Err(format!("{} invariant problem(s) at startup", problems.len()));
    }
    Ok(())
}
