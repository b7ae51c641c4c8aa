use warehouse_mapf::config::{Cli, Config};
use warehouse_mapf::level;
use warehouse_mapf::search::{SearchOutcome, Solver};

use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let (ctx, initial) = level::load(&config.level_path)
        .with_context(|| format!("error loading level: {}", config.level_path))?;
    let ctx = Rc::new(ctx);
    info!(
        "Loaded level {:?} with {} agents and {} boxes",
        ctx.level_name,
        ctx.num_agents(),
        ctx.num_boxes()
    );

    let mut solver = Solver::new(ctx.clone(), config);
    match solver.solve(initial) {
        SearchOutcome::Solved(plan) => {
            println!("{}", plan.format());
        }
        SearchOutcome::NoSolution => {
            error!("search exhausted the state space without finding a plan");
        }
        SearchOutcome::ResourceLimit => {
            error!("search aborted after hitting the expansion budget");
        }
    }

    Ok(())
}
