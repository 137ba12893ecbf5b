//! SEDPNR Claim-Diffusion Simulator
//!
//! Builds a synthetic city, seeds the configured claims, runs the tick loop,
//! and writes the results table, the spatial stream, and a JSON summary.

use clap::Parser;
use sedpnr_core::config::{SpatialMode, DEFAULT_CONFIG_PATH};
use sedpnr_core::output::{
    ensure_dir, write_results_csv, write_summary_json, SpatialWriter, RESULTS_FILE, SPATIAL_FILE,
    SUMMARY_FILE,
};
use sedpnr_core::{ClaimId, SimConfig, SimError, Simulation};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Rows of the console progress table are printed this often
const PROGRESS_INTERVAL: u64 = 20;

/// Command line arguments for the simulator
#[derive(Parser, Debug)]
#[command(name = "sedpnr-sim")]
#[command(about = "Competing-claim diffusion over a synthetic city (SEDPNR model)")]
struct Args {
    /// Configuration file (TOML, or the flat key = value format for `.cfg` files)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of agents (overrides the config file)
    #[arg(long)]
    population: Option<usize>,

    /// Number of ticks to simulate (overrides the config file)
    #[arg(long)]
    ticks: Option<u64>,

    /// Random seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory (overrides the config file)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Spatial stream: full, engaged, or off
    #[arg(long)]
    spatial: Option<SpatialMode>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), SimError> {
    if args.print_default_config {
        print!("{}", SimConfig::default().to_toml()?);
        return Ok(());
    }

    let config = load_config(&args)?;
    let ticks = config.simulation.ticks;
    let output_dir = PathBuf::from(&config.output.directory);
    let spatial_mode = config.output.spatial;

    println!("SEDPNR Claim-Diffusion Simulator");
    println!("================================");
    println!("Population: {}", config.simulation.population);
    println!("Districts: {}", config.city.num_districts);
    println!("Ticks: {}", ticks);
    println!("Seed: {}", config.simulation.seed);
    println!();

    ensure_dir(&output_dir)?;

    let mut sim = Simulation::new(config);
    let claims = sim.seed_configured_claims();
    info!(
        agents = sim.population().len(),
        edges = sim.population().total_edges(),
        claims = claims.len(),
        "simulation ready"
    );

    let mut spatial = match spatial_mode {
        SpatialMode::Off => SpatialWriter::null(),
        _ => SpatialWriter::create(output_dir.join(SPATIAL_FILE))?,
    };

    sim.start();
    spatial.write_rows(&sim.drain_spatial())?;
    print_progress_header();
    print_progress(&sim, &claims);

    for _ in 0..ticks {
        sim.step();
        spatial.write_rows(&sim.drain_spatial())?;
        if sim.tick() % PROGRESS_INTERVAL == 0 {
            print_progress(&sim, &claims);
        }
    }
    spatial.flush()?;

    let results_path = output_dir.join(RESULTS_FILE);
    let rows = write_results_csv(&results_path, sim.recorder().rows())?;
    info!(path = %results_path.display(), rows, "wrote results");
    if spatial_mode != SpatialMode::Off {
        info!(rows = spatial.rows_written(), "wrote spatial data");
    }

    let summary = sim.summary();
    write_summary_json(&output_dir.join(SUMMARY_FILE), &summary)?;

    println!();
    println!("Final distribution");
    println!("------------------");
    for claim in &summary.claims {
        let c = &claim.final_counts;
        println!(
            "{} ({}): S={} E={} D={} P={} N={} R={}  peak P={} at tick {}",
            claim.name,
            if claim.is_misinformation { "misinformation" } else { "truth" },
            c.susceptible,
            c.exposed,
            c.doubtful,
            c.propagating,
            c.not_spreading,
            c.recovered,
            claim.peak_propagating,
            claim.peak_tick,
        );
    }
    println!(
        "Network: {} -> {} edges ({} pruned, {} rewired)",
        summary.network.initial_edges,
        summary.network.final_edges,
        summary.network.edges_pruned,
        summary.network.edges_rewired,
    );
    println!("Results written to {}", output_dir.display());

    Ok(())
}

/// Config file (if any), then command-line overrides.
fn load_config(args: &Args) -> Result<SimConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            read_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => SimConfig::default(),
    };

    if let Some(population) = args.population {
        if population == 0 {
            return Err(SimError::InvalidArgument(
                "population must be at least 1".to_string(),
            ));
        }
        config.simulation.population = population;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(output) = &args.output {
        config.output.directory = output.display().to_string();
    }
    if let Some(spatial) = args.spatial {
        config.output.spatial = spatial;
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<SimConfig, SimError> {
    info!(path = %path.display(), "loading configuration");
    let legacy = path.extension().is_some_and(|ext| ext == "cfg");
    let config = if legacy {
        SimConfig::from_legacy_file(path)?
    } else {
        SimConfig::from_file(path)?
    };
    Ok(config)
}

fn print_progress_header() {
    println!(
        "{:>6} | {:<20} | {:>6} | {:>6} | {:>6} | {:>6} | {:>6} | {:>6}",
        "Step", "Claim", "S", "E", "D", "P", "N", "R"
    );
    println!("{}", "-".repeat(86));
}

fn print_progress(sim: &Simulation, claims: &[ClaimId]) {
    for &id in claims {
        let Some(claim) = sim.claims().get(id) else {
            continue;
        };
        let c = sim.counts(id);
        println!(
            "{:>6} | {:<20} | {:>6} | {:>6} | {:>6} | {:>6} | {:>6} | {:>6}",
            sim.tick(),
            claim.name,
            c.susceptible,
            c.exposed,
            c.doubtful,
            c.propagating,
            c.not_spreading,
            c.recovered
        );
    }
}
