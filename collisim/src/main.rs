use collisim::{bench_broad_phase, Scenario, ScenarioConfig};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, default_value = "collision.yaml")]
    file_name: String,

    /// Run without a window for `t_end / h0` frames (or `--steps`)
    #[arg(long)]
    headless: bool,

    /// Frame count for headless runs
    #[arg(long)]
    steps: Option<usize>,

    /// Print the broad-phase benchmark table and exit
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path).with_context(|| format!("opening {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg = ScenarioConfig::from_reader(reader)
        .with_context(|| format!("parsing {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.bench {
        bench_broad_phase()?;
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let mut scenario = Scenario::build_scenario(scenario_cfg)?;

    if args.headless || !cfg!(feature = "viewer") {
        let summary = scenario.run_headless(args.steps);
        tracing::info!(
            frames = summary.frames,
            t = summary.time,
            bodies = summary.bodies,
            "headless run finished"
        );
        return Ok(());
    }

    #[cfg(feature = "viewer")]
    collisim::run_2d(scenario);

    Ok(())
}
