use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{WrapErr, bail, eyre};
use fundsim::report::{render_sensitivity, render_simulation, to_json};
use fundsim::{Overrides, Scenario, SearchWorker, WorkerRequest, WorkerResponse, init_logging};
use jiff::Timestamp;

#[derive(Parser, Debug)]
#[command(name = "fundsim")]
#[command(about = "Monte Carlo simulator for venture fund returns")]
struct Cli {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate the fund described by a scenario file
    Simulate {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Find the adjustments needed to reach target multiples
    Sensitivity {
        #[command(flatten)]
        run: RunArgs,

        /// Target fund MOIC; repeat for several targets
        #[arg(short, long = "target")]
        targets: Vec<f64>,

        /// Largest increase searched, in percent
        #[arg(long)]
        max_adjustment: Option<f64>,

        /// Grid step, in percent
        #[arg(long)]
        step: Option<f64>,

        /// Cancel the search after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the scenario YAML file
    scenario: PathBuf,

    /// Override the number of trials
    #[arg(long)]
    trials: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Emit JSON instead of a text report
    #[arg(long)]
    json: bool,
}

fn load(run: &RunArgs, overrides: Overrides) -> color_eyre::Result<Scenario> {
    let mut scenario = Scenario::load(&run.scenario)
        .wrap_err_with(|| format!("Failed to load scenario {}", run.scenario.display()))?;
    scenario.apply(&Overrides {
        trials: run.trials,
        seed: run.seed,
        ..overrides
    });
    Ok(scenario)
}

fn scenario_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn log_progress(percent: f64, step: &str) {
    tracing::info!("[{percent:>3.0}%] {step}");
}

fn simulate(run: RunArgs) -> color_eyre::Result<()> {
    let scenario = load(&run, Overrides::default())?;
    let name = scenario_name(&run.scenario);

    let worker = SearchWorker::new();
    worker.send(WorkerRequest::Simulate {
        investments: scenario.investments,
        config: scenario.simulation,
    });

    let result = match worker.wait(None, log_progress) {
        WorkerResponse::SimulationComplete(result) => result,
        WorkerResponse::Error(msg) => bail!("Simulation failed: {msg}"),
        other => return Err(eyre!("Unexpected worker response: {other:?}")),
    };

    let now = Timestamp::now();
    if run.json {
        println!("{}", to_json(&name, &*result, now)?);
    } else {
        print!("{}", render_simulation(&name, &result, now));
    }
    Ok(())
}

fn sensitivity(
    run: RunArgs,
    targets: Vec<f64>,
    max_adjustment: Option<f64>,
    step: Option<f64>,
    timeout_secs: Option<u64>,
) -> color_eyre::Result<()> {
    let scenario = load(
        &run,
        Overrides {
            targets,
            max_adjustment,
            step,
            ..Default::default()
        },
    )?;
    let name = scenario_name(&run.scenario);

    let Some(section) = scenario.sensitivity else {
        bail!("No target multiples: pass --target or add a sensitivity section to the scenario");
    };
    if section.targets.is_empty() {
        bail!("No target multiples: pass --target or list sensitivity.targets in the scenario");
    }

    let worker = SearchWorker::new();
    worker.send(WorkerRequest::Sensitivity {
        investments: scenario.investments,
        config: scenario.simulation,
        baseline: None,
        targets: section.targets,
        search: section.config,
    });

    let deadline = timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    let report = match worker.wait(deadline, log_progress) {
        WorkerResponse::SensitivityComplete(report) => report,
        WorkerResponse::Cancelled => bail!("Sensitivity search cancelled after the time limit"),
        WorkerResponse::Error(msg) => bail!("Sensitivity search failed: {msg}"),
        other => return Err(eyre!("Unexpected worker response: {other:?}")),
    };

    let now = Timestamp::now();
    if run.json {
        println!("{}", to_json(&name, &*report, now)?);
    } else {
        print!("{}", render_sensitivity(&name, &report, now));
    }
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let _guard = init_logging(&cli.log_level, cli.log_file.as_deref())?;

    match cli.command {
        Command::Simulate { run } => simulate(run)?,
        Command::Sensitivity {
            run,
            targets,
            max_adjustment,
            step,
            timeout_secs,
        } => sensitivity(run, targets, max_adjustment, step, timeout_secs)?,
    }

    tracing::debug!("Done");
    Ok(())
}
