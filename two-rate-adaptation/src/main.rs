//! Two-Rate Adaptation - visuomotor rotation task core
//!
//! Generates counterbalanced schedules and runs sessions headlessly.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use two_rate_adaptation::app::cli::{Cli, Commands, ConfigAction};
use two_rate_adaptation::app::config::Config;
use two_rate_adaptation::schedule::{ConditionCode, Schedule, ScheduleGenerator, CONDITION_CELLS};
use two_rate_adaptation::session::{
    HeadlessRig, JsonLinesSink, SessionDriver, SessionSettings, SimulationConfig,
};

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Schedule {
            condition,
            seed,
            json,
        } => {
            run_schedule(condition, seed, json, &config)?;
        }
        Commands::Simulate {
            condition,
            seed,
            output,
            jitter,
            quit_after,
        } => {
            match run_simulate(condition, seed, output, jitter, quit_after, &config) {
                Err(two_rate_adaptation::Error::Cancelled) => {
                    println!("The [Escape] key was pressed. Goodbye!");
                }
                other => other?,
            }
        }
        Commands::Conditions => {
            run_conditions();
        }
        Commands::Config { action } => {
            run_config(action, &config, &config_path)?;
        }
    }

    Ok(())
}

/// CLI value first, then the configured one.
fn resolve_condition(condition: Option<String>, config: &Config) -> ConditionCode {
    let raw = condition.unwrap_or_else(|| config.experiment.condition.clone());
    ConditionCode::parse_or_default(&raw)
}

fn generator(seed: Option<u64>, config: &Config) -> ScheduleGenerator {
    match seed.or(config.experiment.seed) {
        Some(seed) => ScheduleGenerator::with_seed(seed),
        None => ScheduleGenerator::new(),
    }
}

fn run_schedule(
    condition: Option<String>,
    seed: Option<u64>,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let code = resolve_condition(condition, config);
    let schedule = generator(seed, config).generate(code)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
        return Ok(());
    }

    print_schedule(&schedule);
    Ok(())
}

fn print_schedule(schedule: &Schedule) {
    let cb = &schedule.counterbalance;
    println!("Condition {}", cb.code);
    println!(
        "  order choice {}  target choice {}  rotation choice {}",
        cb.order_choice, cb.target_choice, cb.rotation_choice
    );
    println!("  task order {:?}  sign {:?}", cb.order.ids(), cb.sign.as_pair());
    println!();

    for task in &schedule.tasks {
        println!(
            "Task {} ({}, sign {:+}): {} trials",
            task.task_index,
            task.task_type,
            task.sign,
            task.len()
        );
        // Collapse runs of equal rotation into phases
        let mut start = 0;
        for i in 1..=task.rotations.len() {
            if i == task.rotations.len() || task.rotations[i] != task.rotations[start] {
                println!(
                    "  trials {:>3}-{:<3} rotation {}",
                    start,
                    i - 1,
                    task.rotations[start]
                );
                start = i;
            }
        }
    }
    println!();
    println!("Total: {} trials", schedule.total_trials());
}

fn run_simulate(
    condition: Option<String>,
    seed: Option<u64>,
    output: Option<PathBuf>,
    jitter: f64,
    quit_after: Option<usize>,
    config: &Config,
) -> Result<(), two_rate_adaptation::Error> {
    let code = resolve_condition(condition, config);
    let schedule = generator(seed, config).generate(code)?;
    let mut driver = SessionDriver::new(schedule, SessionSettings::from_config(config));

    let output_path = output.unwrap_or_else(|| {
        config
            .output
            .directory
            .join(driver.metadata().file_name())
    });
    let mut sink = JsonLinesSink::create(&output_path)?;
    info!("Writing session data to {:?}", output_path);

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = stop_flag.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        stop_flag_handler.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let sim = SimulationConfig {
        seed: seed.or(config.experiment.seed).unwrap_or(0),
        jitter_deg: jitter,
        quit_after_trials: quit_after,
        ..SimulationConfig::default()
    };
    let mut rig = HeadlessRig::new(sim).with_interrupt(stop_flag);
    let report = rig.run(&mut driver, &mut sink)?;

    let metadata = driver.metadata();
    println!("Session {} (condition {})", metadata.id, metadata.condition);
    println!("  Trials recorded: {}", report.trials_recorded);
    println!("  Trials skipped:  {}", report.trials_skipped);
    println!("  Frames:          {}", report.frames);
    println!("  Simulated time:  {:.1}s", report.duration_secs);
    println!("  Records written: {}", sink.written());
    println!("  Output:          {}", sink.path().display());

    Ok(())
}

fn run_conditions() {
    println!("{:>4}  {:<10} {:<8} {:<10} {}", "code", "order", "sign", "targets", "task types");
    for value in 0..CONDITION_CELLS {
        let cb = ConditionCode::new(value).counterbalance();
        let types: Vec<String> = cb.order.iter().map(|t| t.to_string()).collect();
        let sign = cb.sign.as_pair();
        println!(
            "{:>4}  {:<10} {:<8} {:<10} {}",
            value,
            format!("{:?}", cb.order.ids()),
            format!("{:+}/{:+}", sign[0], sign[1]),
            if cb.target_choice == 0 { "right-left" } else { "left-right" },
            types.join(" > ")
        );
    }
    println!();
    println!("Codes >= {} repeat these cells (code mod {}).", CONDITION_CELLS, CONDITION_CELLS);
}

fn run_config(action: ConfigAction, config: &Config, config_path: &PathBuf) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", config_path);
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {:?}. Use --force to overwrite.",
                    config_path
                );
            }

            config.save(config_path)?;
            std::fs::create_dir_all(&config.output.directory)?;
            println!("Created config at {:?}", config_path);
            println!("Data directory: {:?}", config.output.directory);
        }
        ConfigAction::Get { key } => match config.get_value(&key)? {
            Some(value) => println!("{} = {}", key, value),
            None => anyhow::bail!("Configuration key '{}' not found", key),
        },
        ConfigAction::Set { key, value } => {
            if !config_path.exists() {
                anyhow::bail!("No config file found. Run 'two-rate config init' first.");
            }
            let updated = config.with_value(&key, &value)?;
            updated.save(config_path)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Reset { force } => {
            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save(config_path)?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}
