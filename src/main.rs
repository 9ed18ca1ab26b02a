//! corrsom CLI - correlation learning between cross-coupled SOMs
//!
//! Command-line interface for running simulations and inspecting results.

use clap::{Parser, Subcommand, ValueEnum};
use corrsom::{
    data_for, Config, CrossModalRule, DataSource, Network, Result, RunRecord, Schedule, Trainer,
    UpdateMode,
};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use log::error;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "corrsom")]
#[command(version)]
#[command(about = "Correlation learning between cross-coupled self-organizing maps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    None,
    Hebbian,
    Covariance,
}

impl From<RuleArg> for CrossModalRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::None => CrossModalRule::None,
            RuleArg::Hebbian => CrossModalRule::Hebbian,
            RuleArg::Covariance => CrossModalRule::Covariance,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and save its results
    Train {
        /// JSON configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output run file (a descriptive name is generated when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short = 'n', long)]
        epochs: Option<usize>,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,

        /// Use exponentially adapted learning coefficients
        #[arg(long)]
        adaptive: bool,

        /// Cross-modal learning rule
        #[arg(short, long, value_enum)]
        rule: Option<RuleArg>,

        /// Sensor data files, one per map in configuration order
        #[arg(long = "sensor-file", num_args = 1..)]
        sensor_files: Vec<PathBuf>,

        /// Print every map after training
        #[arg(long)]
        show: bool,
    },

    /// Show a saved run
    Info {
        /// Run file to inspect
        run: PathBuf,

        /// Print the full schedule table
        #[arg(long)]
        schedule: bool,

        /// Print weights, links and activations of every map
        #[arg(long)]
        maps: bool,
    },

    /// Write the default configuration as JSON
    Config {
        /// Output file
        #[arg(short, long, default_value = "corrsom.json")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let result = match cli.command {
        Commands::Train {
            config,
            output,
            epochs,
            seed,
            adaptive,
            rule,
            sensor_files,
            show,
        } => {
            let overrides = Overrides {
                epochs,
                seed,
                adaptive,
                rule: rule.map(Into::into),
                sensor_files,
            };
            run_training(config, output, overrides, show)
        }

        Commands::Info {
            run,
            schedule,
            maps,
        } => show_info(run, schedule, maps),

        Commands::Config { output } => write_default_config(output),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Overrides {
    epochs: Option<usize>,
    seed: Option<u64>,
    adaptive: bool,
    rule: Option<CrossModalRule>,
    sensor_files: Vec<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(epochs) = self.epochs {
            config.schedule.epochs = epochs;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.adaptive {
            config.schedule.mode = UpdateMode::Adaptive;
        }
        if let Some(rule) = self.rule {
            config.schedule.rule = rule;
        }
        if !self.sensor_files.is_empty() {
            config.data.source = DataSource::Sensor;
            config.data.sensor_files = self.sensor_files;
        }
    }
}

fn run_training(
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    overrides: Overrides,
    show: bool,
) -> Result<()> {
    let start_time = Instant::now();

    let mut config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;

    if config.num_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()
            .map_err(|e| corrsom::CorrsomError::Config(e.to_string()))?;
    }

    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    println!("corrsom correlation learning network");
    for map in &config.network.maps {
        println!(
            "   SOM{}: {}x{} neurons, input dim {}",
            map.id, map.rows, map.cols, map.input_dim
        );
    }
    println!(
        "   {} epochs, {:?} coefficients, {} rule, {} data",
        config.schedule.epochs,
        config.schedule.mode,
        config.schedule.rule,
        config.data.source.name()
    );
    println!();

    let mut network = Network::from_config(&config.network, &mut rng)?;
    let datasets = data_for(&config, &mut rng)?;
    println!("✓ Prepared {} samples per map", datasets[0].len());

    let mut trainer = Trainer::new(Schedule::from_config(&config.schedule)?);
    let epochs = trainer.schedule().epochs();

    let bar_style = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
        .map_err(|e| corrsom::CorrsomError::Config(e.to_string()))?
        .progress_chars("█▓▒░  ");
    let pb = ProgressBar::new(epochs as u64);
    pb.set_style(bar_style);
    pb.set_message("Training...");

    for epoch in 0..epochs {
        let params = trainer.train_epoch(&mut network, &datasets, epoch)?;
        pb.set_message(format!(
            "Training (alpha={:.4}, sigma={:.3}, gamma={:.3})",
            params.alpha, params.sigma, params.gamma
        ));
        pb.inc(1);
    }
    pb.finish_and_clear();
    println!("✓ Trained {} epochs", epochs);

    if let Some(errors) = trainer.metrics().quantization_errors.last() {
        for (som, qe) in network.maps().iter().zip(errors) {
            println!("   SOM{} quantization error: {:.4}", som.id, qe);
        }
    }

    if show {
        for som in network.maps() {
            println!("\n{}", som);
        }
    }

    let (schedule, metrics) = trainer.into_parts();
    let record = RunRecord::new(config, schedule, metrics, network, datasets);
    let output = output.unwrap_or_else(|| PathBuf::from(record.default_file_name()));
    record.save(&output)?;

    println!("✓ Saved run to {}", output.display());
    println!("   Total time: {}", HumanDuration(start_time.elapsed()));
    Ok(())
}

fn show_info(path: PathBuf, schedule: bool, maps: bool) -> Result<()> {
    let record = RunRecord::load(&path)?;
    // re-check the pairing invariants of what was loaded
    record.network()?;

    println!("{}", path.display());
    print!("{}", record);

    if schedule {
        println!();
        print!("{}", record.schedule);
    }
    if maps {
        for som in &record.maps {
            println!("\n{}", som);
        }
    }
    Ok(())
}

fn write_default_config(output: PathBuf) -> Result<()> {
    Config::default().save(&output)?;
    println!("✓ Wrote default configuration to {}", output.display());
    Ok(())
}
