use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use embann::{
    ConvergenceConfig, DurationConfig, Error, Float32, Float64, FloatScalar, Network,
    NetworkBuilder, NumericProfile, SampleStore, SystemClock, TrainReport,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Train a network on a simulated analog sensor and report how well it separates the classes.
#[derive(Debug, Parser)]
#[command(name = "embann", version, about)]
struct Cli {
    /// Input neurons (histogram bins).
    #[arg(long, default_value_t = 10)]
    inputs: usize,
    /// Neurons per hidden layer.
    #[arg(long, default_value_t = 10)]
    hidden: usize,
    #[arg(long, default_value_t = 1)]
    hidden_layers: usize,
    /// Output neurons, one per class.
    #[arg(long, default_value_t = 3)]
    outputs: usize,

    /// Full-scale sensor reading.
    #[arg(long, default_value_t = 1023)]
    max_input: u16,
    /// Raw readings per example.
    #[arg(long, default_value_t = 32)]
    sample_len: usize,
    #[arg(long, default_value_t = 20)]
    examples_per_class: usize,

    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,
    /// Seed for the process-wide RNG; drawn from entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = Profile::F32)]
    profile: Profile,
    /// Log every training step.
    #[arg(long)]
    verbose: bool,
    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Profile {
    F32,
    F64,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train for a fixed wall-clock budget.
    Time {
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
    },
    /// Train until every class's cost reaches the target.
    Converge {
        #[arg(long, default_value_t = 0.01)]
        desired_cost: f64,
        #[arg(long)]
        max_steps: Option<u64>,
    },
}

#[derive(Debug, Serialize)]
struct Summary {
    profile: String,
    report: TrainReport,
    accuracy: f64,
}

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("embann=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let summary = match cli.profile {
        Profile::F32 => run::<Float32>(&cli, &mut rng),
        Profile::F64 => run::<Float64>(&cli, &mut rng),
    };

    match summary.and_then(|summary| report(&cli, &summary)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "training run failed");
            ExitCode::FAILURE
        }
    }
}

fn run<P>(cli: &Cli, rng: &mut StdRng) -> embann::Result<Summary>
where
    P: NumericProfile,
    P::Activation: FloatScalar,
    P::Weight: FloatScalar,
{
    let builder =
        NetworkBuilder::<P>::new(cli.inputs, cli.hidden, cli.hidden_layers, cli.outputs)?;
    let mut net = builder.build_with_rng(rng)?;
    let sensor = Sensor::new(cli.outputs, cli.max_input);

    let mut store = SampleStore::new(cli.outputs, cli.sample_len, cli.max_input)?;
    let mut reading = vec![0_u16; store.sample_len()];
    for class in 0..cli.outputs {
        for _ in 0..cli.examples_per_class {
            sensor.fill(class, &mut reading, rng);
            store.push(class, &reading)?;
        }
    }
    info!(examples = store.len(), "collected training examples");

    let report = match cli.mode {
        Mode::Time { seconds } => {
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|err| Error::InvalidConfig(format!("seconds: {err}")))?;
            let cfg = DurationConfig {
                learning_rate: cli.learning_rate,
                duration,
                verbose: cli.verbose,
            };
            net.train_for_duration(&store, &SystemClock::new(), rng, &cfg)?
        }
        Mode::Converge {
            desired_cost,
            max_steps,
        } => {
            let cfg = ConvergenceConfig {
                learning_rate: cli.learning_rate,
                desired_cost,
                verbose: cli.verbose,
                max_steps,
            };
            net.train_until_converged(&store, rng, &cfg)?
        }
    };

    let accuracy = evaluate(&mut net, &sensor, cli, rng)?;
    info!(steps = report.steps, converged = report.converged, accuracy, "done");

    Ok(Summary {
        profile: format!("{:?}", cli.profile).to_lowercase(),
        report,
        accuracy,
    })
}

/// Classify freshly simulated readings for every class.
fn evaluate<P: NumericProfile>(
    net: &mut Network<P>,
    sensor: &Sensor,
    cli: &Cli,
    rng: &mut StdRng,
) -> embann::Result<f64> {
    let mut reading = vec![0_u16; cli.sample_len];
    let mut correct = 0_usize;
    let mut total = 0_usize;
    for class in 0..cli.outputs {
        for _ in 0..cli.examples_per_class {
            sensor.fill(class, &mut reading, rng);
            net.encode_input(&reading, cli.max_input)?;
            if net.propagate() == class {
                correct += 1;
            }
            total += 1;
        }
    }
    Ok(if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    })
}

fn report(cli: &Cli, summary: &Summary) -> embann::Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(summary)
            .map_err(|err| Error::InvalidData(format!("serialize summary: {err}")))?;
        println!("{json}");
    } else {
        println!(
            "profile={} steps={} converged={} elapsed_ms={} accuracy={:.3}",
            summary.profile,
            summary.report.steps,
            summary.report.converged,
            summary.report.elapsed_ms,
            summary.accuracy
        );
    }
    Ok(())
}

/// Simulated analog sensor: each class reads around its own level with uniform noise.
#[derive(Debug, Clone, Copy)]
struct Sensor {
    band: f64,
    max_input: u16,
}

impl Sensor {
    fn new(num_classes: usize, max_input: u16) -> Self {
        Self {
            band: f64::from(max_input) / num_classes.max(1) as f64,
            max_input,
        }
    }

    fn fill<R: Rng + ?Sized>(&self, class: usize, reading: &mut [u16], rng: &mut R) {
        let level = (class as f64 + 0.5) * self.band;
        let spread = self.band * 0.4;
        for value in reading.iter_mut() {
            let raw = level + rng.gen_range(-spread..=spread);
            *value = raw.round().clamp(0.0, f64::from(self.max_input)) as u16;
        }
    }
}
