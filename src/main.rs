use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use segsieve::storage;
use segsieve::verify::verify_tail;
use segsieve::{MAX_LIMIT, SieveConfig, SieveResult, Strategy, sieve};

#[derive(Parser)]
#[command(name = "segsieve")]
#[command(about = "Segmented bit-packed Sieve of Eratosthenes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Count the primes up to a limit and show the largest of them")]
    Primes {
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long, help = "Write every prime to primes.txt in the data directory")]
        enumerate: bool,
        #[arg(
            short,
            long,
            requires = "enumerate",
            help = "Save primes in binary format (8 bytes per prime, little-endian)"
        )]
        binary: bool,
        #[arg(short, long, requires = "enumerate", help = "Write primes here instead of the data directory")]
        output: Option<PathBuf>,
        #[arg(long, help = "Check the largest primes with GMP Miller-Rabin")]
        verify: bool,
        #[arg(long, help = "Do not append to the execution log")]
        no_log: bool,
    },
    #[command(about = "Time each strategy over repeated runs")]
    Bench {
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(short, long, default_value = "10", help = "Runs per strategy")]
        runs: usize,
    },
}

#[derive(Args)]
struct EngineArgs {
    #[arg(
        help = "The upper limit to search for primes",
        value_parser = clap::value_parser!(u64).range(0..=MAX_LIMIT)
    )]
    limit: u64,
    #[arg(
        short,
        long,
        env = "SEGSIEVE_WORKERS",
        help = "Number of worker threads (defaults to CPU count)"
    )]
    workers: Option<usize>,
    #[arg(long, help = "Sieve all segments in the calling thread")]
    sequential: bool,
    #[arg(
        long,
        env = "SEGSIEVE_SEGMENT_KIB",
        default_value = "32",
        value_parser = clap::value_parser!(u64).range(1..=1 << 20),
        help = "Segment buffer size in KiB (fit it to the L1/L2 data cache)"
    )]
    segment_kib: u64,
    #[arg(short = 'k', long = "tail", default_value = "5", help = "How many of the largest primes to show")]
    tail: usize,
}

impl EngineArgs {
    fn strategy(&self) -> Strategy {
        if self.sequential {
            Strategy::Sequential
        } else {
            Strategy::parallel(self.workers.unwrap_or(0))
        }
    }

    fn config(&self) -> SieveConfig {
        SieveConfig::default()
            .with_strategy(self.strategy())
            .with_segment_bytes(self.segment_kib as usize * 1024)
            .with_tail_len(self.tail)
    }
}

fn main() -> Result<()> {
    // LOG_FORMAT=json for machine-readable logs, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").unwrap_or_default() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Primes {
            engine,
            enumerate,
            binary,
            output,
            verify,
            no_log,
        } => run_primes(&engine, enumerate, binary, output, verify, no_log),
        Commands::Bench { engine, runs } => run_bench(&engine, runs),
    }
}

fn run_primes(
    engine: &EngineArgs,
    enumerate: bool,
    binary: bool,
    output: Option<PathBuf>,
    verify: bool,
    no_log: bool,
) -> Result<()> {
    let config = engine.config().with_enumeration(enumerate);
    info!(
        limit = engine.limit,
        strategy = %config.strategy,
        segment_span = config.segment_span,
        "starting sieve"
    );

    println!("Finding primes up to {} ({})...", engine.limit, config.strategy);

    let start = Instant::now();
    let result = sieve(engine.limit, &config).context("sieve failed")?;
    let duration = start.elapsed();

    print_result(&result);
    print_duration("Sieve time", duration);
    if let Some(rate) = rate_millions_per_sec(engine.limit, duration) {
        println!("Rate: {:.1} million/sec", rate);
    }

    if let Some(primes) = &result.primes {
        let path = match output {
            Some(path) => path,
            None => storage::data_dir()?.join(if binary {
                storage::PRIMES_BINARY_FILE
            } else {
                storage::PRIMES_TEXT_FILE
            }),
        };
        let written = if binary {
            storage::save_primes_binary(&path, primes)
        } else {
            storage::save_primes_text(&path, primes)
        }
        .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nSaved {} primes to {}", written, path.display());
    }

    if verify && config.tail_len > 0 {
        verify_tail(engine.limit, &result.tail).context("tail verification failed")?;
        println!("Verified last {} with GMP", result.tail.len());
    }

    if !no_log {
        let logged = storage::data_dir().and_then(|dir| {
            storage::log_execution(
                &dir,
                "primes",
                &engine.limit.to_string(),
                &config.strategy.to_string(),
                duration.as_micros(),
            )
        });
        if let Err(e) = logged {
            warn!(error = %e, "failed to log execution");
        }
    }

    Ok(())
}

fn run_bench(engine: &EngineArgs, runs: usize) -> Result<()> {
    if runs == 0 {
        bail!("--runs must be at least 1");
    }

    let base = engine.config();
    let mut strategies = vec![Strategy::Sequential];
    if !engine.sequential {
        strategies.push(base.strategy);
    }
    strategies.dedup();

    println!("Benchmarking primes up to {} ({} runs each)", engine.limit, runs);
    println!(
        "\n{:<16} {:>12} {:>12} {:>12} {:>12}",
        "Strategy", "Avg(ms)", "Min(ms)", "Max(ms)", "Std(ms)"
    );

    let mut reference: Option<SieveResult> = None;
    for strategy in strategies {
        let config = base.clone().with_strategy(strategy);
        let mut samples = Vec::with_capacity(runs);

        for run in 0..runs {
            let start = Instant::now();
            let result = sieve(engine.limit, &config).context("sieve failed")?;
            samples.push(start.elapsed().as_secs_f64() * 1000.0);

            match &reference {
                None => reference = Some(result),
                Some(expected) if expected.count != result.count || expected.tail != result.tail => {
                    bail!(
                        "{} run {} disagrees: {} primes {:?}, expected {} primes {:?}",
                        strategy,
                        run,
                        result.count,
                        result.tail,
                        expected.count,
                        expected.tail
                    );
                }
                Some(_) => {}
            }
        }

        let stats = Stats::from_samples(&samples);
        println!(
            "{:<16} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            strategy.to_string(),
            stats.avg,
            stats.min,
            stats.max,
            stats.std
        );
    }

    if let Some(result) = &reference {
        println!();
        print_result(result);
    }
    Ok(())
}

fn print_result(result: &SieveResult) {
    println!("\nTotal: {} primes found", result.count);
    let tail: Vec<String> = result.tail.iter().map(|p| p.to_string()).collect();
    println!("Last {}: {}", result.tail.len(), tail.join(" "));
}

fn print_duration(label: &str, duration: Duration) {
    let duration_us = duration.as_micros();
    println!(
        "{}: {}us ({:.2}ms)",
        label,
        duration_us,
        duration_us as f64 / 1000.0
    );
}

fn rate_millions_per_sec(limit: u64, duration: Duration) -> Option<f64> {
    let secs = duration.as_secs_f64();
    (secs > 0.0).then(|| limit as f64 / secs / 1e6)
}

/// Summary of one strategy's timings, population standard deviation.
#[derive(Debug, PartialEq)]
struct Stats {
    avg: f64,
    min: f64,
    max: f64,
    std: f64,
}

impl Stats {
    fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len() as f64;
        let avg = samples.iter().sum::<f64>() / n;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = samples.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / n;
        Stats {
            avg,
            min,
            max,
            std: variance.sqrt(),
        }
    }
}
