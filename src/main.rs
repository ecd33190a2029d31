/*!
 * keyhunt command line
 *
 * Runs search sessions against an external oracle program and inspects the
 * candidate stages. Logs go to stderr and are controlled by `RUST_LOG`.
 */

mod cli;

use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Args, Mode};
use keyhunt::pipeline::build_source;
use keyhunt::progress::format_number;
use keyhunt::{
    pin, CandidateSource, CommandOracle, Engine, Oracle, Outcome, SearchConfig, SearchEvent,
    SetOracle, StageKind,
};

const DEFAULT_GENERATIVE_LIMIT: usize = 20;

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SearchConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SearchConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.max_workers = threads.max(1);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build_global()
            .ok();
    }

    match args.mode {
        Mode::Pins { verify } => run_pins(verify),
        Mode::Candidates {
            stage,
            target,
            hw,
            limit,
        } => print_candidates(stage, &target, hw.as_deref(), limit, &config),
        Mode::Run {
            target,
            hw,
            timeout,
            dictionary,
            stages,
            oracle,
            oracle_args,
            oracle_timeout,
            accept,
            json,
        } => {
            if dictionary.is_some() {
                config.dictionary = dictionary;
            }
            if !stages.is_empty() {
                config.stages = stages;
            }

            let oracle: Arc<dyn Oracle> = match oracle {
                Some(program) => Arc::new(CommandOracle::new(
                    program,
                    oracle_args,
                    Duration::from_secs(oracle_timeout),
                )),
                None => Arc::new(SetOracle::new(accept)),
            };
            let deadline = timeout.map(|secs| Instant::now() + Duration::from_secs(secs));

            let found = run_search(config, oracle, &target, hw.as_deref(), deadline, json)?;
            if !found {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn run_pins(verify: Option<String>) -> Result<()> {
    if let Some(candidate) = verify {
        if pin::is_valid_pin(&candidate) {
            println!("{} {} is a valid checksum PIN", "✅".green(), candidate);
            return Ok(());
        }
        println!("{} {} is not a valid checksum PIN", "❌".red(), candidate);
        std::process::exit(1);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for candidate in pin::generate_pins() {
        writeln!(out, "{}", candidate)?;
    }
    out.flush()?;
    Ok(())
}

fn print_candidates(
    stage: StageKind,
    target: &str,
    hw: Option<&str>,
    limit: Option<usize>,
    config: &SearchConfig,
) -> Result<()> {
    let source = build_source(stage, target, hw, config)
        .with_context(|| format!("Failed to build stage {}", stage))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match source {
        CandidateSource::Materialized(items) => {
            for candidate in items.iter().take(limit.unwrap_or(usize::MAX)) {
                writeln!(out, "{}", candidate)?;
            }
        }
        CandidateSource::Generative(generator) => {
            let limit = limit.unwrap_or(DEFAULT_GENERATIVE_LIMIT);
            for candidate in std::iter::from_fn(|| generator.next_candidate()).take(limit) {
                writeln!(out, "{}", candidate)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn run_search(
    config: SearchConfig,
    oracle: Arc<dyn Oracle>,
    target: &str,
    hw: Option<&str>,
    deadline: Option<Instant>,
    json: bool,
) -> Result<bool> {
    let stages = config.stages.len();
    let engine = Engine::new(config, oracle);

    if !json {
        println!("{}", "🚀 Starting candidate search".cyan().bold());
        println!("📝 Target: {}", target);
        if let Some(hw) = hw {
            println!("🔗 Hardware address: {}", hw);
        }
        println!("🧵 Up to {} workers per stage, {} stages\n", engine.config().max_workers, stages);
    }

    let handle = engine
        .start(target, hw, deadline)
        .context("Failed to start search session")?;

    let pb = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    for event in handle.events().iter() {
        match event {
            SearchEvent::StageStarted {
                stage,
                workers,
                candidates,
            } => {
                let size = candidates
                    .map(format_number)
                    .unwrap_or_else(|| "unbounded".to_string());
                pb.println(format!(
                    "{} {} ({} candidates, {} workers)",
                    "▶".cyan(),
                    stage.bold(),
                    size,
                    workers
                ));
                pb.set_message(format!("stage {}", stage));
            }
            SearchEvent::StageFinished {
                stage,
                attempts,
                abandoned,
            } => {
                debug!(%stage, attempts, abandoned, "stage done");
                if abandoned > 0 {
                    pb.println(format!(
                        "{} {} abandoned {} stalled workers",
                        "⚠️ ".yellow(),
                        stage,
                        abandoned
                    ));
                }
            }
            SearchEvent::Progress(snapshot) => pb.set_message(snapshot.to_string()),
            SearchEvent::Finished(_) => break,
        }
    }
    pb.finish_and_clear();

    let snapshot = handle.snapshot();
    let outcome = handle.wait();

    if json {
        let report = serde_json::json!({
            "target": target,
            "result": outcome,
            "progress": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(outcome.is_found());
    }

    println!("\n📊 Statistics:");
    println!("   Total attempts: {}", format_number(snapshot.attempts));
    println!("   Time elapsed: {:.2}s", snapshot.elapsed_secs);
    println!("   Average rate: {:.0} candidates/second\n", snapshot.rate);

    match &outcome {
        Outcome::Found { candidate, stage } => {
            println!(
                "{}",
                format!("✅ Found: {} (stage {})", candidate, stage).green().bold()
            );
        }
        Outcome::NotFound => println!("{}", "❌ Not found: every stage exhausted".red()),
        Outcome::Cancelled => println!("{}", "⚠️  Cancelled".yellow()),
        Outcome::TimedOut => println!("{}", "⏱️  Deadline exceeded".yellow()),
    }
    Ok(outcome.is_found())
}
