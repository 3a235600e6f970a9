mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use negotiation::coordinator::TournamentSummary;
use negotiation::{Coordinator, NegotiationReport, Scenario, Tournament};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Negotiate every pair of agents separately
    Pairs,
    /// The lowest-identity agent negotiates with all others at once
    FanOut,
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Item and criterion set to negotiate over (cars, presidential)
    #[arg(long, default_value = "cars")]
    scenario: String,

    /// Number of agents, each with random preferences
    #[arg(long, default_value_t = 2)]
    agents: usize,

    #[arg(long, value_enum, default_value_t = Mode::Pairs)]
    mode: Mode,

    /// Random seed (overrides NEGOTIATION_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Round budget per negotiation (overrides NEGOTIATION_MAX_ROUNDS)
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every message exchanged
    #[arg(long, default_value_t = false)]
    transcript: bool,

    /// Emit JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = max_rounds;
    }
    config.validate()?;

    let Some(scenario) = Scenario::by_name(&args.scenario) else {
        bail!(
            "unknown scenario {:?} (expected one of {:?})",
            args.scenario,
            Scenario::NAMES
        );
    };
    if args.agents < 2 {
        bail!("need at least two agents, got {}", args.agents);
    }

    info!(
        scenario = %scenario.name,
        agents = args.agents,
        mode = ?args.mode,
        seed = ?config.seed,
        max_rounds = config.max_rounds,
        "Negotiator starting"
    );

    let mut rng = config.rng();
    let participants = scenario
        .random_participants(args.agents, &mut rng)
        .context("generating preferences")?;

    match args.mode {
        Mode::Pairs => {
            let tournament = Tournament::new(participants, config);
            let mut reports = Vec::new();
            let summary = tournament
                .run_with(|report| {
                    if !args.json {
                        print_report(report, args.transcript);
                    }
                    reports.push(report.clone());
                })
                .context("running pairwise negotiations")?;

            if args.json {
                let output = serde_json::json!({ "reports": reports, "summary": summary });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_summary(&summary);
            }
        }
        Mode::FanOut => {
            let report = Coordinator::with_rng(participants, &config, &mut rng)
                .context("setting up negotiation")?
                .run(config.max_rounds)
                .context("running negotiation")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, args.transcript);
            }
        }
    }

    Ok(())
}

fn print_report(report: &NegotiationReport, transcript: bool) {
    let participants: Vec<&str> = report.agents.iter().map(|agent| agent.id.as_str()).collect();
    println!("\n{}: {}", participants.join(" vs "), report.summary_line());
    if transcript {
        for message in &report.transcript {
            println!("  {message}");
        }
    }
    if let negotiation::NegotiationOutcome::Agreement { justification, .. } = &report.outcome {
        for premise in justification {
            println!("  because {premise}");
        }
    }
}

fn print_summary(summary: &TournamentSummary) {
    println!(
        "\n{} pairs, {} converged, {} unresolved",
        summary.pairs(),
        summary.results.len(),
        summary.unresolved.len()
    );
    for (item, wins) in summary.wins_by_item() {
        println!("  {item}: chosen {wins} times");
    }
    for (agent, wins) in summary.wins_by_agent() {
        println!("  {agent}: won {wins} times");
    }
}
