//! `teambalance`: split a JSON roster into skill-balanced teams.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use u_teambalance::builder::SolveMode;
use u_teambalance::document::{RosterDocument, DEFAULT_SKILL};
use u_teambalance::planner::{PlanOutcome, SolveOptions, TeamPlanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Minimize the largest adjacent skill gap
    Optimize,
    /// Find any assignment within the skill-gap threshold
    Satisfy,
}

#[derive(Debug, Parser)]
#[command(name = "teambalance")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Split a roster into balanced teams")]
struct Cli {
    /// Roster document
    #[arg(default_value = "students.json")]
    roster: PathBuf,

    /// Solve mode (default: satisfy if the roster sets max_skill_gap)
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Skill-gap threshold, overriding the roster's
    #[arg(long)]
    max_skill_gap: Option<i64>,

    /// Skill to balance on
    #[arg(long, default_value = DEFAULT_SKILL)]
    skill: String,

    /// Solver time limit in milliseconds (0 disables it)
    #[arg(long, default_value_t = 60_000)]
    time_limit_ms: i64,

    /// Parallel search workers
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Skip the annealing warm start
    #[arg(long)]
    no_warm_start: bool,

    /// Warm start seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let document = RosterDocument::from_path(&cli.roster)
        .with_context(|| format!("reading {}", cli.roster.display()))?;
    let (roster, mut config) = document.into_parts_with_skill(&cli.skill)?;
    if cli.max_skill_gap.is_some() {
        config.max_skill_gap = cli.max_skill_gap;
    }

    let mode = match cli.mode {
        None => SolveMode::from_config(&config),
        Some(Mode::Optimize) => SolveMode::Optimize,
        Some(Mode::Satisfy) => match config.max_skill_gap {
            Some(max_skill_gap) => SolveMode::Satisfy { max_skill_gap },
            None => bail!("--mode satisfy needs --max-skill-gap or a roster max_skill_gap"),
        },
    };

    let mut options = SolveOptions::default()
        .with_time_limit_ms(cli.time_limit_ms)
        .with_num_workers(cli.workers)
        .with_warm_start(!cli.no_warm_start);
    if let Some(seed) = cli.seed {
        options = options.with_seed(seed);
    }

    match TeamPlanner::new(options).plan(&roster, &config, mode)? {
        PlanOutcome::Solved(assignment) => {
            if !assignment.proven_optimal && mode == SolveMode::Optimize {
                tracing::warn!("time limit reached; gap may not be minimal");
            }
            let json = assignment.to_json_pretty()?;
            match assignment.gap {
                Some(gap) => {
                    println!("Teams: {json}");
                    println!("Max skill gap: {gap}");
                }
                None => println!("{json}"),
            }
        }
        PlanOutcome::Unsatisfiable => println!("No solution!"),
        PlanOutcome::Interrupted => bail!("search stopped before any assignment was found"),
    }

    Ok(())
}
