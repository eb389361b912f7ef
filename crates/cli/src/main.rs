use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::fmt::SubscriberBuilder;
use treepack::configuration::DEFAULT_GRID_SPACING;
use treepack::energy::DEFAULT_PENALTY_WEIGHT;
use treepack::prelude::*;

mod external;
mod groups;
mod provenance;
mod store;

use external::ExternalOptimizer;
use groups::parse_groups;
use provenance::{write_sidecar, Payload};

#[derive(Parser)]
#[command(name = "treepack")]
#[command(about = "Pack N trees into the smallest square, per group size")]
struct Cmd {
    /// Optional run label; propagated to logs and provenance
    #[arg(long, global = true)]
    tag: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Anneal groups in parallel and merge improvements into the store
    Optimize(OptimizeArgs),
    /// Drive an external optimizer binary group by group
    External(ExternalArgs),
    /// Print total score, worst groups, missing and overlapping groups
    Score {
        #[arg(long)]
        store: PathBuf,
        #[arg(long, default_value_t = 20)]
        worst: usize,
    },
    /// Print a small provenance JSON block
    Report,
}

#[derive(Args)]
struct OptimizeArgs {
    #[arg(long)]
    store: PathBuf,
    /// `all`, `7`, `1-10`, or a comma list of those
    #[arg(long, default_value = "all")]
    groups: String,
    #[arg(long, default_value_t = 1000)]
    iterations: usize,
    #[arg(long, default_value_t = 4)]
    restarts: usize,
    #[arg(long, default_value_t = 1.0)]
    t0: f64,
    #[arg(long, default_value_t = 0.99)]
    cooling: f64,
    #[arg(long, default_value_t = DEFAULT_PENALTY_WEIGHT)]
    penalty: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Seed placements from this store (e.g. an initializer's output) instead of `--store`
    #[arg(long)]
    init: Option<PathBuf>,
    /// Grid spacing for groups absent from the seed store
    #[arg(long, default_value_t = DEFAULT_GRID_SPACING)]
    spacing: f64,
    /// Merge into this store instead of `--store`
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ExternalArgs {
    #[arg(long)]
    binary: PathBuf,
    /// Extra leading argument for the binary (repeatable)
    #[arg(long = "binary-arg")]
    binary_args: Vec<String>,
    #[arg(long)]
    store: PathBuf,
    #[arg(long, default_value = "1-50")]
    groups: String,
    #[arg(long, default_value_t = 10_000)]
    iterations: usize,
    #[arg(long, default_value_t = 16)]
    restarts: usize,
    #[arg(long, default_value_t = 1)]
    passes: usize,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Optimize(args) => optimize(args, cmd.tag),
        Action::External(args) => external(args, cmd.tag),
        Action::Score { store, worst } => score_store(&store, worst),
        Action::Report => report(cmd.tag),
    }
}

/// Overlap-free and better than what the target store already holds.
fn worth_writing(candidate: &Configuration, existing: Option<&Configuration>) -> bool {
    total_overlap(candidate) == 0.0 && existing.map_or(true, |e| score(candidate) < score(e))
}

fn optimize(args: OptimizeArgs, tag: Option<String>) -> Result<()> {
    let shape = Arc::new(BaseShape::tree());
    let groups = parse_groups(&args.groups)?;
    if !(args.penalty.is_finite() && args.penalty > 0.0) {
        bail!("penalty weight must be positive, got {}", args.penalty);
    }
    let cfg = AnnealCfg {
        start_temperature: args.t0,
        cooling_rate: args.cooling,
        energy: EnergyCfg {
            penalty_weight: args.penalty,
        },
        seed: args.seed,
        ..AnnealCfg::default()
    };
    cfg.validate()?;
    let out = args.out.clone().unwrap_or_else(|| args.store.clone());
    let seed_path = args.init.as_deref().unwrap_or(&args.store);
    tracing::info!(
        groups = groups.len(),
        iterations = args.iterations,
        restarts = args.restarts,
        seeds = %seed_path.display(),
        out = %out.display(),
        tag = ?tag,
        "optimize"
    );

    let seeds = store::load(seed_path, &shape)?;
    // With `--init`, groups it lacks fall back to `--store`.
    let fallback = match args.init {
        Some(_) => store::load(&args.store, &shape)?,
        None => store::StoreContents::default(),
    };
    let starts = groups
        .iter()
        .map(|&n| match seeds.groups.get(&n).or_else(|| fallback.groups.get(&n)) {
            Some(c) => Ok(c.clone()),
            None => {
                if let Some(e) = seeds.errors.get(&n) {
                    tracing::warn!(group = n, error = %e, "seeding from grid");
                }
                Configuration::grid(Arc::clone(&shape), n, args.spacing)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let params = TaskParams {
        iterations: args.iterations,
        restarts: args.restarts,
    };
    let t0 = Instant::now();
    // One worker owns one configuration; results come back to this thread.
    let outcomes: Vec<(usize, Result<TaskOutcome, TaskError>)> = starts
        .into_par_iter()
        .map(|config| {
            let group = config.len();
            let mut task = AnnealTask::new(cfg);
            (group, task.run(config, &params))
        })
        .collect();

    let target = store::load(&out, &shape)?;
    let mut writes = Vec::new();
    let mut failed = 0usize;
    for (group, outcome) in outcomes {
        match outcome {
            Ok(o) => {
                let existing = target.groups.get(&group);
                if worth_writing(&o.configuration, existing) {
                    tracing::info!(
                        group,
                        score = score(&o.configuration),
                        previous = ?existing.map(score),
                        "improved"
                    );
                    writes.push(o.configuration);
                } else {
                    tracing::info!(group, "no improvement");
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!(group, error = %e, "group failed");
            }
        }
    }
    tracing::info!(
        written = writes.len(),
        failed,
        elapsed_s = t0.elapsed().as_secs_f64(),
        "optimize finished"
    );

    if !writes.is_empty() {
        store::save(&out, &writes)?;
        let mut payload = Payload::new(
            serde_json::json!({
                "command": "optimize",
                "seed_store": seed_path.to_string_lossy(),
                "iterations": args.iterations,
                "restarts": args.restarts,
                "t0": args.t0,
                "cooling": args.cooling,
                "penalty": args.penalty,
                "seed": args.seed,
                "spacing": args.spacing,
            }),
            tag,
        );
        payload.groups = writes.iter().map(Configuration::len).collect();
        write_sidecar(&out, payload)?;
    }
    if failed > 0 {
        bail!("{failed} group(s) failed");
    }
    Ok(())
}

fn external(args: ExternalArgs, tag: Option<String>) -> Result<()> {
    let shape = Arc::new(BaseShape::tree());
    let groups = parse_groups(&args.groups)?;
    let mut task = ExternalOptimizer::new(&args.binary).with_leading_args(&args.binary_args);
    let mut ctx = RunContext::new(TaskParams {
        iterations: args.iterations,
        restarts: args.restarts,
    });
    tracing::info!(
        binary = %args.binary.display(),
        groups = groups.len(),
        passes = args.passes,
        tag = ?tag,
        "external"
    );

    let mut improved = Vec::new();
    for pass in 1..=args.passes {
        tracing::info!(pass, "pass start");
        for &group in &groups {
            // Re-read so each group starts from the latest store.
            let contents = store::load(&args.store, &shape)?;
            let start = match contents.groups.get(&group) {
                Some(c) => c.clone(),
                None => {
                    if let Some(e) = contents.errors.get(&group) {
                        tracing::warn!(group, error = %e, "seeding from grid");
                    }
                    Configuration::grid(Arc::clone(&shape), group, DEFAULT_GRID_SPACING)?
                }
            };
            let t0 = Instant::now();
            match ctx.run_task(&mut task, start) {
                Ok(o) if o.diagnostics.improved => {
                    store::save(&args.store, std::slice::from_ref(&o.configuration))?;
                    tracing::info!(
                        group,
                        score = score(&o.configuration),
                        elapsed_s = t0.elapsed().as_secs_f64(),
                        "improved"
                    );
                    improved.push(group);
                }
                Ok(_) => tracing::info!(
                    group,
                    stagnation = ctx.stagnation(group),
                    elapsed_s = t0.elapsed().as_secs_f64(),
                    "no improvement"
                ),
                Err(e) => tracing::error!(group, error = %e, "optimizer failed"),
            }
        }
    }

    if !improved.is_empty() {
        improved.sort_unstable();
        improved.dedup();
        let mut payload = Payload::new(
            serde_json::json!({
                "command": "external",
                "binary": args.binary.to_string_lossy(),
                "iterations": args.iterations,
                "restarts": args.restarts,
                "passes": args.passes,
            }),
            tag,
        );
        payload.groups = improved;
        write_sidecar(&args.store, payload)?;
    }
    Ok(())
}

fn score_store(path: &Path, worst: usize) -> Result<()> {
    let shape = Arc::new(BaseShape::tree());
    let contents = store::load(path, &shape)?;
    let mut board = ScoreBoard::new();
    for config in contents.groups.values() {
        board.insert(config);
    }

    println!("total score: {:.6} ({} groups)", board.total(), board.len());
    println!("worst {worst}:");
    for g in board.worst(worst) {
        let flag = if g.overlapping_pairs > 0 { "  OVERLAP" } else { "" };
        println!("  N={:>3}  score={:.6}  side={:.6}{flag}", g.group, g.score, g.side);
    }
    let missing = board.missing();
    if !missing.is_empty() {
        println!("missing groups ({}): {:?}", missing.len(), missing);
    }
    let overlapping = board.overlapping();
    if !overlapping.is_empty() {
        println!("overlapping groups: {overlapping:?}");
    }
    for (group, e) in &contents.errors {
        println!("unreadable N={group}: {e}");
    }
    if !contents.unattributed.is_empty() {
        println!("rows without a group: {}", contents.unattributed.len());
    }
    Ok(())
}

fn report(tag: Option<String>) -> Result<()> {
    let obj = serde_json::json!({
        "code_rev": provenance::current_git_rev(),
        "tool_version": treepack::VERSION,
        "tag": tag,
        "params": {},
        "outputs": []
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
