//! Command-line entry point.
//!
//! - `train`: train the configured lineup and save its policies
//! - `thunderdome`: pit one agent of each learning kind against each other

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use draft_optimizer::agents::{Agent, AgentSettings};
use draft_optimizer::nn::ObservationEncoder;
use draft_optimizer::pool::{load_history, load_pool, PlayerPool};
use draft_optimizer::settings::{self, Settings};
use draft_optimizer::training::{population_seeds, train_populations, Thunderdome, ThunderdomeReport, Trainer, TrainingSummary};

/// Fantasy draft simulator and reinforcement-learning trainer
#[derive(Parser, Debug)]
#[command(name = "draft-optimizer", version)]
#[command(about = "Train drafting agents and rank them in the Thunderdome", long_about = None)]
struct Cli {
    /// Settings file (overrides DRAFT_OPTIMIZER_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Player pool CSV (overrides data.pool_path)
    #[arg(long, global = true)]
    pool: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the configured lineup
    Train(TrainArgs),
    /// Run a no-learning tournament
    Thunderdome(ThunderdomeArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Training episodes per population
    #[arg(long)]
    episodes: Option<usize>,

    /// Base seed
    #[arg(long)]
    seed: Option<u64>,

    /// Independent populations trained in parallel
    #[arg(long, default_value_t = 1)]
    populations: usize,

    /// Skip saving policies
    #[arg(long, default_value_t = false)]
    no_save: bool,
}

#[derive(Args, Debug)]
struct ThunderdomeArgs {
    /// Drafts to play
    #[arg(long)]
    drafts: Option<usize>,

    /// Seed for agent construction
    #[arg(long)]
    seed: Option<u64>,

    /// Ranked CSV output
    #[arg(long)]
    output: Option<PathBuf>,

    /// Load saved policies from this directory before playing
    #[arg(long)]
    policies: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => settings::load_from_path(path),
        None => settings::load_settings(),
    }
    .context("failed to load settings")?;
    if let Some(pool) = &cli.pool {
        settings.data.pool_path = pool.clone();
    }

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &settings.source {
        Some(path) => info!("settings loaded from {}", path.display()),
        None => info!("using built-in settings"),
    }

    let pool = load_pool(&settings.data.pool_path)
        .with_context(|| format!("failed to load player pool {}", settings.data.pool_path.display()))?;
    info!(players = pool.len(), "player pool loaded");

    match cli.command {
        Command::Train(args) => train(settings, pool, &args),
        Command::Thunderdome(args) => thunderdome(settings, pool, &args),
    }
}

fn agent_settings(settings: &Settings) -> Result<AgentSettings> {
    let mut agents = settings.agents.clone();
    if let Some(path) = &settings.data.history_path {
        let history = load_history(path).with_context(|| format!("failed to load history {}", path.display()))?;
        info!(drafts = history.len(), "draft history loaded");
        agents = agents.with_history(history);
    }
    Ok(agents)
}

fn train(mut settings: Settings, pool: PlayerPool, args: &TrainArgs) -> Result<()> {
    if let Some(episodes) = args.episodes {
        settings.trainer.episodes = episodes;
    }
    if let Some(seed) = args.seed {
        settings.trainer.seed = seed;
    }
    if args.populations == 0 {
        bail!("--populations must be at least 1");
    }

    let agent_settings = agent_settings(&settings)?;
    let kinds = settings.lineup_kinds();
    let encoder = ObservationEncoder::new(&settings.draft);
    info!(
        lineup = ?kinds,
        episodes = settings.trainer.episodes,
        populations = args.populations,
        "training"
    );

    if args.populations == 1 {
        let agents = agent_settings.build_all(&kinds, &encoder, settings.trainer.seed)?;
        let mut trainer = Trainer::new(settings.draft.clone(), Arc::new(pool), agents, settings.trainer.clone())?;
        let summary = trainer.train()?;
        print_summary(0, &summary);
        if !args.no_save {
            let saved = trainer.save_policies(&settings.data.policy_dir)?;
            info!(files = saved.len(), dir = %settings.data.policy_dir.display(), "policies saved");
        }
        return Ok(());
    }

    let populations = population_seeds(settings.trainer.seed, args.populations)
        .into_iter()
        .map(|seed| agent_settings.build_all(&kinds, &encoder, seed))
        .collect::<Result<Vec<_>, _>>()?;

    let results = train_populations(&settings.draft, &pool, populations, &settings.trainer);
    for (i, result) in results.into_iter().enumerate() {
        let (summary, agents) = result.with_context(|| format!("population {i} failed"))?;
        print_summary(i, &summary);
        if !args.no_save {
            let dir = settings.data.policy_dir.join(format!("population-{i}"));
            save_agents(&agents, &dir)?;
        }
    }
    Ok(())
}

fn save_agents(agents: &[Box<dyn Agent>], dir: &Path) -> Result<()> {
    for agent in agents.iter().filter(|a| a.kind().is_learning()) {
        agent.save_policy()?.save(dir)?;
    }
    info!(dir = %dir.display(), "policies saved");
    Ok(())
}

fn print_summary(population: usize, summary: &TrainingSummary) {
    println!(
        "population {population}: {} episodes completed, {} failed",
        summary.episodes_completed, summary.episodes_failed
    );
    for avg in &summary.averages {
        println!("  {:<14} {:>10.1}", avg.label, avg.score_average);
    }
}

fn thunderdome(mut settings: Settings, pool: PlayerPool, args: &ThunderdomeArgs) -> Result<()> {
    if let Some(drafts) = args.drafts {
        settings.thunderdome.drafts = drafts;
    }
    if let Some(seed) = args.seed {
        settings.thunderdome.seed = seed;
    }
    if let Some(output) = &args.output {
        settings.thunderdome.output_path = Some(output.clone());
    }

    let agent_settings = agent_settings(&settings)?;
    let agents = Thunderdome::standard_lineup(&agent_settings, &settings.draft, settings.thunderdome.seed)?;
    let mut arena = Thunderdome::new(settings.draft.clone(), Arc::new(pool), agents, settings.thunderdome.clone())?;
    if let Some(dir) = &args.policies {
        arena
            .load_policies(dir)
            .with_context(|| format!("failed to load policies from {}", dir.display()))?;
    }

    let report = arena.run().context("thunderdome aborted")?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ThunderdomeReport) {
    println!("{} drafts", report.drafts);
    println!("{:<5} {:<14} {:>12} {:>10} {:>6}", "rank", "agent", "total", "mean", "wins");
    for s in &report.standings {
        println!(
            "{:<5} {:<14} {:>12.1} {:>10.1} {:>6}",
            s.rank, s.label, s.total_score, s.mean_score, s.wins
        );
    }
    if let Some(winner) = report.winner() {
        println!("winner: {}", winner.label);
    }
}
