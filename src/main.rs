use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use core_types::{
    Algorithm, AlgorithmChoice, FeatureMatrix, MethodOutcome, Objective, ObjectiveSpec,
    RelationshipFinding, TargetSeries,
};
use engine::{AnalysisEngine, RunOptions};
use optimizer::CancelToken;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The main entry point for the Acumen analysis engine.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut engine = AnalysisEngine::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Detect(args) => handle_detect(&engine, args),
        Commands::Weights(args) => handle_weights(&engine, args),
        Commands::Optimize(args) => handle_optimize(&engine, args),
        Commands::Analyze(args) => handle_analyze(&mut engine, args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Marginal relationship detection and dynamic weight optimization over
/// business metrics.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect marginal relationships on a synthetic demo dataset.
    Detect(DataArgs),
    /// Calculate per-method feature weights.
    Weights(DataArgs),
    /// Optimize a weight vector against an objective.
    Optimize(OptimizeArgs),
    /// Run the full pipeline: detect, weight, optimize, validate, monitor.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct DataArgs {
    /// Number of observations to generate.
    #[arg(long, default_value_t = 120)]
    rows: usize,

    /// Seed for data generation and every stochastic stage.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Emit the raw result as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct OptimizeArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Run a single algorithm instead of all of them.
    #[arg(long, value_enum)]
    algorithm: Option<AlgorithmArg>,

    /// Objective function to maximize.
    #[arg(long, value_enum, default_value_t = ObjectiveArg::RSquared)]
    objective: ObjectiveArg,
}

#[derive(Parser)]
struct AnalyzeArgs {
    #[command(flatten)]
    optimize: OptimizeArgs,

    /// Feed drifted live windows after deployment to demo the monitor.
    #[arg(long)]
    with_drift: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Gradient,
    Genetic,
    Annealing,
    ParticleSwarm,
    Bayesian,
    Constrained,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::Gradient => Algorithm::Gradient,
            AlgorithmArg::Genetic => Algorithm::Genetic,
            AlgorithmArg::Annealing => Algorithm::Annealing,
            AlgorithmArg::ParticleSwarm => Algorithm::ParticleSwarm,
            AlgorithmArg::Bayesian => Algorithm::Bayesian,
            AlgorithmArg::Constrained => Algorithm::Constrained,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectiveArg {
    RSquared,
    NegMse,
    NegMae,
}

impl From<ObjectiveArg> for Objective {
    fn from(value: ObjectiveArg) -> Self {
        match value {
            ObjectiveArg::RSquared => Objective::RSquared,
            ObjectiveArg::NegMse => Objective::NegMse,
            ObjectiveArg::NegMae => Objective::NegMae,
        }
    }
}

// ==============================================================================
// Synthetic Demo Data
// ==============================================================================

/// A seeded business-metrics dataset with planted structure: a marketing
/// driver the revenue follows with a 3-period lag, a support-quality metric
/// with a threshold effect, a seasonal component, and plain noise.
fn demo_dataset(rows: usize, seed: u64, drift_scale: f64, offset: usize) -> anyhow::Result<(FeatureMatrix, TargetSeries)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = rows + offset;

    let marketing: Vec<f64> = (0..n)
        .map(|i| (i as f64 * 0.23).sin() * 40.0 + 100.0 + rng.r#gen::<f64>() * 8.0)
        .collect();
    let support: Vec<f64> = (0..n).map(|_| rng.r#gen::<f64>() * 10.0).collect();
    let season: Vec<f64> = (0..n).map(|i| (i as f64 * 0.52).cos() * 15.0).collect();
    let noise: Vec<f64> = (0..n).map(|_| rng.r#gen::<f64>() * 20.0).collect();

    let revenue: Vec<f64> = (0..n)
        .map(|i| {
            let lagged_marketing = marketing[i.saturating_sub(3)];
            let support_effect = if support[i] > 7.0 { 30.0 } else { 0.0 };
            lagged_marketing * 1.8 + support_effect + season[i] * 0.6 + rng.r#gen::<f64>() * 10.0
        })
        .collect();

    let window = |v: &[f64]| v[offset..].to_vec();
    let features = FeatureMatrix::new(
        vec![
            (
                "marketing_spend".to_string(),
                window(&marketing).into_iter().map(|v| v * drift_scale).collect(),
            ),
            ("support_score".to_string(), window(&support)),
            ("seasonality".to_string(), window(&season)),
            ("unrelated".to_string(), window(&noise)),
        ],
        2,
    )?;
    let target = TargetSeries::new("revenue", window(&revenue))?;
    Ok((features, target))
}

fn run_options(seed: u64) -> RunOptions {
    RunOptions {
        seed,
        ..RunOptions::default()
    }
}

// ==============================================================================
// Command Handlers
// ==============================================================================

fn handle_detect(engine: &AnalysisEngine, args: DataArgs) -> anyhow::Result<()> {
    let (features, target) = demo_dataset(args.rows, args.seed, 1.0, 0)?;
    let findings = engine.detect_relationships(&features, &target, &run_options(args.seed))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Kind",
        "Features",
        "Strength",
        "Significance",
        "Detail",
    ]);
    for finding in &findings {
        let detail = match finding {
            RelationshipFinding::Synergy { joint_r2, .. } => format!("joint R2 {joint_r2:.3}"),
            RelationshipFinding::Threshold { threshold, .. } => {
                format!("threshold at {threshold:.2}")
            }
            RelationshipFinding::Lag { lag, correlation, .. } => {
                format!("lag {lag}, r {correlation:.3}")
            }
            RelationshipFinding::Interaction { degree, .. } => format!("degree {degree}"),
        };
        table.add_row(vec![
            Cell::new(finding.kind_name()),
            Cell::new(finding.feature_key()),
            Cell::new(format!("{:.3}", finding.strength())),
            Cell::new(format!("{:.3}", finding.significance())),
            Cell::new(detail),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn handle_weights(engine: &AnalysisEngine, args: DataArgs) -> anyhow::Result<()> {
    let options = run_options(args.seed);
    let (features, target) = demo_dataset(args.rows, args.seed, 1.0, 0)?;
    let findings = engine.detect_relationships(&features, &target, &options)?;
    let outcome = engine.calculate_weights(&features, &target, &findings, &options)?;

    let mut table = Table::new();
    let mut header = vec!["Feature".to_string()];
    header.extend(outcome.per_method.keys().map(|m| m.to_string()));
    table
        .load_preset(UTF8_FULL)
        .set_header(header.iter().map(Cell::new).collect::<Vec<_>>());
    for name in features.names() {
        let mut row = vec![Cell::new(name)];
        for weights in outcome.per_method.values() {
            row.push(Cell::new(format!("{:.4}", weights.get(name).unwrap_or(0.0))));
        }
        table.add_row(row);
    }
    println!("{table}");

    for skip in &outcome.skipped {
        println!("skipped {}: {}", skip.method, skip.reason);
    }
    Ok(())
}

fn handle_optimize(engine: &AnalysisEngine, args: OptimizeArgs) -> anyhow::Result<()> {
    let options = RunOptions {
        objective: ObjectiveSpec::Single(args.objective.into()),
        algorithm: match args.algorithm {
            Some(a) => AlgorithmChoice::Single(a.into()),
            None => AlgorithmChoice::Comprehensive,
        },
        ..run_options(args.data.seed)
    };
    let (features, target) = demo_dataset(args.data.rows, args.data.seed, 1.0, 0)?;
    let findings = engine.detect_relationships(&features, &target, &options)?;
    let calculated = engine.calculate_weights(&features, &target, &findings, &options)?;
    let initial = calculated.per_method.values().next().cloned();
    let run = engine.optimize_weights(&features, &target, initial, &options, &CancelToken::new())?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Feature", "Weight"]);
    for (name, value) in run.result.weights.iter() {
        table.add_row(vec![Cell::new(name), Cell::new(format!("{value:.4}"))]);
    }
    println!("{table}");
    println!(
        "algorithm: {} | score: {:.4} | iterations: {} | converged: {} | elapsed: {:.2?}",
        run.result.algorithm,
        run.result.score,
        run.result.iterations,
        run.result.converged,
        run.result.elapsed,
    );
    for skip in &run.skipped {
        println!("skipped {}: {}", skip.algorithm, skip.reason);
    }
    Ok(())
}

fn handle_analyze(engine: &mut AnalysisEngine, args: AnalyzeArgs) -> anyhow::Result<()> {
    let seed = args.optimize.data.seed;
    let options = RunOptions {
        objective: ObjectiveSpec::Single(args.optimize.objective.into()),
        algorithm: match args.optimize.algorithm {
            Some(a) => AlgorithmChoice::Single(a.into()),
            None => AlgorithmChoice::Comprehensive,
        },
        deploy: true,
        ..run_options(seed)
    };
    let (features, target) = demo_dataset(args.optimize.data.rows, seed, 1.0, 0)?;
    let outcome = engine.run_analysis(&features, &target, &options, &CancelToken::new())?;

    println!(
        "findings: {} | optimized by {} | score {:.4}",
        outcome.findings.len(),
        outcome.optimization.result.algorithm,
        outcome.optimization.result.score,
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Method", "Outcome", "Issues"]);
    for report in &outcome.validation.methods {
        let summary = match &report.outcome {
            MethodOutcome::Scored { score, mean_objective, spread, low, high } => {
                format!(
                    "score {score:.3} (objective {mean_objective:.3} +/- {spread:.3}, p5 {low:.3}, p95 {high:.3})"
                )
            }
            MethodOutcome::NotApplicable { reason } => format!("n/a: {reason}"),
        };
        table.add_row(vec![
            Cell::new(report.method.to_string()),
            Cell::new(summary),
            Cell::new(report.issues.len().to_string()),
        ]);
    }
    println!("{table}");
    if let Some(aggregate) = outcome.validation.aggregate_score() {
        println!("aggregate robustness: {aggregate:.3}");
    }

    let Some(id) = outcome.weight_id else {
        println!("not deployed: validation produced no applicable baseline");
        return Ok(());
    };
    println!("deployed for monitoring as {id}");

    if args.with_drift {
        // Two live windows with a 10x scale shift on the marketing driver.
        for step in 0..2 {
            let (live_f, live_t) =
                demo_dataset(40, seed + 1 + step, 10.0, args.optimize.data.rows)?;
            let snap = engine.monitor().observe(id, &live_f, &live_t, None)?;
            println!(
                "window {}: drift {:.3} anomalous {} - {}",
                step + 1,
                snap.drift_score,
                snap.is_anomalous,
                snap.explanation,
            );
        }
    }
    Ok(())
}
