//! DCOP experiment CLI.
//!
//! Commands:
//! - single: Run one algorithm on one generated instance
//! - compare: Run the full algorithm line-up across graph families
//! - generate: Generate and summarize a constraint graph

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dcop_kernel::AlgorithmKind;

use dcop_experiment::experiment::{ExperimentRunner, ExperimentRunnerConfig};
use dcop_experiment::generator::{GeneratorConfig, GraphFamily, GraphGenerator, GraphKind};

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260826-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(std::path::Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "dcop-experiment")]
#[command(version)]
#[command(about = "Distributed constraint optimization experiments")]
struct Cli {
    /// Base random seed for graphs and agents
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one algorithm on one generated instance
    Single {
        /// Algorithm to run: dsa, mgm, mgm2
        #[arg(long, default_value = "mgm")]
        algorithm: String,

        /// DSA-C move probability
        #[arg(long, default_value = "0.7")]
        probability: f64,

        /// MGM-2 offer probability
        #[arg(long, default_value = "0.5")]
        offer_probability: f64,

        /// Graph family: uniform_sparse, uniform_dense, graph_coloring
        #[arg(long, default_value = "uniform_sparse")]
        family: String,

        /// Number of agents
        #[arg(long, default_value = "30")]
        agents: usize,

        /// Algorithm iterations
        #[arg(long, default_value = "50")]
        iterations: usize,
    },

    /// Run the full comparison across graph families
    Compare {
        /// Number of instances per family
        #[arg(long, default_value = "30")]
        trials: usize,

        /// Number of agents
        #[arg(long, default_value = "30")]
        agents: usize,

        /// Algorithm iterations per run
        #[arg(long, default_value = "50")]
        iterations: usize,

        /// Output file for results
        #[arg(long, default_value = "results.json")]
        output: PathBuf,

        /// Graph families to run (comma-separated). Default: all
        #[arg(long, value_delimiter = ',')]
        families: Option<Vec<String>>,
    },

    /// Generate and summarize a constraint graph
    Generate {
        /// Number of agents
        #[arg(long, default_value = "30")]
        agents: usize,

        /// Domain size
        #[arg(long, default_value = "5")]
        domain: usize,

        /// Constraint density
        #[arg(long, default_value = "0.25")]
        density: f64,

        /// Generate a graph coloring instance instead of uniform costs
        #[arg(long)]
        coloring: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Single {
            algorithm,
            probability,
            offer_probability,
            family,
            agents,
            iterations,
        } => {
            let kind = parse_algorithm(&algorithm, probability, offer_probability)?;
            let family = parse_family(&family)?;

            let gen_config = GeneratorConfig {
                agents,
                seed: Some(cli.seed),
                ..family.config()
            };
            let density = gen_config.density;
            let graph = GraphGenerator::new(gen_config).generate()?;

            let runner = ExperimentRunner::new(ExperimentRunnerConfig { agents, iterations });
            let result = runner.run_single(&graph, kind, family.name(), density, 0, cli.seed)?;

            println!("\n=== Run Result ===");
            println!("Algorithm: {}", result.config.algorithm);
            println!("Family: {}", result.config.family);
            println!(
                "Graph: {} agents, domain size {}, density {}",
                result.config.agents, result.config.domain_size, result.config.density
            );
            println!("Initial cost: {:.2}", result.initial_cost);
            println!("Final cost: {:.2}", result.final_cost);
            println!("Improvement: {:.2}%", result.improvement_pct);

            println!("\nCost per iteration:");
            println!("  {:>4} {:>12}", "Iter", "Cost");
            for (i, cost) in result.cost_history.iter().enumerate() {
                println!("  {:>4} {:>12.2}", i, cost);
            }
        }

        Commands::Compare {
            trials,
            agents,
            iterations,
            output,
            families: family_filter,
        } => {
            let families: Vec<GraphFamily> = match family_filter {
                Some(names) => names
                    .iter()
                    .map(|s| parse_family(s))
                    .collect::<Result<_>>()?,
                None => GraphFamily::all(),
            };

            info!(
                trials = trials,
                agents = agents,
                iterations = iterations,
                "Starting comparison"
            );

            let runner = ExperimentRunner::new(ExperimentRunnerConfig { agents, iterations });
            let results = runner.run_comparison(&families, trials, cli.seed)?;

            let output_path = timestamped_path(&output);
            results.save(&output_path)?;

            println!("\n=== Comparison Complete ===");
            println!("Results saved to: {}", output_path.display());
            println!("\nSummary:");
            let mut keys: Vec<_> = results.summary.keys().collect();
            keys.sort();
            for key in keys {
                let summary = &results.summary[key];
                println!(
                    "  {}: avg initial={:.2}, avg final={:.2}, improvement={:.1}%",
                    key,
                    summary.avg_initial_cost,
                    summary.avg_final_cost,
                    summary.avg_improvement_pct
                );
            }
        }

        Commands::Generate {
            agents,
            domain,
            density,
            coloring,
        } => {
            let config = GeneratorConfig {
                agents,
                domain_size: domain,
                density,
                kind: if coloring {
                    GraphKind::GraphColoring
                } else {
                    GraphKind::UniformRandom
                },
                seed: Some(cli.seed),
                ..GeneratorConfig::default()
            };

            let graph = GraphGenerator::new(config).generate()?;
            let edges = graph.edges().count();
            let possible = agents * agents.saturating_sub(1) / 2;

            println!("Agents: {}", graph.agent_count());
            println!("Domain size: {}", domain);
            println!(
                "Edges: {} of {} possible (requested density {})",
                edges, possible, density
            );
            for (i, j) in graph.edges().take(10) {
                println!("  {} -- {} (cost at (0,0): {:.2})", i, j, graph.cost(i, 0, j, 0));
            }
            if edges > 10 {
                println!("  ... and {} more", edges - 10);
            }
        }
    }

    Ok(())
}

fn parse_algorithm(s: &str, probability: f64, offer_probability: f64) -> Result<AlgorithmKind> {
    let kind = match s.to_lowercase().as_str() {
        "dsa" | "dsa-c" | "dsac" => AlgorithmKind::DsaC { probability },
        "mgm" => AlgorithmKind::Mgm,
        "mgm2" | "mgm-2" => AlgorithmKind::Mgm2 { offer_probability },
        _ => anyhow::bail!("Unknown algorithm: {}. Valid: dsa, mgm, mgm2", s),
    };
    kind.validate()?;
    Ok(kind)
}

fn parse_family(s: &str) -> Result<GraphFamily> {
    match s.to_lowercase().as_str() {
        "uniform_sparse" | "sparse" => Ok(GraphFamily::UniformSparse),
        "uniform_dense" | "dense" => Ok(GraphFamily::UniformDense),
        "graph_coloring" | "coloring" => Ok(GraphFamily::Coloring),
        _ => anyhow::bail!(
            "Unknown graph family: {}. Valid: uniform_sparse, uniform_dense, graph_coloring",
            s
        ),
    }
}
