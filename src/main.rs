//! foodcluster: cluster foods by macronutrients and name the clusters after
//! reference food groups.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foodcluster::{Algorithm, FeatureTable, Pipeline, PipelineConfig, Taxonomy};
use tracing_subscriber::{fmt, EnvFilter};

/// Nutrition-based food clustering with food-group label reconciliation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the target cluster count
    #[arg(short = 'k', long, global = true)]
    clusters: Option<usize>,

    /// Override the output directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster the dataset and write labeled and food-group tables
    Label {
        /// Algorithms to run (repeatable)
        #[arg(short, long = "algorithm", default_value = "kmeans", conflicts_with = "all")]
        algorithms: Vec<String>,

        /// Run every algorithm
        #[arg(long)]
        all: bool,
    },
    /// Score the configured algorithms against the labeled dataset
    Evaluate,
    /// Write per-cluster nutrient and keyword profiles
    Profile {
        /// Algorithm to profile
        #[arg(short, long, default_value = "kmeans")]
        algorithm: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let pipeline = build_pipeline(&cli)?;

    match &cli.command {
        Command::Label { algorithms, all } => run_label(&pipeline, algorithms, *all),
        Command::Evaluate => run_evaluate(&pipeline),
        Command::Profile { algorithm } => run_profile(&pipeline, algorithm),
    }
}

fn build_pipeline(cli: &Cli) -> Result<Pipeline> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(k) = cli.clusters {
        config.clustering.n_clusters = k;
    }
    if let Some(dir) = &cli.output_dir {
        config.data.output_dir = dir.clone();
    }
    Pipeline::new(config).context("invalid configuration")
}

fn load_inputs(pipeline: &Pipeline) -> Result<(FeatureTable, Taxonomy)> {
    let data = &pipeline.config().data;
    let features = pipeline
        .load_features()
        .with_context(|| format!("reading dataset {}", data.dataset.display()))?;
    let taxonomy = pipeline
        .load_taxonomy()
        .with_context(|| format!("reading taxonomy {}", data.taxonomy.display()))?;
    Ok((features, taxonomy))
}

fn run_label(pipeline: &Pipeline, selectors: &[String], all: bool) -> Result<()> {
    let (features, taxonomy) = load_inputs(pipeline)?;
    println!(
        "Loaded {} foods ({} dropped), {} reference groups",
        features.len(),
        features.dropped(),
        taxonomy.len()
    );

    let selectors: Vec<String> = if all {
        Algorithm::ALL.iter().map(|a| a.name().to_string()).collect()
    } else {
        selectors.to_vec()
    };

    for selector in &selectors {
        let labeling = pipeline
            .label_selector(&features, &taxonomy, selector)
            .with_context(|| format!("labeling with {selector}"))?;
        let paths = pipeline.write_labeling(&labeling)?;

        let assignment = &labeling.assignment;
        println!(
            "{:<18} {:>3} clusters, {:>5} noise, {} unplaced groups",
            labeling.algorithm().name(),
            assignment.n_clusters(),
            assignment.n_noise(),
            labeling.reconciliation.unplaced().len()
        );
        for path in paths {
            println!("  -> {}", path.display());
        }
    }
    Ok(())
}

fn run_evaluate(pipeline: &Pipeline) -> Result<()> {
    let truth = pipeline.load_ground_truth().with_context(|| {
        format!(
            "reading labeled dataset {}",
            pipeline.config().data.labeled_dataset.display()
        )
    })?;
    println!("Loaded {} labeled foods", truth.len());

    let scores = pipeline.evaluate(&truth).context("evaluation failed")?;

    println!(
        "\n{:<18} {:>8} {:>8} {:>8} {:>8}",
        "algorithm", "ARI", "FM", "AMI", "V"
    );
    for s in &scores {
        println!(
            "{:<18} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            s.algorithm.name(),
            s.ari,
            s.fowlkes_mallows,
            s.ami,
            s.v_measure
        );
    }

    let path = pipeline.write_scores(&scores)?;
    println!("\nScores saved to: {}", path.display());
    Ok(())
}

fn run_profile(pipeline: &Pipeline, selector: &str) -> Result<()> {
    let (features, taxonomy) = load_inputs(pipeline)?;
    let labeling = pipeline
        .label_selector(&features, &taxonomy, selector)
        .with_context(|| format!("labeling with {selector}"))?;
    let profiles = pipeline.profile(&labeling);

    for p in &profiles {
        let keywords: Vec<&str> = p.keywords.iter().map(|k| k.word.as_str()).collect();
        println!(
            "cluster {:>3} ({:>4} foods) {}: {}",
            p.cluster,
            p.size,
            p.group_name.replace('\n', " / "),
            keywords.join(", ")
        );
    }

    let path = pipeline.write_profiles(labeling.algorithm(), &profiles)?;
    println!("\nProfiles saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_label_all_conflicts_with_algorithm() {
        let result = Cli::try_parse_from(["foodcluster", "label", "-a", "dbscan", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "foodcluster",
            "-vv",
            "profile",
            "-k",
            "4",
            "-a",
            "spectral",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.clusters, Some(4));
        assert!(matches!(
            cli.command,
            Command::Profile { ref algorithm } if algorithm == "spectral"
        ));
    }
}
