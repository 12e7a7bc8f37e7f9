//! vqpcr - vaginal microbiome qPCR panel CLI
//!
//! Converts instrument exports into panel abundances, ranks them against a
//! reference population and maintains that population.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vaginal_qpcr::data::{format_tier, ReferencePopulation};
use vaginal_qpcr::error::Result;
use vaginal_qpcr::normalize::DetectionGate;
use vaginal_qpcr::pipeline::{update_reference, Analysis, AnalysisConfig};
use vaginal_qpcr::rank::RankStrategy;
use vaginal_qpcr::summarize::{bucket_labels, ReferenceSummary, DEFAULT_EDGES};

/// CLI-friendly ranking strategy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStrategy {
    /// Clamped percentile within the reference population
    Percentile,
    /// Comparison with the reference mean and a fixed high cutoff
    MeanThreshold,
}

impl From<CliStrategy> for RankStrategy {
    fn from(strategy: CliStrategy) -> Self {
        match strategy {
            CliStrategy::Percentile => RankStrategy::Percentile,
            CliStrategy::MeanThreshold => RankStrategy::MeanThreshold,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

/// Vaginal microbiome qPCR panel analysis
#[derive(Parser)]
#[command(name = "vqpcr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute abundances, tiers and community types for a batch
    Analyze {
        /// Instrument export (CSV, or TSV for .tsv/.txt)
        #[arg(short, long)]
        input: PathBuf,

        /// Reference population CSV
        #[arg(short, long)]
        reference: PathBuf,

        /// Directory for the output tables
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Ranking strategy (overrides the config file)
        #[arg(short, long, value_enum)]
        strategy: Option<CliStrategy>,

        /// Keep undetermined and low-melt readings instead of zeroing them
        #[arg(long)]
        no_detection_gate: bool,

        /// Analysis configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Append a batch to the reference population
    UpdateReference {
        /// Instrument export (CSV, or TSV for .tsv/.txt)
        #[arg(short, long)]
        input: PathBuf,

        /// Reference population CSV, created if missing
        #[arg(short, long)]
        reference: PathBuf,

        /// Keep undetermined and low-melt readings instead of zeroing them
        #[arg(long)]
        no_detection_gate: bool,

        /// Analysis configuration YAML; its detection gate is applied
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Describe the distribution of the reference population
    Summarize {
        /// Reference population CSV
        #[arg(short, long)]
        reference: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: SummaryFormat,
    },

    /// Write an example analysis configuration
    ExampleConfig {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "vqpcr.yaml")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            reference,
            output_dir,
            strategy,
            no_detection_gate,
            config,
        } => cmd_analyze(
            &input,
            &reference,
            output_dir,
            strategy,
            no_detection_gate,
            config.as_ref(),
        ),

        Commands::UpdateReference {
            input,
            reference,
            no_detection_gate,
            config,
        } => cmd_update_reference(&input, &reference, no_detection_gate, config.as_ref()),

        Commands::Summarize { reference, format } => cmd_summarize(&reference, format),

        Commands::ExampleConfig { output } => cmd_example_config(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    match config_path {
        Some(path) => {
            eprintln!("Loading configuration from {:?}...", path);
            AnalysisConfig::from_file(path)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn cmd_analyze(
    input: &PathBuf,
    reference: &PathBuf,
    output_dir: Option<PathBuf>,
    strategy: Option<CliStrategy>,
    no_detection_gate: bool,
    config_path: Option<&PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if let Some(strategy) = strategy {
        config.strategy = strategy.into();
    }
    if no_detection_gate {
        config.detection_gate = DetectionGate::disabled();
    }

    let output_dir = config.output_dir.clone();
    let report = Analysis::new(config).run_files(input, reference)?;

    eprintln!(
        "Done! {} samples written to {:?}",
        report.evaluations.len(),
        output_dir
    );
    for record in report.evaluations.iter() {
        eprintln!(
            "  {:<16} {:<20} group {}  beneficial {}  harmful {}",
            record.sample_id,
            record.community_type.label(),
            record.spray_group,
            format_tier(record.beneficial.tier),
            format_tier(record.harmful.tier),
        );
    }

    Ok(())
}

fn cmd_update_reference(
    input: &PathBuf,
    reference: &PathBuf,
    no_detection_gate: bool,
    config_path: Option<&PathBuf>,
) -> Result<()> {
    let gate = if no_detection_gate {
        DetectionGate::disabled()
    } else {
        load_config(config_path)?.detection_gate
    };

    let update = update_reference(input, reference, &gate)?;

    eprintln!(
        "Added {} samples ({} already present), reference now holds {}",
        update.added.len(),
        update.already_present.len(),
        update.n_samples
    );
    Ok(())
}

fn cmd_summarize(reference_path: &PathBuf, format: SummaryFormat) -> Result<()> {
    eprintln!("Loading reference population...");
    let reference = ReferencePopulation::from_csv(reference_path)?;
    let summary = ReferenceSummary::from_reference(&reference)?;

    match format {
        SummaryFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        SummaryFormat::Text => {
            println!("Reference population: {} samples", summary.n_samples);
            println!();
            print!("{:<20} {:>8}", "metric", "mean");
            for label in bucket_labels(&DEFAULT_EDGES) {
                print!(" {:>8}", label);
            }
            println!();
            for metric in &summary.metrics {
                let mean = metric
                    .mean
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "None".to_string());
                print!("{:<20} {:>8}", metric.metric, mean);
                for p in &metric.percentages {
                    print!(" {:>7.1}%", p);
                }
                println!();
            }
        }
    }

    Ok(())
}

fn cmd_example_config(output_path: &PathBuf) -> Result<()> {
    let config = AnalysisConfig {
        name: "example-batch".to_string(),
        description: Some(
            "Mean-threshold ranking with abundance-driven community typing".to_string(),
        ),
        ..AnalysisConfig::default()
    };
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
