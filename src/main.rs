use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser as ClapParser;
use clap::Subcommand;
use hanlu::analyzer::Analyzer;
use hanlu::config::EngineConfig;
use hanlu::environment::StaticEnvironment;
use hanlu::expression::ExpressionInterpreter;
use hanlu::job::JobDefinition;
use hanlu::registry::InstanceRegistry;
use hanlu::task::LineageTask;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(clap::Parser)]
#[command(name = "hanlu")]
#[command(about = "Table-level lineage extractor for scheduler jobs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract lineage from one or more job definition files.
    Analyze(AnalyzeCommand),
    /// Print a file with its date macros expanded at the current time.
    Expand(ExpandCommand),
}

#[derive(clap::Args)]
struct AnalyzeCommand {
    /// Path to the engine configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Path to a job definition JSON file or a directory of them.
    #[arg(value_name = "JOB_[FILE|DIR]")]
    jobs: PathBuf,
    /// Pretty-print the output lineage.
    #[arg(long)]
    pretty: bool,
    /// Analyze jobs on all available cores.
    #[arg(long)]
    parallel: bool,
}

#[derive(clap::Args)]
struct ExpandCommand {
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// A job file holds one task definition or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum JobFile {
    Many(Vec<JobDefinition>),
    One(JobDefinition),
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutLineage {
    Ok { lineage: LineageTask },
    ErrLineage { error: String },
}

type LabeledJob = (String, Result<JobDefinition, String>);

fn read_jobs(job_file_path: &Path) -> anyhow::Result<Vec<LabeledJob>> {
    let content = std::fs::read_to_string(job_file_path).map_err(|_| {
        anyhow!(
            "Failed to read job file {}",
            job_file_path.display().to_string()
        )
    })?;
    let label = std::path::absolute(job_file_path)?.display().to_string();
    let jobs = match serde_json::from_str::<JobFile>(&content) {
        Ok(JobFile::One(job)) => vec![(label, Ok(job))],
        Ok(JobFile::Many(jobs)) => jobs
            .into_iter()
            .enumerate()
            .map(|(idx, job)| (format!("{}[{}]", label, idx), Ok(job)))
            .collect(),
        Err(err) => vec![(
            label,
            Err(format!(
                "Failed to parse job definitions in file {} due to error: {}",
                job_file_path.display(),
                err
            )),
        )],
    };
    Ok(jobs)
}

fn output_lineage(analyzer: &Analyzer, job: &Result<JobDefinition, String>) -> OutLineage {
    match job {
        Ok(job) => match analyzer.analyze_job(job) {
            Ok(lineage) => OutLineage::Ok { lineage },
            Err(err) => OutLineage::ErrLineage {
                error: format!("Could not extract lineage due to error: {}", err),
            },
        },
        Err(error) => OutLineage::ErrLineage {
            error: error.to_owned(),
        },
    }
}

fn analyze(analyze_command: &AnalyzeCommand) -> anyhow::Result<String> {
    let config = match &analyze_command.config {
        Some(config_path) => EngineConfig::load(config_path)?,
        None => EngineConfig::default(),
    };
    let registry = InstanceRegistry::from_config(&config);
    let environment = StaticEnvironment::from_config(&config, &registry);
    let analyzer = Analyzer::new(&registry)
        .with_environment(&environment)
        .with_settings(config.shell.clone());

    let job_file_or_dir = &analyze_command.jobs;
    let job_files: Vec<PathBuf> = if job_file_or_dir.is_dir() {
        let mut files: Vec<_> = std::fs::read_dir(job_file_or_dir)?
            .filter_map(|res| res.ok())
            .map(|entry| entry.path())
            .filter(|file| file.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        files
    } else {
        vec![job_file_or_dir.clone()]
    };

    let mut jobs = vec![];
    for job_file in &job_files {
        jobs.extend(read_jobs(job_file)?);
    }
    log::debug!("Analyzing {} job(s)", jobs.len());

    let outputs: Vec<OutLineage> = if analyze_command.parallel {
        jobs.par_iter()
            .map(|(_, job)| output_lineage(&analyzer, job))
            .collect()
    } else {
        jobs.iter()
            .map(|(_, job)| output_lineage(&analyzer, job))
            .collect()
    };
    let job_lineages: IndexMap<String, OutLineage> = jobs
        .into_iter()
        .map(|(label, _)| label)
        .zip(outputs)
        .collect();

    let out_str = if analyze_command.pretty {
        serde_json::to_string_pretty(&job_lineages)?
    } else {
        serde_json::to_string(&job_lineages)?
    };
    Ok(out_str)
}

fn main() -> anyhow::Result<()> {
    let now = Instant::now();

    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Analyze(analyze_command) => {
            println!("{}", analyze(analyze_command)?);
        }
        Commands::Expand(expand_command) => {
            let content = std::fs::read_to_string(&expand_command.file).map_err(|_| {
                anyhow!(
                    "Failed to read file {}",
                    expand_command.file.display().to_string()
                )
            })?;
            print!("{}", ExpressionInterpreter::new().expand_all(&content));
        }
    }

    let elapsed = now.elapsed();
    log::info!("Elapsed: {:.2?}", elapsed);

    Ok(())
}
