//! Rubric grading CLI

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use grading_runner::{
    config::Config,
    documents::{load_submission, load_submissions_from_directory},
    exam::{Exam, EXAM_TEMPLATE},
    reporting::{print_console_report, print_summary, GradingSummary, ReportEnvelope},
};

#[derive(Parser)]
#[command(name = "grade")]
#[command(about = "Grade structured exam submissions against a rubric and answer key")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a single submission
    Grade {
        /// Exam definition (TOML)
        exam: PathBuf,

        /// Submission document (JSON or TOML)
        submission: PathBuf,

        /// Write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the JSON report instead of the console summary
        #[arg(long)]
        json: bool,
    },

    /// Grade every submission in a directory
    Batch {
        /// Exam definition (TOML)
        exam: PathBuf,

        /// Directory of submission documents
        submissions: PathBuf,

        /// Output directory for reports (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an exam definition and its answer key
    Check {
        /// Exam definition (TOML)
        exam: PathBuf,
    },

    /// Write a starter exam definition
    InitExam {
        /// Output path for the exam file
        #[arg(short, long, default_value = "exam.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/grading.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("grading_runner=debug,grade=debug,rubric=debug,info")
    } else {
        EnvFilter::new("grading_runner=info,grade=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Commands::Grade {
            exam,
            submission,
            output,
            json,
        } => {
            grade_one(&config, &exam, &submission, output, json)?;
        }

        Commands::Batch {
            exam,
            submissions,
            output,
        } => {
            grade_batch(&config, &exam, &submissions, output)?;
        }

        Commands::Check { exam } => {
            check_exam(&config, &exam)?;
        }

        Commands::InitExam { output, force } => {
            init_exam(output, force)?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

fn load_exam(config: &Config, path: &Path) -> Result<Exam, Box<dyn std::error::Error>> {
    let exam = Exam::load(path)?.with_config(config)?;
    tracing::info!("Loaded exam {} ({} criteria)", exam.id, exam.rubric.criterion_count());
    Ok(exam)
}

fn grade_one(
    config: &Config,
    exam_path: &Path,
    submission_path: &Path,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let exam = load_exam(config, exam_path)?;
    let submission = load_submission(submission_path)?;

    let report = exam.evaluator().evaluate(&submission.document);
    tracing::info!(
        "Graded {}: {:.1}% ({})",
        submission.id,
        report.overall.pct * 100.0,
        report.decision
    );
    let envelope = ReportEnvelope::new(&submission.id, &exam.id, report);

    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        envelope.write_to_file(&path, config.output.pretty)?;
        tracing::info!("Report written to {}", path.display());
    }

    if json {
        println!("{}", envelope.to_json(true)?);
    } else {
        print_console_report(&envelope);
    }

    Ok(())
}

fn grade_batch(
    config: &Config,
    exam_path: &Path,
    dir: &Path,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let exam = load_exam(config, exam_path)?;
    let set = load_submissions_from_directory(dir)?;

    if set.submissions.is_empty() {
        return Err(format!("No submissions found in {}", dir.display()).into());
    }

    let output_dir = output.unwrap_or_else(|| PathBuf::from(&config.output.output_dir));
    std::fs::create_dir_all(&output_dir)?;

    let evaluator = exam.evaluator();
    let reports = evaluator.evaluate_all(set.submissions.iter().map(|s| &s.document));

    let mut envelopes = Vec::with_capacity(reports.len());
    for (submission, report) in set.submissions.iter().zip(reports) {
        tracing::info!(
            "Graded {}: {:.1}% ({})",
            submission.id,
            report.overall.pct * 100.0,
            report.decision
        );
        let envelope = ReportEnvelope::new(&submission.id, &exam.id, report);
        envelope.write_to_file(output_dir.join(envelope.file_name()), config.output.pretty)?;
        envelopes.push(envelope);
    }

    let skipped = set
        .skipped
        .iter()
        .map(|s| format!("{}: {}", s.path.display(), s.reason))
        .collect();
    let summary = GradingSummary::from_envelopes(&exam.id, &envelopes, skipped);

    if config.output.write_summary {
        let summary_path = output_dir.join("summary.json");
        summary.write_to_file(&summary_path)?;
        tracing::info!("Summary written to {}", summary_path.display());
    }

    print_summary(&summary);
    Ok(())
}

fn check_exam(config: &Config, exam_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let exam = load_exam(config, exam_path)?;
    let policy = exam.rubric.policy();

    println!("Exam {} is valid", exam.id);
    if let Some(title) = &exam.title {
        println!("Title: {}", title);
    }
    println!("Rubric: {}", exam.rubric.name());
    println!("{:-<60}", "");

    let mut unkeyed = Vec::new();
    for section in exam.rubric.sections() {
        println!(
            "  {} | {} criteria | max {:.1}",
            section.name(),
            section.criteria().len(),
            section.max_weight()
        );
        for criterion in section.criteria() {
            let marker = if criterion.critical { " [critical]" } else { "" };
            println!(
                "    {} | {} | weight {}{}",
                criterion.field_path,
                criterion.comparator.name(),
                criterion.weight,
                marker
            );
            if criterion.field_path.resolve(&exam.answer_key).is_none() {
                unkeyed.push(criterion.id.clone());
            }
        }
    }

    println!("{:-<60}", "");
    println!(
        "Pass policy: overall >= {:.1}%, critical must pass: {}",
        policy.overall_min_pct * 100.0,
        policy.critical_must_all_pass
    );

    for id in &unkeyed {
        tracing::warn!("Criterion {} has no value in the answer key", id);
    }
    if !unkeyed.is_empty() {
        println!("Warning: {} criteria have no answer-key value", unkeyed.len());
    }

    Ok(())
}

fn init_exam(output: PathBuf, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if output.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", output.display()).into());
    }

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&output, EXAM_TEMPLATE)?;
    println!("Exam template written to: {}", output.display());
    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
