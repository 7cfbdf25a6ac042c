//! apigen CLI
//!
//! Generates typed client stubs and OpenAPI documents from extracted source
//! units, checks generated files for drift, and inspects the extracted API
//! surface.
//!
//! Usage:
//!   apigen generate --config apigen.toml
//!   apigen check --task docs
//!   apigen inspect --root dump "**/*.controller.json"
//!   apigen config --output apigen.toml

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use apigen::config::Framework;
use apigen::pipeline::TaskReport;
use apigen::writer::WriteStatus;
use apigen::{run_batch, ApigenConfig, ControllerExtractor, Diagnostics, JsonSourceReader, OutputMode, SourceReader};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apigen")]
#[command(about = "Generate API clients and schema documents from annotated controllers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run generation tasks and write their artifacts
    Generate {
        /// Configuration file (in addition to the default locations)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run only the named task
        #[arg(short, long)]
        task: Option<String>,

        /// Print artifacts to stdout instead of writing files
        #[arg(long)]
        stdout: bool,
    },

    /// Compare generated artifacts against the files on disk
    Check {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        task: Option<String>,
    },

    /// Print the extracted controllers as JSON
    Inspect {
        /// Directory the patterns are relative to
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        #[arg(short, long, value_enum, default_value = "nest")]
        framework: FrameworkArg,

        /// Source unit patterns
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Print or save the effective configuration
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the configuration here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum FrameworkArg {
    Nest,
}

impl From<FrameworkArg> for Framework {
    fn from(arg: FrameworkArg) -> Self {
        match arg {
            FrameworkArg::Nest => Framework::Nest,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Generate { config, task, stdout } => {
            let mode = if stdout { OutputMode::Stdout } else { OutputMode::Write };
            run_tasks(config, task, mode)
        }
        Command::Check { config, task } => run_tasks(config, task, OutputMode::Check),
        Command::Inspect { root, framework, patterns } => {
            let units = JsonSourceReader::new()
                .read(&root, &patterns)
                .with_context(|| format!("reading source units under {}", root.display()))?;

            let mut diagnostics = Diagnostics::new();
            let extractor = ControllerExtractor::new(Framework::from(framework).convention());
            let controllers = extractor.extract_all(&units, &mut diagnostics)?;

            println!("{}", serde_json::to_string_pretty(&controllers)?);
            if !diagnostics.is_empty() {
                eprint!("{}", diagnostics);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { config, output } => {
            let config = ApigenConfig::load_from(config.as_deref())?;
            match output {
                Some(path) => {
                    config.save(&path)?;
                    eprintln!("✅ Configuration saved to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_tasks(config: Option<PathBuf>, task: Option<String>, mode: OutputMode) -> anyhow::Result<ExitCode> {
    let config = ApigenConfig::load_from(config.as_deref()).context("loading configuration")?;
    let tasks = config.select_tasks(task.as_deref())?;
    if tasks.is_empty() {
        eprintln!("⚠️  No tasks configured");
        return Ok(ExitCode::SUCCESS);
    }

    let root = config.root_path();
    let reader = JsonSourceReader::new();
    let results = run_batch(&tasks, &root, &reader, mode);

    let mut failed = 0;
    let mut drifted = false;
    for (name, result) in results {
        match result {
            Ok(report) => {
                drifted |= report.has_drift();
                print_report(&report, mode);
            }
            Err(e) => {
                failed += 1;
                eprintln!("❌ {}: {}", name, e);
            }
        }
    }

    if failed > 0 {
        eprintln!("\n❌ {} task(s) failed", failed);
        return Ok(ExitCode::FAILURE);
    }
    if mode == OutputMode::Check {
        if drifted {
            eprintln!("\n❌ Generated files are out of date");
            return Ok(ExitCode::from(2));
        }
        eprintln!("\n✅ No drift detected");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &TaskReport, mode: OutputMode) {
    eprintln!(
        "📦 {} ({}): {} controllers, {} requests, {} types",
        report.task, report.emitter, report.controllers, report.requests, report.declarations
    );

    for outcome in &report.outcomes {
        let path = outcome.path.display();
        match &outcome.status {
            WriteStatus::Created => eprintln!("   ✨ created {}", path),
            WriteStatus::Updated => eprintln!("   📝 updated {}", path),
            WriteStatus::Unchanged if mode == OutputMode::Check => eprintln!("   ✅ {}", path),
            WriteStatus::Unchanged => eprintln!("   ✅ unchanged {}", path),
            WriteStatus::Streamed => {}
            WriteStatus::Missing => eprintln!("   ❌ missing {}", path),
            WriteStatus::Drifted { diff } => {
                eprintln!("   ❌ out of date {}", path);
                eprint!("{}", diff);
            }
        }
    }

    if report.diagnostics.warning_count() > 0 {
        eprintln!("   ⚠️  {} warning(s)", report.diagnostics.warning_count());
    }
}
