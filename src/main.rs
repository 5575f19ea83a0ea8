//! spudrun CLI - run spudcan penetration analyses against the engine

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use spudrun::{
    builder, create_backend, AnalysisResults, CommandSequence, EngineConfig, EngineError,
    ErrorKind, FixSuggestion, Orchestrator, Project, ProgressSink, ResultQuery, Stage,
};

#[derive(Parser)]
#[command(name = "spudrun")]
#[command(about = "Spudcan penetration analysis automation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full analysis: connect, build, calculate, extract
    Run {
        /// Path to the project YAML file
        project: PathBuf,

        /// Path to the engine configuration YAML file
        #[arg(short, long, default_value = "engine.yaml")]
        config: PathBuf,

        /// Exported result table to fall back to in batch mode
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Print results as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Validate a project file (build the command sequence only)
    Validate {
        /// Path to the project YAML file
        project: PathBuf,
    },
}

/// Prints stage changes to stderr so long blocking calls stay visible
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn stage_changed(&self, stage: Stage) {
        eprintln!("{} {}", "stage:".cyan(), stage);
    }

    fn progress(&self, message: &str) {
        eprintln!("{} {}", "→".cyan(), message);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            project,
            config,
            table,
            json,
        } => run_analysis(&project, &config, table, json),
        Commands::Validate { project } => validate_project(&project),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_project(path: &PathBuf) -> Result<Project, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        EngineError::new(
            ErrorKind::Configuration,
            format!("Could not read project file '{}'", path.display()),
            e.to_string(),
            "project loading",
        )
    })?;
    serde_yaml::from_str(&text).map_err(|e| {
        EngineError::new(
            ErrorKind::Configuration,
            format!("Project file '{}' is not a valid project", path.display()),
            e.to_string(),
            "project loading",
        )
    })
}

/// The four orchestration stages, in order; split out so the caller can
/// disconnect exactly once whatever happens.
fn drive(
    orchestrator: &mut Orchestrator,
    model_sequence: &CommandSequence,
    table: Option<PathBuf>,
) -> Result<AnalysisResults, EngineError> {
    orchestrator.connect()?;
    orchestrator.setup_model(model_sequence, true)?;
    orchestrator.run_calculation(&builder::calculation_sequence())?;
    let query = ResultQuery {
        fallback_table: table,
        ..ResultQuery::default()
    };
    orchestrator.extract_results(&query)
}

fn run_analysis(
    project_path: &PathBuf,
    config_path: &PathBuf,
    table: Option<PathBuf>,
    json: bool,
) -> Result<(), EngineError> {
    let project = load_project(project_path)?;
    let config = EngineConfig::from_file(config_path)?;
    let sequence = builder::build_sequence(&project)?;

    let backend = create_backend(&config)?;
    eprintln!(
        "{} backend: {} | project: {}",
        "→".cyan(),
        backend.name().cyan().bold(),
        project.title.cyan()
    );

    let mut orchestrator =
        Orchestrator::new(backend, project.title.clone()).with_sink(Box::new(ConsoleSink));

    let outcome = drive(&mut orchestrator, &sequence, table);
    orchestrator.disconnect();
    let results = outcome?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).expect("results serialize")
        );
    } else {
        print_summary(&results);
    }
    Ok(())
}

fn print_summary(results: &AnalysisResults) {
    println!("{}", "Analysis complete".green().bold());
    match results.peak_vertical_resistance {
        Some(peak) => println!("  peak vertical resistance: {:.2} kN", peak),
        None => println!("  peak vertical resistance: n/a"),
    }
    match results.final_penetration_depth {
        Some(depth) => println!("  final penetration depth:  {:.3} m", depth),
        None => println!("  final penetration depth:  n/a"),
    }
    println!(
        "  curve points:             {}",
        results.load_penetration_curve.len()
    );
}

fn validate_project(path: &PathBuf) -> Result<(), EngineError> {
    let project = load_project(path)?;
    let sequence = builder::build_sequence(&project)?;
    println!(
        "{} '{}' builds {} commands ({} statements)",
        "Valid:".green().bold(),
        project.title,
        sequence.len(),
        sequence.statement_count()
    );
    Ok(())
}
