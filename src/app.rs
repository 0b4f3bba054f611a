//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - dispatches to the command handlers, which print reports and write files

use clap::Parser;
use tracing::info;

use crate::cli::{CheckArgs, Cli, Command, GenerateArgs, InitArgs, TemplateArgs};
use crate::domain::{MatrixConfig, has_errors};
use crate::error::AppError;
use crate::grading::validate_roster;
use crate::io::{
    artifact_paths, read_config_json, read_roster, resolve_chart_columns, write_artifact, write_config_json,
    write_matrix_json, write_template,
};
use crate::report::{format_config_summary, format_issues, format_matrix_report, format_row_errors};

use self::pipeline::GradeSource;

pub mod pipeline;

/// Entry point for the `gm` binary.
pub fn run() -> Result<(), AppError> {
    // GM_CONFIG may come from a `.env` next to the class files.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init(&cli.log_level)?;

    match cli.command {
        Command::Init(args) => handle_init(args),
        Command::Check(args) => handle_check(args),
        Command::Template(args) => handle_template(args),
        Command::Generate(args) => handle_generate(args),
    }
}

fn handle_init(args: InitArgs) -> Result<(), AppError> {
    write_config_json(&args.output, &MatrixConfig::default(), args.force)?;
    println!("Wrote default configuration to {}", args.output.display());
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<(), AppError> {
    let config = read_config_json(&args.config.config)?;
    let mut issues = config.validate();
    let roster = match &args.students {
        Some(path) => {
            let roster = read_roster(path)?;
            issues.extend(validate_roster(&roster));
            Some(roster)
        }
        None => None,
    };

    println!("{}", format_config_summary(&config));
    if let Some(roster) = &roster {
        println!("Students: {}\n", roster.len());
    }
    print!("{}", format_issues(&issues));

    if has_errors(&issues) {
        return Err(AppError::new(3, "Validation failed; fix the errors above before generating."));
    }
    Ok(())
}

fn handle_template(args: TemplateArgs) -> Result<(), AppError> {
    let config = pipeline::load_config(&args.config.config)?;
    let roster = pipeline::load_roster(&args.students)?;

    write_template(&args.output, &config, &roster)?;
    println!(
        "Wrote entry template for {} student(s) x {} period(s) to {}",
        roster.len(),
        config.trimesters.len(),
        args.output.display()
    );
    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let sources: Vec<GradeSource> = args
        .grades
        .iter()
        .cloned()
        .map(GradeSource::Mixed)
        .chain(
            args.period_grades
                .iter()
                .map(|(period, path)| GradeSource::Period {
                    period: period.clone(),
                    path: path.clone(),
                }),
        )
        .collect();

    let run = pipeline::run_generate(&args.config.config, &args.students, &sources)?;
    let chart = resolve_chart_columns(&run.config, &args.chart_columns)?;

    if !args.quiet {
        println!("{}", format_config_summary(&run.config));
        print!("{}", format_issues(run.config.warnings()));
        for (source, ingested) in &run.ingests {
            print!("{}", format_row_errors(&source.path().display().to_string(), &ingested.row_errors));
        }
        println!("{}", format_matrix_report(&run.matrix, &run.config));
    }

    let paths = artifact_paths(&run.config, args.out_dir.as_deref());
    write_artifact(&paths, &run.matrix, &run.config, &run.grades, &chart)?;
    println!("Wrote {}", paths.matrix.display());
    println!("Wrote {}", paths.totals.display());
    if !chart.is_empty() {
        println!("Wrote {}", paths.chart.display());
    }

    if let Some(path) = &args.json {
        write_matrix_json(path, &run.matrix)?;
        println!("Wrote {}", path.display());
    }

    info!(
        students = run.roster.len(),
        periods = run.matrix.periods.len(),
        "generation complete"
    );
    Ok(())
}
