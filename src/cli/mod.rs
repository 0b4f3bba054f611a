//! Command-line parsing for the grading matrix generator.
//!
//! Argument parsing and command dispatch stay separate from the grading core.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gm", version, about = "Student grading matrix generator")]
pub struct Cli {
    /// Log level for stderr diagnostics (overridden by GM_LOG / RUST_LOG).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the default configuration to a JSON file.
    Init(InitArgs),
    /// Validate a configuration (and optionally a roster) and print every issue.
    Check(CheckArgs),
    /// Write an empty grade entry CSV for every period and student.
    Template(TemplateArgs),
    /// Compute the grade matrix from entered grades and write the artifact.
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Where to write the configuration.
    #[arg(short, long, default_value = "config.json")]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Configuration source shared by every command that reads one.
#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Configuration JSON. Missing keys fall back to the defaults.
    #[arg(short, long, env = "GM_CONFIG", value_name = "JSON")]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Roster to validate alongside the configuration.
    #[arg(short, long, value_name = "FILE")]
    pub students: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Roster file: one name per line, or a CSV whose first column is the name.
    #[arg(short, long, value_name = "FILE")]
    pub students: PathBuf,

    /// Where to write the entry CSV.
    #[arg(short, long, default_value = "grades_entry.csv")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Roster file: one name per line, or a CSV whose first column is the name.
    #[arg(short, long, value_name = "FILE")]
    pub students: PathBuf,

    /// Grade CSV with a `period` column. May be repeated.
    #[arg(short, long, value_name = "CSV")]
    pub grades: Vec<PathBuf>,

    /// Grade CSV for a single period, as PERIOD=FILE. May be repeated.
    #[arg(long = "period-grades", value_name = "PERIOD=CSV", value_parser = parse_period_grades)]
    pub period_grades: Vec<(String, PathBuf)>,

    /// Directory for the artifact when `output_file` is relative.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Also dump the full computed matrix as JSON.
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Columns to collect into `<stem>_chart.csv`, e.g. `Final Grade,Avg A,A_Project 1`.
    #[arg(long, value_name = "COLUMN", value_delimiter = ',')]
    pub chart_columns: Vec<String>,

    /// Print only warnings and the artifact paths.
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_period_grades(raw: &str) -> Result<(String, PathBuf), String> {
    let (period, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PERIOD=FILE, got `{raw}`"))?;
    let period = period.trim();
    let path = path.trim();
    if period.is_empty() || path.is_empty() {
        return Err(format!("expected PERIOD=FILE, got `{raw}`"));
    }
    Ok((period.to_string(), PathBuf::from(path)))
}
