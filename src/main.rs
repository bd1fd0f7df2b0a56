//! Gridcalc - evaluate a JSON spreadsheet grid from the command line

mod logging;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use gridcalc_core::{Config, Document};
use gridcalc_engine::engine::{ErrorPolicy, Grid, Strategy, format_display};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyArg {
    Recursive,
    Memoized,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Recursive => Strategy::Recursive,
            StrategyArg::Memoized => Strategy::Memoized,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ErrorsArg {
    Zero,
    Tagged,
}

impl From<ErrorsArg> for ErrorPolicy {
    fn from(arg: ErrorsArg) -> Self {
        match arg {
            ErrorsArg::Zero => ErrorPolicy::Zero,
            ErrorsArg::Tagged => ErrorPolicy::Tagged,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gridcalc")]
#[command(about = "Evaluate spreadsheet formulas over a JSON grid")]
#[command(version)]
struct Cli {
    /// Grid file to open (JSON array of rows)
    file: Option<PathBuf>,

    /// Set a cell before evaluating, e.g. `--set B2=17` or `--set C1==A1*2`.
    /// Repeatable; applied in order.
    #[arg(long = "set", value_name = "REF=INPUT")]
    set: Vec<String>,

    /// Evaluate a single formula against the grid and print its value
    #[arg(short = 'c', long = "command", value_name = "FORMULA")]
    command: Option<String>,

    /// Print computed values as JSON
    #[arg(long)]
    json: bool,

    /// Print evaluation diagnostics to stderr
    #[arg(long)]
    diagnostics: bool,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// How failed formulas are shown
    #[arg(long, value_enum)]
    errors: Option<ErrorsArg>,

    /// Maximum reference nesting before a read is refused
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Read settings from this TOML file instead of the user config
    #[arg(long, value_name = "PATH", conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Ignore the user config file
    #[arg(long)]
    no_config: bool,

    /// Write the edited raw grid to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.no_config {
        Config::default()
    } else {
        Config::load(cli.config.as_deref())?
    };
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy.into();
    }
    if let Some(errors) = cli.errors {
        config.errors = errors.into();
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    log::debug!("using {:?}", config);

    let mut doc = match &cli.file {
        Some(path) => Document::open(path, config.options())
            .with_context(|| format!("failed to open {}", path.display()))?,
        None => Document::with_options(Grid::new(), config.options()),
    };

    for assignment in &cli.set {
        let cell = doc.apply_assignment(assignment)?;
        log::info!("set {} from {:?}", cell, assignment);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(formula) = &cli.command {
        let input = if formula.trim_start().starts_with('=') {
            formula.clone()
        } else {
            format!("={}", formula)
        };
        let (value, errors) = doc.evaluate(&input);
        if cli.json {
            writeln!(out, "{}", serde_json::to_string(&value)?)?;
        } else {
            writeln!(out, "{}", format_display(&value))?;
        }
        if cli.diagnostics {
            for error in &errors {
                eprintln!("{}", error);
            }
        }
    } else {
        if cli.json {
            writeln!(out, "{}", serde_json::to_string(doc.computed_grid())?)?;
        } else {
            for row in doc.display_rows() {
                writeln!(out, "{}", row.join("\t"))?;
            }
        }
        if cli.diagnostics {
            for diagnostic in doc.diagnostics() {
                eprintln!("{}", diagnostic);
            }
        }
    }

    if let Some(output) = &cli.output {
        doc.save_json(output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        log::info!("wrote {}", output.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
