//! Screen CLI - Command-line interface for screen feature extraction
//!
//! Commands:
//! - extract: Compute screen features from screen and battery tables
//! - validate: Check that a table's status column is numeric
//! - features: List the registered feature names

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_screen::encoder::ReportEncoder;
use synheart_screen::features::ScreenFeature;
use synheart_screen::pipeline::{default_requests, parse_feature_selection, ScreenProcessor};
use synheart_screen::schema::{RawRecord, TableAdapter, DEFAULT_SCREEN_COLUMN};
use synheart_screen::{ScreenError, SCREEN_VERSION};

/// Screen - Feature extraction from smartphone screen-event logs
#[derive(Parser)]
#[command(name = "screen")]
#[command(author = "Synheart AI Inc")]
#[command(version = SCREEN_VERSION)]
#[command(about = "Compute screen-usage features from screen and battery logs", long_about = None)]
struct Cli {
    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute screen features
    Extract {
        /// Screen table path (use - for stdin)
        #[arg(short, long)]
        screen: PathBuf,

        /// Battery table path; no shutdowns are merged when omitted
        #[arg(short, long)]
        battery: Option<PathBuf>,

        /// Feature selection file (JSON mapping of feature name to configuration)
        #[arg(short, long)]
        features: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format of the tables
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Prepare the timeline once and share it between features
        #[arg(long)]
        memoize: bool,
    },

    /// Check that a table's status column is numeric
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Status column to check
        #[arg(long, default_value = DEFAULT_SCREEN_COLUMN)]
        column: String,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the registered feature names
    Features {
        /// Output as a JSON array
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// One feature row per line
    Ndjson,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ScreenCliError> {
    match cli.command {
        Commands::Extract {
            screen,
            battery,
            features,
            output,
            input_format,
            output_format,
            memoize,
        } => cmd_extract(
            &screen,
            battery.as_deref(),
            features.as_deref(),
            &output,
            input_format,
            output_format,
            memoize,
        ),

        Commands::Validate {
            input,
            input_format,
            column,
            json,
        } => cmd_validate(&input, input_format, &column, json),

        Commands::Features { json } => cmd_features(json),
    }
}

fn cmd_extract(
    screen: &Path,
    battery: Option<&Path>,
    features: Option<&Path>,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    memoize: bool,
) -> Result<(), ScreenCliError> {
    let screen_rows = read_table(screen, &input_format)?;
    let battery_rows = match battery {
        Some(path) => read_table(path, &input_format)?,
        None => Vec::new(),
    };
    log::info!(
        "read {} screen rows and {} battery rows",
        screen_rows.len(),
        battery_rows.len()
    );

    let requests = match features {
        Some(path) => {
            let selection: serde_json::Value = serde_json::from_str(&read_input(path)?)?;
            parse_feature_selection(&selection)?
        }
        None => default_requests(),
    };

    let processor = if memoize {
        ScreenProcessor::with_memoization()
    } else {
        ScreenProcessor::new()
    };
    let table = processor.extract(&screen_rows, &battery_rows, Some(&requests))?;
    let computed: Vec<ScreenFeature> = requests.iter().map(|r| r.feature).collect();

    let encoder = ReportEncoder::new();
    let output_data = match output_format {
        OutputFormat::Json => {
            let mut compact = serde_json::to_string(&encoder.encode(&table, &computed))?;
            compact.push('\n');
            compact
        }
        OutputFormat::JsonPretty => {
            let mut pretty = encoder.encode_to_json(&table, &computed)?;
            pretty.push('\n');
            pretty
        }
        OutputFormat::Ndjson => encoder.encode_rows_ndjson(&table)?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    column: &str,
    json: bool,
) -> Result<(), ScreenCliError> {
    let rows = read_table(input, &input_format)?;
    let report = TableAdapter::validate_column(&rows, column);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Column:       {}", report.column);
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.errors.len());

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Row {}: {}", err.row, err.message);
            }
        }
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(ScreenCliError::ValidationFailed(report.errors.len()))
    }
}

fn cmd_features(json: bool) -> Result<(), ScreenCliError> {
    let names: Vec<&str> = ScreenFeature::ALL.iter().map(|f| f.name()).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String, ScreenCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            log::warn!("reading table from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn read_table(path: &Path, format: &InputFormat) -> Result<Vec<RawRecord>, ScreenCliError> {
    let data = read_input(path)?;
    let rows = match format {
        InputFormat::Ndjson => TableAdapter::parse_ndjson(&data)?,
        InputFormat::Json => TableAdapter::parse_array(&data)?,
    };
    Ok(rows)
}

// Error types

#[derive(Debug)]
enum ScreenCliError {
    Io(io::Error),
    Screen(ScreenError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for ScreenCliError {
    fn from(e: io::Error) -> Self {
        ScreenCliError::Io(e)
    }
}

impl From<ScreenError> for ScreenCliError {
    fn from(e: ScreenError) -> Self {
        ScreenCliError::Screen(e)
    }
}

impl From<serde_json::Error> for ScreenCliError {
    fn from(e: serde_json::Error) -> Self {
        ScreenCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ScreenCliError> for CliError {
    fn from(e: ScreenCliError) -> Self {
        match e {
            ScreenCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ScreenCliError::Screen(e) => {
                let hint = match &e {
                    ScreenError::UnknownFeature(_) => "Run 'screen features' for valid names",
                    ScreenError::TypeConversion { .. } => "Run 'screen validate' for details",
                    ScreenError::InvalidConfig(_) => "Use a rule such as \"30T\" or \"1h30min\"",
                    _ => "Ensure tables are arrays of {user, device, time, ...} rows",
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            ScreenCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ScreenCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}
