//! gt3x CLI - Command-line interface for the GT3X converter
//!
//! Commands:
//! - convert: Decode a recording into mHealth CSV files
//! - info: Print a recording's device metadata

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gt3x_convert::{
    read_metadata, ConversionSummary, ConvertError, ConvertOptions, Converter, DeviceInfo,
    Dialect, ValueMode, CONVERTER_VERSION, PRODUCER_NAME,
};

/// gt3x - Convert GT3X accelerometer recordings to mHealth CSV
#[derive(Parser)]
#[command(name = "gt3x")]
#[command(version = CONVERTER_VERSION)]
#[command(about = "Convert GT3X accelerometer recordings to mHealth CSV", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recording into mHealth CSV files
    Convert {
        /// Input .gt3x file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Output value unit
        #[arg(long)]
        values: Option<ValuesArg>,

        /// Omit the timestamp column
        #[arg(long)]
        no_timestamps: bool,

        /// Start a new file every UTC hour
        #[arg(long)]
        split: bool,

        /// Output text dialect
        #[arg(long)]
        dialect: Option<DialectArg>,

        /// Also write per-minute activity count files
        #[arg(long)]
        activity_counts: bool,

        /// Load options from a JSON file (flags override it)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the conversion summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a recording's device metadata
    Info {
        /// Input .gt3x file
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ValuesArg {
    /// Acceleration in G
    G,
    /// Raw 12-bit ADC values
    Adc,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    /// yyyy-MM-dd timestamps, LF line endings
    Mhealth,
    /// M/d/yyyy timestamps, CRLF line endings
    Actigraph,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<(), Gt3xCliError> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            values,
            no_timestamps,
            split,
            dialect,
            activity_counts,
            config,
            json,
        } => {
            let mut options = match config {
                Some(path) => load_options(&path)?,
                None => ConvertOptions::default(),
            };
            if let Some(values) = values {
                options.values = match values {
                    ValuesArg::G => ValueMode::G,
                    ValuesArg::Adc => ValueMode::Adc,
                };
            }
            if let Some(dialect) = dialect {
                options.dialect = match dialect {
                    DialectArg::Mhealth => Dialect::Mhealth,
                    DialectArg::Actigraph => Dialect::Actigraph,
                };
            }
            if no_timestamps {
                options.with_timestamp = false;
            }
            options.split |= split;
            options.activity_counts |= activity_counts;

            cmd_convert(&input, &output, options, json)
        }
        Commands::Info { input, json } => cmd_info(&input, json),
    }
}

fn load_options(path: &Path) -> Result<ConvertOptions, Gt3xCliError> {
    let content = fs::read_to_string(path)?;
    Ok(ConvertOptions::from_json(&content)?)
}

fn cmd_convert(
    input: &Path,
    output: &Path,
    options: ConvertOptions,
    json: bool,
) -> Result<(), Gt3xCliError> {
    let summary = Converter::new(options).convert_file(input, output)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ConversionSummary) {
    println!("{} {}", PRODUCER_NAME, CONVERTER_VERSION);
    println!(
        "Device:   {} {} (firmware {}, {:?})",
        summary.device_type, summary.serial_number, summary.firmware, summary.variant
    );
    println!("Rate:     {} Hz", summary.sample_rate);
    println!(
        "Pairs:    {} written, {} gap-filled",
        summary.pairs_written, summary.synthetic_pairs
    );
    if summary.records_accepted + summary.records_rejected > 0 {
        println!(
            "Records:  {} accepted ({} ignored), {} failed checksum",
            summary.records_accepted, summary.records_ignored, summary.records_rejected
        );
    }
    if let Some(truncated) = &summary.truncated {
        println!(
            "Warning:  log truncated while {} ({} bytes)",
            truncated.state, truncated.pending_bytes
        );
    }
    for file in &summary.files {
        println!("  {}", file);
    }
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Gt3xCliError> {
    let (metadata, variant) = read_metadata(input)?;
    let info = DeviceInfo::new(metadata, variant);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let metadata = &info.metadata;
    println!("Serial Number:      {}", metadata.serial_number);
    println!("Device Type:        {}", info.device_type);
    println!("Firmware:           {}", metadata.firmware);
    println!("Variant:            {:?}", info.variant);
    println!("Sample Rate:        {} Hz", metadata.sample_rate);
    println!("Acceleration Scale: {}", info.acceleration_scale);
    println!("Start Date:         {}", format_millis(metadata.start_date));
    if let Some(download) = metadata.download_date {
        println!("Download Date:      {}", format_millis(download));
    }
    if let Some(tz) = &metadata.timezone {
        println!("TimeZone:           {}", tz);
    }
    if let Some(voltage) = metadata.battery_voltage {
        println!("Battery Voltage:    {}", voltage);
    }
    Ok(())
}

fn format_millis(ms: i64) -> String {
    gt3x_convert::mhealth::format_timestamp(ms, Dialect::Mhealth)
}

// Error types

#[derive(Debug)]
enum Gt3xCliError {
    Io(io::Error),
    Convert(ConvertError),
    Json(serde_json::Error),
}

impl From<io::Error> for Gt3xCliError {
    fn from(e: io::Error) -> Self {
        Gt3xCliError::Io(e)
    }
}

impl From<ConvertError> for Gt3xCliError {
    fn from(e: ConvertError) -> Self {
        Gt3xCliError::Convert(e)
    }
}

impl From<serde_json::Error> for Gt3xCliError {
    fn from(e: serde_json::Error) -> Self {
        Gt3xCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<Gt3xCliError> for CliError {
    fn from(e: Gt3xCliError) -> Self {
        match e {
            Gt3xCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            Gt3xCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            Gt3xCliError::Convert(e) => {
                let (code, hint) = match &e {
                    ConvertError::NotAContainer => {
                        ("NOT_A_CONTAINER", "Input must be a .gt3x (zip) file")
                    }
                    ConvertError::MissingEntry(_) => {
                        ("MISSING_ENTRY", "The recording is incomplete or was not fully downloaded")
                    }
                    ConvertError::MissingField(_) | ConvertError::InvalidField { .. } => {
                        ("BAD_METADATA", "Run 'gt3x info' to inspect info.txt")
                    }
                    ConvertError::UnknownDevice { .. } => {
                        ("UNKNOWN_DEVICE", "Only GT3X+, ActiSleep+, wGT3X and GT9X devices are supported")
                    }
                    ConvertError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    ConvertError::Archive(_) => ("ARCHIVE_ERROR", "The .gt3x archive is damaged"),
                    ConvertError::Json(_) => ("JSON_ERROR", "Check the options file syntax"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
        }
    }
}
