//! mefkit CLI
//!
//! Command-line tools for mefkit sessions.
//!
//! # Commands
//!
//! - `write` - Write samples from a text file to a channel
//! - `generate` - Write pink noise to a channel
//! - `read` - Print samples of one or more channels
//! - `inspect` - Display channel metadata
//! - `annotate` - Add an annotation record
//! - `annotations` - List annotation records

mod commands;

use clap::{Args, Parser, Subcommand};
use commands::generate::NoiseOptions;
use commands::write::WriteOptions;
use commands::Format;
use mefkit_core::{GapTolerance, SessionReader, SessionWriter, WriterConfig};
use mefkit_storage::{Credentials, OpenMode, RecordKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// mefkit command-line session tools.
#[derive(Parser)]
#[command(name = "mefkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the session directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Write password
    #[arg(global = true, long)]
    write_password: Option<String>,

    /// Access password
    #[arg(global = true, long)]
    access_password: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that write samples.
#[derive(Args)]
struct ChannelWriteArgs {
    /// Channel name
    #[arg(short, long)]
    channel: String,

    /// Timestamp of the first sample (uutc)
    #[arg(long, default_value = "0")]
    start: i64,

    /// Sampling frequency in Hz
    #[arg(long)]
    fs: f64,

    /// End timestamp (uutc); derived from the sample count if omitted
    #[arg(long)]
    end: Option<i64>,

    /// Decimal digits to keep for a new channel; inferred if omitted
    #[arg(long)]
    precision: Option<i64>,

    /// Start a new segment instead of appending
    #[arg(long)]
    new_segment: bool,

    /// Store the buffer as one run without splitting at gaps
    #[arg(long)]
    no_gap_split: bool,

    /// Longest gap in samples kept inside a run (default: one second)
    #[arg(long)]
    gap_tolerance: Option<usize>,

    /// Fixed storage block length in samples
    #[arg(long)]
    block_length: Option<i64>,

    /// Unit label
    #[arg(long, default_value = "uV")]
    units: String,

    /// Replace any existing session
    #[arg(long)]
    overwrite: bool,
}

impl ChannelWriteArgs {
    fn config(&self) -> WriterConfig {
        let mut config = WriterConfig::new().data_units(self.units.clone());
        if let Some(samples) = self.gap_tolerance {
            config = config.gap_tolerance(GapTolerance::Samples(samples));
        }
        if let Some(length) = self.block_length {
            config = config.block_length(length);
        }
        config
    }

    fn options(&self) -> WriteOptions {
        WriteOptions {
            channel: self.channel.clone(),
            start_uutc: self.start,
            sampling_frequency: self.fs,
            end_uutc: self.end,
            precision: self.precision,
            new_segment: self.new_segment,
            no_gap_split: self.no_gap_split,
        }
    }

    const fn mode(&self) -> OpenMode {
        if self.overwrite {
            OpenMode::Overwrite
        } else {
            OpenMode::CreateOrOpen
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write samples from a text file, one value per line
    Write {
        /// Sample file; empty lines and `nan` are gaps
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        target: ChannelWriteArgs,
    },

    /// Write pink noise to a channel
    Generate {
        /// Signal length in seconds
        #[arg(long, default_value = "10")]
        seconds: f64,

        /// Lower amplitude bound
        #[arg(long, default_value = "-200", allow_hyphen_values = true)]
        low: f64,

        /// Upper amplitude bound
        #[arg(long, default_value = "200", allow_hyphen_values = true)]
        high: f64,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        target: ChannelWriteArgs,
    },

    /// Print samples in physical units
    Read {
        /// Channel names or indices (default: all)
        #[arg(short, long, value_delimiter = ',')]
        channels: Vec<String>,

        /// Window start (uutc)
        #[arg(long)]
        start: Option<i64>,

        /// Window end (uutc)
        #[arg(long)]
        end: Option<i64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display channel metadata
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Add an annotation record
    Annotate {
        /// Channel; the session when omitted
        #[arg(short, long)]
        channel: Option<String>,

        /// Record time (uutc)
        #[arg(long)]
        time: i64,

        /// Record type (Note, EDFA, Seiz, Curs, Epoc)
        #[arg(long, default_value = "Note")]
        kind: RecordKind,

        /// Record text
        #[arg(long, default_value = "")]
        text: String,

        /// Duration in microseconds
        #[arg(long)]
        duration: Option<i64>,
    },

    /// List annotation records
    Annotations {
        /// Channel; the session when omitted
        #[arg(short, long)]
        channel: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut credentials = Credentials::none();
    if let Some(password) = cli.write_password {
        credentials = credentials.with_level_1(password);
    }
    if let Some(password) = cli.access_password {
        credentials = credentials.with_level_2(password);
    }

    match cli.command {
        Commands::Write { input, target } => {
            let path = cli.path.ok_or("Session path required for write")?;
            let engine = commands::open_session(&path, target.mode(), &credentials)?;
            let mut writer = SessionWriter::open(engine, target.config(), credentials)?;
            commands::write::run(&mut writer, &input, &target.options())?;
            writer.close()?;
        }
        Commands::Generate {
            seconds,
            low,
            high,
            seed,
            target,
        } => {
            let path = cli.path.ok_or("Session path required for generate")?;
            let engine = commands::open_session(&path, target.mode(), &credentials)?;
            let mut writer = SessionWriter::open(engine, target.config(), credentials)?;
            let noise = NoiseOptions {
                seconds,
                low,
                high,
                seed,
            };
            commands::generate::run(&mut writer, noise, &target.options())?;
            writer.close()?;
        }
        Commands::Read {
            channels,
            start,
            end,
            format,
        } => {
            let path = cli.path.ok_or("Session path required for read")?;
            let engine = commands::open_session(&path, OpenMode::Open, &credentials)?;
            let reader = SessionReader::open(engine)?;
            commands::read::run(&reader, &channels, start, end, Format::parse(&format)?)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Session path required for inspect")?;
            let engine = commands::open_session(&path, OpenMode::Open, &credentials)?;
            let reader = SessionReader::open(engine)?;
            commands::inspect::run(&path, &reader, Format::parse(&format)?)?;
        }
        Commands::Annotate {
            channel,
            time,
            kind,
            text,
            duration,
        } => {
            let path = cli.path.ok_or("Session path required for annotate")?;
            let engine = commands::open_session(&path, OpenMode::Open, &credentials)?;
            let mut writer = SessionWriter::open(engine, WriterConfig::default(), credentials)?;
            commands::annotate::add(&mut writer, channel.as_deref(), time, kind, &text, duration)?;
            writer.close()?;
        }
        Commands::Annotations { channel, format } => {
            let path = cli.path.ok_or("Session path required for annotations")?;
            let engine = commands::open_session(&path, OpenMode::Open, &credentials)?;
            let reader = SessionReader::open(engine)?;
            commands::annotate::list(&reader, channel.as_deref(), Format::parse(&format)?)?;
        }
        Commands::Version => {
            println!("mefkit CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("mefkit Core v{}", mefkit_core::VERSION);
        }
    }

    Ok(())
}
