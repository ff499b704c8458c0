use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use esframe::process::AudioType;

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    about      = "Probe, inspect and de-frame MP3/AAC elementary streams",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print stream information: detected format and first-frame
    /// properties.
    Info(InfoArgs),

    /// Walk the whole stream frame by frame, optionally writing the
    /// de-framed payload bytes out.
    Frames(FramesArgs),
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input elementary stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct FramesArgs {
    /// Input elementary stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Concatenate the emitted frame payloads into this file.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print one line per frame (offset and size).
    #[arg(long)]
    pub list: bool,

    /// Stream format to assume instead of probing.
    #[arg(long, value_enum, default_value_t = FormatHint::Auto)]
    pub format: FormatHint,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatHint {
    /// Probe the stream.
    Auto,
    /// Assume an MP3 elementary stream.
    Mp3,
    /// Assume AAC in ADTS framing.
    Aac,
}

impl FormatHint {
    pub fn to_audio_type(self) -> AudioType {
        match self {
            FormatHint::Auto => AudioType::Unknown,
            FormatHint::Mp3 => AudioType::Mp3,
            FormatHint::Aac => AudioType::Aac,
        }
    }
}
