//! CLI command definitions and argument parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use splfacts_domain::SectionKind;

/// splfacts CLI - Extract indications and adverse events from drug labels.
#[derive(Debug, Parser)]
#[command(name = "splfacts")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SPLFACTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vocabulary file (JSON lines of concept records)
    #[arg(long, global = true, env = "SPLFACTS_VOCABULARY")]
    pub vocabulary: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (ids only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the term dictionary and report what went into it
    Dictionary(DictionaryArgs),

    /// Match a piece of label text
    Match(MatchArgs),

    /// Extract label facts from a document file
    Run(RunArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Enter interactive matching mode
    Repl,
}

/// Arguments for the dictionary command.
#[derive(Debug, Parser)]
pub struct DictionaryArgs {
    /// Look up a term in the exact index
    #[arg(short, long)]
    pub lookup: Option<String>,
}

/// Arguments for the match command.
#[derive(Debug, Parser)]
pub struct MatchArgs {
    /// Text to match
    pub text: Option<String>,

    /// Read the text from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Section the text comes from
    #[arg(short, long, value_enum, default_value = "ae")]
    pub section: SectionArg,

    /// Brand name printed on the label
    #[arg(short, long)]
    pub brand: Option<String>,

    /// Use the stemmed index instead of the exact one
    #[arg(long)]
    pub algorithmic: bool,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Document file (JSON lines of source documents)
    #[arg(short, long)]
    pub documents: PathBuf,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the configured pool size
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Share first-observed dates across sections after merging
    #[arg(long)]
    pub reconcile: bool,

    /// Safety label change file (JSON lines) folded in by NDA
    #[arg(long)]
    pub label_changes: Option<PathBuf>,
}

/// Section argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SectionArg {
    /// Indications and usage
    Ind,
    /// Adverse reactions
    Ae,
    /// Boxed warning
    Blackbox,
}

impl From<SectionArg> for SectionKind {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Ind => SectionKind::Indication,
            SectionArg::Ae => SectionKind::AdverseEvent,
            SectionArg::Blackbox => SectionKind::BoxedWarning,
        }
    }
}
