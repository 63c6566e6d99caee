//! Command-line interface for ipaflow
//!
//! Provides argument parsing using clap derive macros.

use crate::registry::Notation;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// IPA post-processing for phone recognizer output
#[derive(Parser, Debug)]
#[command(
    name = "ipaflow",
    version,
    about = "IPA post-processing for phone recognizer output"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-glyph detail and log entries, -vv: debug tracing)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe recognizer output (JSON) into annotated IPA
    Transcribe {
        /// Input JSON file, or '-' for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Language hint applied to utterances without one (e.g., en, es, pt-br)
        #[arg(long, value_name = "LANG")]
        language: Option<String>,

        /// Write the annotated transcripts as JSON
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,

        /// Print IPA per segment instead of per utterance
        #[arg(long)]
        segments: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Collapse identical adjacent glyphs into one long glyph
        #[arg(long)]
        collapse_repeats: bool,

        /// Worker threads for multi-utterance input
        #[arg(long, short = 'w', value_name = "N", default_value = "4")]
        workers: usize,
    },

    /// Look up a symbol in the registry
    Lookup {
        /// Symbol in IPA, X-SAMPA or ARPAbet
        symbol: String,

        /// Notation of the symbol (ipa, x-sampa, arpabet); all are tried if unset
        #[arg(long, short = 'n', value_name = "NOTATION")]
        notation: Option<Notation>,
    },

    /// Assign a symbol to a discovered cluster
    Relabel {
        /// Cluster identifier (e.g., C17)
        cluster: String,

        /// Symbol to assign
        symbol: String,

        /// Language the label applies to
        #[arg(long, short = 'l', value_name = "LANG")]
        language: String,

        /// Notation of the symbol
        #[arg(long, short = 'n', value_name = "NOTATION")]
        notation: Option<Notation>,
    },

    /// Show the ordered allophone rules in effect for a language
    Rules {
        /// Language code (default: configured default language)
        #[arg(long, short = 'l', value_name = "LANG")]
        language: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show {
        /// Print the resolved profile for this language instead
        #[arg(long, short = 'l', value_name = "LANG")]
        language: Option<String>,
    },
    /// Print the configuration file path
    Path,
}
