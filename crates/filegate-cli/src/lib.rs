//! filegate - check uploads by content, not by extension
//!
//! Command-line front end for `filegate-core`. Each file named on the
//! command line is read, matched against the allow-list, and (for ZIP
//! archives) screened for disguised executables.

pub mod cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use filegate_core::TypeTag;

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "filegate")]
#[command(author, version, about = "filegate - check uploads by content, not by extension")]
pub struct Cli {
    /// Config file (default: $FILEGATE_CONFIG or <config dir>/filegate/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate files against an allow-list
    Check {
        /// Files to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Allowed types, comma separated (png, jpg, jpeg, pdf, zip or MIME names)
        #[arg(long, short = 'a', value_delimiter = ',')]
        allow: Vec<TypeTag>,
        /// Print one JSON object per file
        #[arg(long)]
        json: bool,
    },
    /// List the supported file signatures
    Types,
}
