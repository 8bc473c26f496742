use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multimodal")]
#[command(author, version, about = "Build, inspect and serialize multimodal message parts")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which part type to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// Pick from the MIME type
    Auto,
    Binary,
    Audio,
    Image,
    Video,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a part from a file and show its properties
    Inspect {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Part type
        #[arg(short, long, value_enum, default_value = "auto")]
        kind: Kind,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the saved form of a file as a part
    Encode {
        /// File to encode
        #[arg(required = true)]
        file: PathBuf,

        /// Part type
        #[arg(short, long, value_enum, default_value = "auto")]
        kind: Kind,
    },

    /// Rebuild a part from its saved form
    Decode {
        /// JSON file holding the saved part
        #[arg(required = true)]
        json_file: PathBuf,

        /// Part type; `auto` reads the `type` tag
        #[arg(short, long, value_enum, default_value = "auto")]
        kind: Kind,

        /// Write the part's bytes here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download a URL as a part
    Fetch {
        /// URL to download
        #[arg(required = true)]
        url: String,

        /// Part type; `auto` asks the server for the MIME type first
        #[arg(short, long, value_enum, default_value = "auto")]
        kind: Kind,

        /// Allowed MIME patterns (repeatable)
        #[arg(long = "allow")]
        allow: Vec<String>,
    },

    /// Split text with @references into parts
    Query {
        /// Free text, e.g. `describe @photo.png`
        #[arg(required = true)]
        text: String,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
