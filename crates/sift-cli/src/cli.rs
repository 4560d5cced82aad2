use clap::{Parser, Subcommand, ValueEnum};
use sift_core::{EmbeddingBackend, IndexLocation};
use std::path::PathBuf;

/// Command-line arguments for sift
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Semantic retrieval over embedded document chunks", long_about = None)]
pub struct Cli {
    /// Config file [default: ~/.sift/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Embedding backend (overrides config)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Index storage directory (overrides config)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Embedding backends selectable on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Sentence embeddings from a local Ollama server
    Ollama,
    /// Offline token hashing
    Hashing,
}

impl From<BackendArg> for EmbeddingBackend {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::Ollama => Self::Ollama,
            BackendArg::Hashing => Self::Hashing,
        }
    }
}

/// How an input file is split into chunks
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChunkFormat {
    /// One chunk per non-empty line
    Lines,
    /// A JSON array of strings
    Json,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the index at a location from a file of chunks
    Index {
        /// File containing the chunks
        input: PathBuf,

        /// Index location
        #[arg(short, long, default_value = "default")]
        location: IndexLocation,

        /// Input format
        #[arg(long, value_enum, default_value_t = ChunkFormat::Lines)]
        format: ChunkFormat,
    },

    /// Retrieve the chunks most relevant to a query
    Query {
        /// Natural-language query
        query: String,

        /// Index location
        #[arg(short, long, default_value = "default")]
        location: IndexLocation,

        /// Number of chunks to return [default: from config]
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Show L2 distances
        #[arg(long)]
        scores: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what is indexed at a location
    Info {
        /// Index location
        #[arg(short, long, default_value = "default")]
        location: IndexLocation,
    },

    /// Show the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_arguments() {
        let cli = Cli::try_parse_from([
            "sift", "--backend", "hashing", "query", "knee surgery", "-k", "3", "-l", "claims",
        ])
        .unwrap();

        assert_eq!(cli.backend, Some(BackendArg::Hashing));
        match cli.command {
            Commands::Query {
                query,
                location,
                top_k,
                scores,
                json,
            } => {
                assert_eq!(query, "knee surgery");
                assert_eq!(location.as_str(), "claims");
                assert_eq!(top_k, Some(3));
                assert!(!scores);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_location_rejected() {
        let result = Cli::try_parse_from(["sift", "info", "--location", "../outside"]);
        assert!(matches!(result, Err(_)));
    }

    #[test]
    fn test_negative_top_k_rejected() {
        let result = Cli::try_parse_from(["sift", "query", "knee", "-k", "-1"]);
        assert!(matches!(result, Err(_)));
    }
}
