//! Command line argument parsing for the elastic-query CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// elastic-query - compile backend-agnostic search requests to the Elasticsearch DSL
#[derive(Parser, Debug, Clone)]
#[command(name = "elastic-query")]
#[command(about = "Compile and simulate backend-agnostic search requests")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct ElasticQueryArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (JSON)
    #[arg(short, long, global = true, env = "ELASTIC_QUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl ElasticQueryArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the native request each search request compiles to
    Compile(CompileArgs),

    /// Check that search requests compile, without printing them
    Validate(ValidateArgs),

    /// Run search requests against documents loaded in memory
    Simulate(SimulateArgs),
}

/// Arguments for compiling requests
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// File holding one request or a JSON array of requests
    pub requests: PathBuf,
}

/// Arguments for validating requests
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// File holding one request or a JSON array of requests
    pub requests: PathBuf,
}

/// Arguments for simulating requests
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// File holding one request or a JSON array of requests
    pub requests: PathBuf,

    /// JSON lines file with one document source per line
    pub documents: PathBuf,

    /// Index the documents are loaded into (default: index of the first request)
    #[arg(short, long)]
    pub index: Option<String>,

    /// Maximum number of documents printed per response
    #[arg(short = 'n', long, default_value = "10")]
    pub max_documents: usize,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_command() {
        let args =
            ElasticQueryArgs::try_parse_from(["elastic-query", "compile", "requests.json"]).unwrap();

        if let Command::Compile(compile_args) = args.command {
            assert_eq!(compile_args.requests, PathBuf::from("requests.json"));
        } else {
            panic!("Expected Compile command");
        }
        assert_eq!(args.output_format, OutputFormat::Human);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_simulate_command() {
        let args = ElasticQueryArgs::try_parse_from([
            "elastic-query",
            "-f",
            "json",
            "simulate",
            "requests.json",
            "docs.jsonl",
            "--index",
            "books",
            "-n",
            "3",
            "--config",
            "config.json",
        ])
        .unwrap();

        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.config, Some(PathBuf::from("config.json")));
        if let Command::Simulate(simulate_args) = args.command {
            assert_eq!(simulate_args.documents, PathBuf::from("docs.jsonl"));
            assert_eq!(simulate_args.index.as_deref(), Some("books"));
            assert_eq!(simulate_args.max_documents, 3);
        } else {
            panic!("Expected Simulate command");
        }
    }

    #[test]
    fn test_verbosity() {
        let args = ElasticQueryArgs::try_parse_from(["elastic-query", "validate", "r.json"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args =
            ElasticQueryArgs::try_parse_from(["elastic-query", "-vvv", "validate", "r.json"]).unwrap();
        assert_eq!(args.verbosity(), 3);

        let args =
            ElasticQueryArgs::try_parse_from(["elastic-query", "-q", "-vv", "validate", "r.json"])
                .unwrap();
        assert_eq!(args.verbosity(), 0);
    }
}
