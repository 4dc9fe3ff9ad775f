//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// Product search relevance service - shopping search with LLM filtering
#[derive(Parser, Debug)]
#[command(name = "shoplens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "SHOPLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SHOPLENS_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "SHOPLENS_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SHOPLENS_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "SHOPLENS_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Disable the result cache
    #[arg(long)]
    pub no_cache: bool,
}
