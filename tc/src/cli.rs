//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// taskcapture - free text in, 2-5 minute micro-steps out
#[derive(Parser)]
#[command(
    name = "tc",
    about = "ADHD-oriented task capture: turns free text into classified micro-steps",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Capture a task from free text
    Capture {
        /// The task text
        text: String,

        /// Mark DIGITAL steps for automatic execution downstream
        #[arg(long)]
        auto: bool,

        /// Treat UNKNOWN steps as best effort instead of blocking on answers
        #[arg(long)]
        no_clarify: bool,

        /// Run without the LLM (deterministic fallback mode)
        #[arg(long)]
        offline: bool,

        /// Knowledge-graph user
        #[arg(short, long)]
        user: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Answer clarification questions for a captured task
    Clarify {
        /// Task id returned by capture
        task_id: String,

        /// Answers as field=value pairs
        #[arg(short, long = "answer", value_name = "FIELD=VALUE")]
        answers: Vec<String>,

        /// Run without the LLM (deterministic fallback mode)
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a stored capture session
    Show {
        /// Task id to display
        task_id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List stored capture sessions
    List,
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {} (expected text or json)", s)),
        }
    }
}

/// Parse a `field=value` answer argument
pub fn parse_answer(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("Expected FIELD=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(
            parse_answer("email_recipient=sara@co.com").unwrap(),
            ("email_recipient".to_string(), "sara@co.com".to_string())
        );
        assert!(parse_answer("no-separator").is_err());
    }
}
