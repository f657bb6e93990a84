//! CLI argument parsing for entitystore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "es")]
#[command(author, version, about = "Knowledge-graph entity store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// User whose knowledge document to operate on
    #[arg(short, long)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add or update an entity
    Add {
        /// Entity kind (contact, account, place, item)
        #[arg(required = true)]
        kind: String,

        /// Entity name ("Sara", "work email")
        #[arg(required = true)]
        name: String,

        /// Attribute fields as key=value pairs
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// List all entities for the user
    List,

    /// Show a single entity with its fields
    Show {
        /// Entity name to look up
        #[arg(required = true)]
        name: String,
    },

    /// Remove an entity by name
    Remove {
        /// Entity name to remove
        #[arg(required = true)]
        name: String,
    },

    /// List all users with a knowledge document
    Users,
}

/// Parse a `key=value` argument
pub fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("Expected KEY=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("email=sara@co.com").unwrap(),
            ("email".to_string(), "sara@co.com".to_string())
        );
        assert_eq!(
            parse_field("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_field("no-separator").is_err());
        assert!(parse_field("=value").is_err());
    }
}
