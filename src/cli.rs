//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Project-management API gateway: validated queries and mutations against a
/// schema-evolving REST API
#[derive(Parser, Debug)]
#[command(name = "pm-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "PM_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "PM_GATEWAY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "PM_GATEWAY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Output format for command results
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List valid entity types
    Types,

    /// Show descriptor and reconciled metadata for an entity type
    Inspect {
        /// Entity type, e.g. `UserStory`
        entity_type: String,
    },

    /// Search entities of one type
    Search {
        /// Entity type, e.g. `Bug`
        entity_type: String,

        /// Where-clause, e.g. "EntityState.Name eq 'Open'"
        #[arg(short = 'w', long = "where")]
        where_clause: Option<String>,

        /// Related entities to include (repeatable)
        #[arg(short, long)]
        include: Vec<String>,

        /// Page size (1-1000)
        #[arg(short, long)]
        take: Option<u32>,

        /// Items to skip
        #[arg(short, long)]
        skip: Option<u32>,

        /// Sort fields (repeatable)
        #[arg(short, long = "order-by")]
        order_by: Vec<String>,
    },

    /// Fetch one entity
    Get {
        /// Entity type
        entity_type: String,
        /// Entity id
        id: u64,
        /// Related entities to include (repeatable)
        #[arg(short, long)]
        include: Vec<String>,
    },

    /// Create an entity from a JSON object
    Create {
        /// Entity type
        entity_type: String,
        /// JSON object, e.g. '{"Name":"Login fails","Project":{"Id":12}}'
        data: String,
    },

    /// Update an entity with a JSON object
    Update {
        /// Entity type
        entity_type: String,
        /// Entity id
        id: u64,
        /// JSON object with the fields to change
        data: String,
    },

    /// List comments on an entity
    Comments {
        /// Entity id
        entity_id: u64,
    },

    /// Add a comment to an entity
    Comment {
        /// Entity id
        entity_id: u64,
        /// Comment text
        text: String,
        /// Reply to this comment
        #[arg(long)]
        parent: Option<u64>,
    },

    /// Delete a comment
    DeleteComment {
        /// Comment id
        comment_id: u64,
    },

    /// Show attachment metadata
    Attachment {
        /// Attachment id
        attachment_id: u64,
    },

    /// Download attachment content
    Download {
        /// Attachment id
        attachment_id: u64,
        /// Output file (defaults to the attachment name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
