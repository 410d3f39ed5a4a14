//! CLI argument parsing for flow promotion.
//!
//! The CLI is intentionally thin: it wires config into the stager and applier
//! without embedding policy, so the same logic is reusable from tests.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "flowlift",
    version,
    about = "Promote versioned NiFi flows between environments",
    after_help = "Examples:\n  flowlift init --out flowlift.json\n  flowlift check --config flowlift.json\n  flowlift migrate --config flowlift.json\n  flowlift sanitize --input snapshot.json --output clean.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Check(CheckArgs),
    Migrate(MigrateArgs),
    Sanitize(SanitizeArgs),
}

/// Write a starter config file.
#[derive(Parser, Debug)]
#[command(about = "Write a starter migration config")]
pub struct InitArgs {
    /// Output path for the config stub
    #[arg(long, value_name = "PATH", default_value = "flowlift.json")]
    pub out: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Validate source-side preconditions without touching the target.
#[derive(Parser, Debug)]
#[command(about = "Check source preconditions and stage exports (read-only)")]
pub struct CheckArgs {
    /// Path to the migration config JSON
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,
}

/// Run the full promotion: stage from source, apply to target.
#[derive(Parser, Debug)]
#[command(about = "Promote the configured flows from source to target")]
pub struct MigrateArgs {
    /// Path to the migration config JSON
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,
}

/// Sanitize a snapshot file locally.
#[derive(Parser, Debug)]
#[command(about = "Strip parameter-context references from a snapshot file")]
pub struct SanitizeArgs {
    /// Path to a versioned-flow snapshot JSON file
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output path; stdout when omitted
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}
