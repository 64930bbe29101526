//! Command handlers module.
//!
//! - `perception.rs`: routing and detection merge commands
//! - `vocab.rs`: adaptive vocabulary commands
//! - `tiers.rs`: deep analysis and tier status commands
//! - `config.rs`: configuration display command

mod config;
mod perception;
mod tiers;
mod vocab;

use clap::Subcommand;

pub use config::cmd_config;
pub use perception::{cmd_merge, cmd_route};
pub use tiers::{cmd_analyze, cmd_tiers};
pub use vocab::cmd_vocab;

/// Vocabulary subcommands.
#[derive(Subcommand)]
pub enum VocabAction {
    /// List learned phrases, least recently confirmed first.
    List {
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Learn phrases from free text.
    Learn {
        /// The text.
        #[arg(required = true)]
        text: Vec<String>,

        /// Origin tag: deep, poi, memory or manual.
        #[arg(short, long, default_value = "deep")]
        origin: String,
    },

    /// Add phrases directly, skipping extraction.
    Add {
        /// The phrases.
        #[arg(required = true)]
        phrases: Vec<String>,

        /// Origin tag: deep, poi, memory or manual.
        #[arg(short, long, default_value = "manual")]
        origin: String,
    },
}
