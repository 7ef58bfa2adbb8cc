use clap::{Parser, Subcommand};

use crate::models::DuplicatePolicy;

#[derive(Parser, Debug)]
#[command(name = "catalog-ingestion")]
#[command(about = "Technology catalog ingestion service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the GraphQL server (default)
    Serve,
    /// Import one batch from a JSON array, `{items, config}` object or JSON Lines file (path or URL)
    Import {
        source: String,
        /// Category label (zh or en)
        #[arg(long)]
        category: Option<String>,
        /// Subcategory label (zh or en)
        #[arg(long)]
        subcategory: Option<String>,
        #[arg(long)]
        category_id: Option<String>,
        #[arg(long)]
        subcategory_id: Option<String>,
        /// skip | overwrite
        #[arg(long)]
        on_duplicate: Option<DuplicatePolicy>,
        /// Run against an in-memory catalog seeded with the requested taxonomy; nothing is persisted
        #[arg(long)]
        dry_run: bool,
    },
    /// Create collection indexes
    Migrate,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}
