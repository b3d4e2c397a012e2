//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shelf_core::ProductId;

use crate::config::Overrides;

/// Shelf - product catalog with full-text search
#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "SHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Product database URL (`sqlite://...` or `memory`)
    #[arg(long, env = "SHELF_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Directory holding the search index
    #[arg(long, env = "SHELF_INDEX_PATH", global = true)]
    pub index_path: Option<PathBuf>,

    /// Analysis settings file for the search index
    #[arg(long, env = "SHELF_INDEX_SETTINGS", global = true)]
    pub index_settings: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long, env = "SHELF_BIND", global = true)]
    pub bind: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Configuration overrides given on the command line.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            database_url: self.database_url.clone(),
            index_path: self.index_path.clone(),
            index_settings: self.index_settings.clone(),
            bind: self.bind.clone(),
        }
    }
}

/// Shelf subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the catalog over HTTP
    Serve,

    /// List products by id
    List {
        /// Page number, from 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Products per page
        #[arg(long, default_value_t = 10)]
        size: usize,
    },

    /// Create a product
    Create {
        /// Product name
        #[arg(long)]
        name: String,
        /// Product description
        #[arg(long)]
        description: Option<String>,
        /// Price in minor units
        #[arg(long)]
        price: i64,
        /// Rating between 0 and 5
        #[arg(long)]
        rating: Option<f64>,
        /// Category label
        #[arg(long, default_value = "")]
        category: String,
    },

    /// Delete a product
    Delete {
        /// Product id
        id: ProductId,
    },

    /// Suggest product names for a prefix
    Suggest {
        /// Text typed so far
        query: String,
    },

    /// Search products
    Search {
        /// Search text
        query: String,
        /// Exact category
        #[arg(long, default_value = "")]
        category: String,
        /// Lowest price, inclusive
        #[arg(long, default_value_t = 0.0)]
        min_price: f64,
        /// Highest price, inclusive
        #[arg(long, default_value_t = f64::MAX)]
        max_price: f64,
        /// Page number, from 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Results per page
        #[arg(long, default_value_t = 10)]
        size: usize,
    },

    /// Rebuild the search index from the product database
    Reindex {
        /// Products read per batch
        #[arg(long, default_value_t = 500)]
        batch_size: usize,
    },

    /// Print the resolved configuration
    Config,
}

// ============================================================================
// Tests
// ============================================================================
