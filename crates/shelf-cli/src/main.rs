//! Shelf CLI
//!
//! Product catalog administration and HTTP server.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use shelf::{CatalogService, SearchRequest};
use shelf_cli::cli::{Args, Command};
use shelf_cli::commands;
use shelf_cli::config::ShelfConfig;
use shelf_core::NewProduct;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,shelf=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ShelfConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(args.overrides());

    match args.command {
        Command::Config => commands::show_config(&config)?,
        Command::Serve => {
            let service = open(&config).await?;
            shelf_cli::http::serve(&config.server, service).await?;
        }
        Command::List { page, size } => commands::list(&open(&config).await?, page, size).await?,
        Command::Create {
            name,
            description,
            price,
            rating,
            category,
        } => {
            let new = NewProduct {
                name,
                description,
                price,
                rating,
                category,
            };
            commands::create(&open(&config).await?, new).await?;
        }
        Command::Delete { id } => commands::delete(&open(&config).await?, id).await?,
        Command::Suggest { query } => commands::suggest(&open(&config).await?, &query).await?,
        Command::Search {
            query,
            category,
            min_price,
            max_price,
            page,
            size,
        } => {
            let request = SearchRequest::new(query)
                .category(category)
                .price_between(min_price, max_price)
                .page(page, size);
            commands::search(&open(&config).await?, &request).await?;
        }
        Command::Reindex { batch_size } => {
            commands::reindex(&open(&config).await?, batch_size).await?;
        }
    }

    Ok(())
}

/// Open the store and the search index.
async fn open(config: &ShelfConfig) -> Result<CatalogService> {
    commands::open_service(config)
        .await
        .context("Failed to open the catalog")
}
