pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gleaner")]
#[command(about = "Harvest listing data through a scraping API", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Concurrent fetches in flight during fan-out
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walmart.com product listings
    Walmart {
        #[command(subcommand)]
        action: WalmartAction,
    },
    /// Immoscout24.ch property listings
    Immoscout {
        #[command(subcommand)]
        action: ImmoscoutAction,
    },
    /// Re-project harvested JSON documents into one CSV table
    Export {
        /// Directory of harvested JSON documents
        #[arg(short, long)]
        input: PathBuf,

        /// CSV file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Comma-separated field paths; a dot addresses nested keys
        /// (e.g. "id,name,imageInfo.thumbnailUrl")
        #[arg(short, long)]
        fields: String,

        /// Keep only records whose "type" field equals this value
        #[arg(long)]
        item_type: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum WalmartAction {
    /// Harvest all pages of a search query
    Search {
        /// Search query
        query: String,

        /// Sort order: best_match, best_seller, price_low, price_high
        #[arg(short, long, default_value = "best_match")]
        sort: String,

        /// Cap on pages to fetch (the site stops serving at page 25
        /// regardless)
        #[arg(short, long)]
        max_pages: Option<u32>,

        /// Collection name for the output file (defaults to the query)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Fetch product pages directly
    Products {
        /// Product page URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Collection name for the output file
        #[arg(short, long, default_value = "products")]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ImmoscoutAction {
    /// Harvest all pages of a search
    Search {
        /// URL of the search's first result page
        url: String,

        /// Cap on pages to fetch (the site stops serving at page 50
        /// regardless)
        #[arg(short, long)]
        max_pages: Option<u32>,

        /// Collection name for the output file
        #[arg(short, long, default_value = "search")]
        name: String,
    },
    /// Fetch property ads directly
    Properties {
        /// Property ad URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Collection name for the output file
        #[arg(short, long, default_value = "properties")]
        name: String,
    },
}
