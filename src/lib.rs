//! # Gleaner
//!
//! Harvests real-estate and retail listing collections through a
//! third-party scraping API and persists them as JSON/CSV files.
//!
//! ## Architecture
//!
//! Every listing scrape runs the same pipeline:
//!
//! ```text
//! Fetcher → Harvester → Projection → Store
//! ```
//!
//! - [`fetcher`]: scraping-API client plus a bounded concurrent batch
//!   primitive
//! - [`harvest`]: seed fetch, extent discovery, bounded fan-out
//! - [`project`]: narrowing raw records to declared field sets
//! - [`store`]: JSON documents and CSV tables on disk
//!
//! ## Quick Start
//!
//! ```bash
//! # Harvest a walmart search, two pages deep
//! gleaner walmart search "instant noodles" --sort best_seller --max-pages 2
//!
//! # Fetch property ads directly
//! gleaner immoscout properties https://www.immoscout24.ch/rent/4001637147
//!
//! # Re-project harvested documents into one CSV
//! gleaner export -i results -o output.csv \
//!     -f id,name,imageInfo.thumbnailUrl --item-type REGULAR
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together configuration, the
/// injected fetch client, and the harvester.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/gleaner/config.toml`.
pub mod config;

/// Core data shapes: raw items, page results, harvest results.
pub mod domain;

/// Extraction of JSON blobs and attributes embedded in fetched pages.
pub mod extract;

/// Fetching through the scraping API.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait the pipelines depend on
/// - [`ScrapflyFetcher`](fetcher::ScrapflyFetcher): reqwest-based client
/// - [`BatchFetcher`](fetcher::BatchFetcher): semaphore-bounded batches
pub mod fetcher;

/// The paginated-collection harvesting core: seed fetch, extent
/// discovery, bounded fan-out, result assembly.
pub mod harvest;

/// Field projection: whitelists and dotted-path flattening.
pub mod project;

/// Site-specific pipelines (walmart.com, immoscout24.ch).
pub mod sites;

/// Persistence: JSON documents per collection, CSV export.
pub mod store;
