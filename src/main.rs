use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gleaner::app::AppContext;
use gleaner::cli::{commands, Cli, Commands, ImmoscoutAction, WalmartAction};
use gleaner::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }

    match cli.command {
        Commands::Walmart { action } => {
            let ctx = AppContext::new(config)?;
            match action {
                WalmartAction::Search {
                    query,
                    sort,
                    max_pages,
                    name,
                } => {
                    commands::walmart_search(&ctx, &query, &sort, max_pages, name.as_deref())
                        .await?;
                }
                WalmartAction::Products { urls, name } => {
                    commands::walmart_products(&ctx, &urls, &name).await?;
                }
            }
        }
        Commands::Immoscout { action } => {
            let ctx = AppContext::new(config)?;
            match action {
                ImmoscoutAction::Search {
                    url,
                    max_pages,
                    name,
                } => {
                    commands::immoscout_search(&ctx, &url, max_pages, &name).await?;
                }
                ImmoscoutAction::Properties { urls, name } => {
                    commands::immoscout_properties(&ctx, &urls, &name).await?;
                }
            }
        }
        Commands::Export {
            input,
            output,
            fields,
            item_type,
        } => {
            commands::export(&input, &output, &fields, item_type.as_deref())?;
        }
    }

    Ok(())
}
