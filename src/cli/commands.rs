use std::path::Path;
use std::str::FromStr;

use serde_json::Value;

use crate::app::{AppContext, Result};
use crate::domain::RawItem;
use crate::project::{self, FieldSpec};
use crate::sites::{immoscout, walmart};
use crate::store;

pub async fn walmart_search(
    ctx: &AppContext,
    query: &str,
    sort: &str,
    max_pages: Option<u32>,
    name: Option<&str>,
) -> Result<()> {
    let sort = walmart::SortOrder::from_str(sort)?;
    let max_pages = max_pages.or(ctx.config.harvest.max_pages);

    let result =
        walmart::scrape_search(&ctx.harvester, &ctx.config.fetch, query, sort, max_pages).await?;

    let path = store::write_json(&ctx.config.output.dir, name.unwrap_or(query), &result)?;
    println!(
        "Harvested {} listings across {} pages -> {}",
        result.len(),
        result.page_count(),
        path.display()
    );
    Ok(())
}

pub async fn walmart_products(ctx: &AppContext, urls: &[String], name: &str) -> Result<()> {
    let records = walmart::scrape_products(&ctx.harvester, &ctx.config.fetch, urls).await?;

    let path = store::write_json(&ctx.config.output.dir, name, &records)?;
    println!("Fetched {} product pages -> {}", records.len(), path.display());
    Ok(())
}

pub async fn immoscout_search(
    ctx: &AppContext,
    url: &str,
    max_pages: Option<u32>,
    name: &str,
) -> Result<()> {
    let max_pages = max_pages.or(ctx.config.harvest.max_pages);

    let result =
        immoscout::scrape_search(&ctx.harvester, &ctx.config.fetch, url, max_pages).await?;

    let path = store::write_json(&ctx.config.output.dir, name, &result)?;
    println!(
        "Harvested {} listings across {} pages -> {}",
        result.len(),
        result.page_count(),
        path.display()
    );
    Ok(())
}

pub async fn immoscout_properties(ctx: &AppContext, urls: &[String], name: &str) -> Result<()> {
    let records = immoscout::scrape_properties(&ctx.harvester, &ctx.config.fetch, urls).await?;

    let path = store::write_json(&ctx.config.output.dir, name, &records)?;
    println!("Fetched {} property ads -> {}", records.len(), path.display());
    Ok(())
}

/// Sweep a directory of harvested JSON documents into one CSV table.
///
/// Each document contributes its file stem as a `category` column. Records
/// missing any requested field, or not matching `item_type` when one is
/// given, are skipped.
pub fn export(
    input: &Path,
    output: &Path,
    fields: &str,
    item_type: Option<&str>,
) -> Result<()> {
    let spec = FieldSpec::parse(fields)?;
    let collections = store::read_json_dir(input)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (category, items) in &collections {
        for item in items {
            if !record_passes(item, &spec, item_type) {
                skipped += 1;
                continue;
            }
            let mut record = project::flatten(item, &spec);
            record.insert("category".into(), Value::String(category.clone()));
            rows.push(record);
        }
    }

    let header = FieldSpec::new(
        spec.paths()
            .iter()
            .cloned()
            .chain(std::iter::once("category".to_string())),
    )?;
    store::write_csv(output, &rows, &header)?;

    println!(
        "Wrote {} rows from {} documents -> {} ({} records skipped)",
        rows.len(),
        collections.len(),
        output.display(),
        skipped
    );
    Ok(())
}

/// A record is exportable when its `type` matches the requested one (if
/// any) and every requested field resolves to a non-empty value.
fn record_passes(item: &RawItem, spec: &FieldSpec, item_type: Option<&str>) -> bool {
    if let Some(required) = item_type {
        if item.get("type").and_then(|v| v.as_str()) != Some(required) {
            return false;
        }
    }
    spec.paths().iter().all(|path| {
        match project::lookup(item, path) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.is_empty(),
            Some(_) => true,
        }
    })
}
