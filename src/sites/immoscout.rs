//! Immoscout24.ch property search and property ads.
//!
//! Listing data is embedded in the pages' `__NEXT_DATA__` payload. Search
//! result pages carry a `resultCount` plus 20 listings per page and are
//! paginated with a `pn` query parameter; the site stops serving past
//! page 50.

use url::Url;

use crate::app::{GleanerError, Result};
use crate::config::FetchConfig;
use crate::domain::{HarvestResult, PageResult, RawItem};
use crate::extract;
use crate::fetcher::{FetchRequest, FetchResponse};
use crate::harvest::{Harvester, PaginationPlan};
use crate::project;

pub const SEARCH_PAGE_SIZE: u32 = 20;
pub const SEARCH_PAGE_CEILING: u32 = 50;

/// Keys kept from each search listing.
pub const LISTING_FIELDS: [&str; 10] = [
    "id",
    "title",
    "street",
    "zip",
    "cityName",
    "price",
    "currency",
    "numberOfRooms",
    "surfaceLiving",
    "propertyUrl",
];

/// URL of one search result page: the caller's search URL with the `pn`
/// parameter set. Page 1 is the canonical URL itself, without `pn`.
pub fn search_page_url(search_url: &str, page: u32) -> Result<String> {
    let parsed = Url::parse(search_url)
        .map_err(|e| GleanerError::InvalidInput(format!("malformed search URL: {e}")))?;

    if page <= 1 {
        return Ok(parsed.into());
    }

    let mut paged = parsed.clone();
    {
        let retained: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| key != "pn")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        let mut query = paged.query_pairs_mut();
        query.clear();
        for (key, value) in &retained {
            query.append_pair(key, value);
        }
        query.append_pair("pn", &page.to_string());
    }
    Ok(paged.into())
}

pub fn search_request(config: &FetchConfig, search_url: &str, page: u32) -> Result<FetchRequest> {
    let request = FetchRequest::new(search_page_url(search_url, page)?)?;
    Ok(config.apply(request))
}

/// Listing data out of a search result page.
pub fn parse_search(response: &FetchResponse) -> Result<PageResult> {
    let html = response.html();
    let data = extract::script_json(&html, "script#__NEXT_DATA__")?;

    let search = &data["props"]["pageProps"]["searchResult"];
    if search.is_null() {
        return Err(GleanerError::Parse(format!(
            "no search result payload in {}",
            response.url()
        )));
    }

    let total_count = search["resultCount"].as_u64();
    let items = search["listings"]
        .as_array()
        .map(|listings| {
            listings
                .iter()
                .filter_map(|listing| listing.as_object().cloned())
                .collect()
        })
        .unwrap_or_default();

    Ok(PageResult { items, total_count })
}

/// The full ad payload out of a property detail page.
pub fn parse_property(response: &FetchResponse) -> Result<RawItem> {
    let html = response.html();
    let data = extract::script_json(&html, "script#__NEXT_DATA__")?;

    data["props"]["pageProps"]["listing"]
        .as_object()
        .cloned()
        .ok_or_else(|| {
            GleanerError::Parse(format!("no listing payload in {}", response.url()))
        })
}

/// Harvest every page of one property search, listings narrowed to
/// [`LISTING_FIELDS`].
pub async fn scrape_search(
    harvester: &Harvester,
    config: &FetchConfig,
    search_url: &str,
    max_pages: Option<u32>,
) -> Result<HarvestResult> {
    tracing::info!(url = search_url, "scraping immoscout search");

    let plan = PaginationPlan::new(SEARCH_PAGE_SIZE, SEARCH_PAGE_CEILING).with_max_pages(max_pages);
    harvester
        .harvest(
            plan,
            |page| search_request(config, search_url, page),
            |response| {
                let page = parse_search(response)?;
                Ok(PageResult {
                    items: page
                        .items
                        .iter()
                        .map(|listing| project::whitelist(listing, &LISTING_FIELDS))
                        .collect(),
                    total_count: page.total_count,
                })
            },
        )
        .await
}

/// Fetch property ads directly: one record per URL, no pagination.
pub async fn scrape_properties(
    harvester: &Harvester,
    config: &FetchConfig,
    urls: &[String],
) -> Result<Vec<RawItem>> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }
    tracing::info!(count = urls.len(), "scraping immoscout property pages");

    let requests = urls
        .iter()
        .map(|url| Ok(config.apply(FetchRequest::new(url)?)))
        .collect::<Result<Vec<_>>>()?;
    harvester.fetch_records(requests, parse_property).await
}
