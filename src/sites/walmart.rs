//! Walmart.com product search and product pages.
//!
//! Search pages and product pages are Next.js renders: all listing data
//! sits in the `__NEXT_DATA__` script tag. Search pagination serves 40
//! items per page and stops at page 25 no matter how many results the
//! query has.

use std::str::FromStr;

use url::Url;

use crate::app::{GleanerError, Result};
use crate::config::FetchConfig;
use crate::domain::{HarvestResult, PageResult, RawItem};
use crate::extract;
use crate::fetcher::{FetchRequest, FetchResponse};
use crate::harvest::{Harvester, PaginationPlan};
use crate::project;

pub const SEARCH_PAGE_SIZE: u32 = 40;
pub const SEARCH_PAGE_CEILING: u32 = 25;

const SEARCH_ENDPOINT: &str = "https://www.walmart.com/search";

/// Keys kept from each search listing; everything else (private meta
/// keywords included) is dropped.
pub const SEARCH_ITEM_FIELDS: [&str; 11] = [
    "id",
    "usItemId",
    "name",
    "type",
    "imageInfo",
    "canonicalUrl",
    "salesUnitType",
    "sellerId",
    "sellerName",
    "averageRating",
    "numberOfReviews",
];

/// Keys kept from a product page's product payload.
pub const PRODUCT_FIELDS: [&str; 9] = [
    "averageRating",
    "brand",
    "id",
    "imageInfo",
    "manufacturerName",
    "name",
    "priceInfo",
    "shortDescription",
    "type",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    BestMatch,
    BestSeller,
    PriceLow,
    PriceHigh,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestMatch => "best_match",
            Self::BestSeller => "best_seller",
            Self::PriceLow => "price_low",
            Self::PriceHigh => "price_high",
        }
    }
}

impl FromStr for SortOrder {
    type Err = GleanerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "best_match" => Ok(Self::BestMatch),
            "best_seller" => Ok(Self::BestSeller),
            "price_low" => Ok(Self::PriceLow),
            "price_high" => Ok(Self::PriceHigh),
            other => Err(GleanerError::InvalidInput(format!(
                "unknown sort order {other:?} (best_match, best_seller, price_low, price_high)"
            ))),
        }
    }
}

pub fn search_url(query: &str, sort: SortOrder, page: u32) -> Result<String> {
    let page = page.to_string();
    let url = Url::parse_with_params(
        SEARCH_ENDPOINT,
        [
            ("q", query),
            ("sort", sort.as_str()),
            ("page", page.as_str()),
            ("affinityOverride", "default"),
        ],
    )?;
    Ok(url.into())
}

/// Request for one search page. Walmart only needs a JS render for the
/// first page; deeper ordinals serve their data statically.
pub fn search_request(
    config: &FetchConfig,
    query: &str,
    sort: SortOrder,
    page: u32,
) -> Result<FetchRequest> {
    if query.trim().is_empty() {
        return Err(GleanerError::InvalidInput("empty search query".into()));
    }
    let request = FetchRequest::new(search_url(query, sort, page)?)?.render_js(page == 1);
    Ok(config.apply(request))
}

/// Refined listing data out of a search page.
///
/// An absent item stack (no results, interstitial pages) is an empty page,
/// not an error.
pub fn parse_search(response: &FetchResponse) -> Result<PageResult> {
    let html = response.html();
    let data = extract::script_json(&html, "script#__NEXT_DATA__")?;

    let stacks = &data["props"]["pageProps"]["initialData"]["searchResult"]["itemStacks"];
    let Some(stack) = stacks.as_array().and_then(|stacks| stacks.first()) else {
        return Ok(PageResult::empty());
    };

    let total_count = stack["count"].as_u64();
    let items = stack["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect()
        })
        .unwrap_or_default();

    Ok(PageResult { items, total_count })
}

/// Product data from a product page: the whitelisted product payload plus
/// its raw reviews block.
pub fn parse_product(response: &FetchResponse) -> Result<RawItem> {
    let html = response.html();
    let data = extract::script_json(&html, "script#__NEXT_DATA__")?;

    let payload = &data["props"]["pageProps"]["initialData"]["data"];
    let product = payload["product"].as_object().ok_or_else(|| {
        GleanerError::Parse(format!("no product payload in {}", response.url()))
    })?;

    let mut record = RawItem::new();
    record.insert(
        "product".into(),
        serde_json::Value::Object(project::whitelist(product, &PRODUCT_FIELDS)),
    );
    record.insert("reviews".into(), payload["reviews"].clone());
    Ok(record)
}

/// Harvest every page of one search query, items narrowed to
/// [`SEARCH_ITEM_FIELDS`].
pub async fn scrape_search(
    harvester: &Harvester,
    config: &FetchConfig,
    query: &str,
    sort: SortOrder,
    max_pages: Option<u32>,
) -> Result<HarvestResult> {
    tracing::info!(query, sort = sort.as_str(), "scraping walmart search");

    let plan = PaginationPlan::new(SEARCH_PAGE_SIZE, SEARCH_PAGE_CEILING).with_max_pages(max_pages);
    harvester
        .harvest(
            plan,
            |page| search_request(config, query, sort, page),
            |response| {
                let page = parse_search(response)?;
                Ok(PageResult {
                    items: page
                        .items
                        .iter()
                        .map(|item| project::whitelist(item, &SEARCH_ITEM_FIELDS))
                        .collect(),
                    total_count: page.total_count,
                })
            },
        )
        .await
}

/// Fetch product pages directly: one record per URL, no pagination.
pub async fn scrape_products(
    harvester: &Harvester,
    config: &FetchConfig,
    urls: &[String],
) -> Result<Vec<RawItem>> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }
    tracing::info!(count = urls.len(), "scraping walmart product pages");

    let requests = urls
        .iter()
        .map(|url| Ok(config.apply(FetchRequest::new(url)?)))
        .collect::<Result<Vec<_>>>()?;
    harvester.fetch_records(requests, parse_product).await
}
