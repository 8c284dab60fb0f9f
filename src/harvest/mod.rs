//! Paginated-collection harvesting.
//!
//! Every listing scrape in this crate has the same three-stage shape:
//!
//! ```text
//! Seed fetch (page 1) → Extent discovery (pure) → Bounded fan-out (pages 2..)
//! ```
//!
//! The seed page is fetched alone and parsed for the source's total result
//! count. [`PaginationPlan::pages_needed`] turns that count into the number
//! of pages to collect, clamped by the source's own page ceiling and by an
//! optional caller limit. The remaining ordinals are then fetched as one
//! concurrent batch and flattened into a [`HarvestResult`].
//!
//! The seed count is authoritative: counts reported by later pages are
//! ignored, and the same ordinal is never fetched twice.

use std::sync::Arc;

use serde::Deserialize;

use crate::app::Result;
use crate::domain::{HarvestResult, PageResult, RawItem};
use crate::fetcher::batch::DEFAULT_WORKERS;
use crate::fetcher::{BatchFetcher, FetchRequest, FetchResponse, Fetcher};

/// How fan-out responses are ordered in the final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingPolicy {
    /// Re-sort responses by their page ordinal before flattening, so the
    /// output matches page-request order.
    #[default]
    RequestOrder,
    /// Append pages as their fetches complete. Cheaper, but concurrent
    /// completion makes the output order nondeterministic.
    ArrivalOrder,
}

/// What to do when a fan-out page fails to fetch or parse.
///
/// Seed failures are not covered by this policy: with no seed there is no
/// count to paginate from, so they always abort the harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageFailurePolicy {
    /// Surface the first failure and abort the whole harvest.
    #[default]
    Abort,
    /// Log the failed page at WARN and continue with the rest.
    SkipAndLog,
}

/// Page-count computation for one paginated source.
///
/// `page_size` and `hard_ceiling` are properties of the source itself
/// (items served per page, and the deepest page it will serve regardless
/// of result count). `max_pages` is the caller's optional soft limit.
#[derive(Debug, Clone, Copy)]
pub struct PaginationPlan {
    page_size: u32,
    hard_ceiling: u32,
    max_pages: Option<u32>,
}

impl PaginationPlan {
    pub const fn new(page_size: u32, hard_ceiling: u32) -> Self {
        Self {
            page_size,
            hard_ceiling,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Total pages worth fetching (the seed included) for a reported
    /// result count. Ceiling division, clamped down by the source ceiling
    /// and then by `max_pages`. Never clamps upward; zero items means zero
    /// pages.
    pub fn pages_needed(&self, total_count: u64) -> u32 {
        if total_count == 0 || self.page_size == 0 {
            return 0;
        }
        let raw = total_count.div_ceil(u64::from(self.page_size));
        let mut pages = raw.min(u64::from(self.hard_ceiling)) as u32;
        if let Some(limit) = self.max_pages {
            pages = pages.min(limit);
        }
        pages
    }
}

/// Runs the seed → extent → fan-out pipeline against an injected fetcher.
pub struct Harvester {
    batch: BatchFetcher,
    ordering: OrderingPolicy,
    on_page_failure: PageFailurePolicy,
}

impl Harvester {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self::with_workers(fetcher, DEFAULT_WORKERS)
    }

    pub fn with_workers(fetcher: Arc<dyn Fetcher + Send + Sync>, workers: usize) -> Self {
        Self {
            batch: BatchFetcher::with_workers(fetcher, workers),
            ordering: OrderingPolicy::default(),
            on_page_failure: PageFailurePolicy::default(),
        }
    }

    pub fn ordering(mut self, policy: OrderingPolicy) -> Self {
        self.ordering = policy;
        self
    }

    pub fn on_page_failure(mut self, policy: PageFailurePolicy) -> Self {
        self.on_page_failure = policy;
        self
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher + Send + Sync> {
        self.batch.fetcher()
    }

    /// Harvest one paginated collection.
    ///
    /// `request_for_page` maps a 1-based page ordinal to a request;
    /// `parse_page` turns a response into that page's items and (on the
    /// seed) the total result count. Fan-out covers ordinals
    /// `2..=pages_needed`; ordinal 1 is never requested twice.
    pub async fn harvest<R, P>(
        &self,
        plan: PaginationPlan,
        request_for_page: R,
        parse_page: P,
    ) -> Result<HarvestResult>
    where
        R: Fn(u32) -> Result<FetchRequest>,
        P: Fn(&FetchResponse) -> Result<PageResult>,
    {
        let seed_request = request_for_page(1)?;
        let seed_response = self.batch.fetcher().fetch(&seed_request).await?;
        // A seed that fails to parse is fatal: no count, no pagination.
        let seed = parse_page(&seed_response)?;

        let total_count = seed.total_count.unwrap_or(0);
        let pages_needed = plan.pages_needed(total_count);
        tracing::info!(
            total_count,
            pages_needed,
            seed_items = seed.items.len(),
            "discovered collection extent"
        );

        let mut result = HarvestResult::new();
        result.push_page(seed.items);

        if pages_needed <= 1 {
            return Ok(result);
        }

        let requests = (2..=pages_needed)
            .map(&request_for_page)
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(remaining = requests.len(), "fanning out remaining pages");

        let completed = self.batch.fetch_all(requests).await;

        let mut pages: Vec<(usize, Vec<RawItem>)> = Vec::with_capacity(completed.len());
        for (index, outcome) in completed {
            let ordinal = index as u32 + 2;
            match outcome.and_then(|response| parse_page(&response)) {
                // Per-page counts drift on live datasets; the seed count
                // stays authoritative.
                Ok(page) => pages.push((index, page.items)),
                Err(err) => match self.on_page_failure {
                    PageFailurePolicy::Abort => return Err(err),
                    PageFailurePolicy::SkipAndLog => {
                        tracing::warn!(ordinal, error = %err, "skipping failed page");
                    }
                },
            }
        }

        if self.ordering == OrderingPolicy::RequestOrder {
            pages.sort_by_key(|(index, _)| *index);
        }
        for (_, items) in pages {
            result.push_page(items);
        }

        tracing::info!(items = result.len(), pages = result.page_count(), "harvest complete");
        Ok(result)
    }

    /// Fetch a batch of direct record pages: no extent discovery, no
    /// pagination, one `RawItem` per locator. The ordering and failure
    /// policies apply the same way they do to fan-out pages.
    pub async fn fetch_records<P>(
        &self,
        requests: Vec<FetchRequest>,
        parse_record: P,
    ) -> Result<Vec<RawItem>>
    where
        P: Fn(&FetchResponse) -> Result<RawItem>,
    {
        let completed = self.batch.fetch_all(requests).await;

        let mut records: Vec<(usize, RawItem)> = Vec::with_capacity(completed.len());
        for (index, outcome) in completed {
            match outcome.and_then(|response| parse_record(&response)) {
                Ok(record) => records.push((index, record)),
                Err(err) => match self.on_page_failure {
                    PageFailurePolicy::Abort => return Err(err),
                    PageFailurePolicy::SkipAndLog => {
                        tracing::warn!(index, error = %err, "skipping failed record");
                    }
                },
            }
        }

        if self.ordering == OrderingPolicy::RequestOrder {
            records.sort_by_key(|(index, _)| *index);
        }
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::app::GleanerError;

    const PAGE_SIZE: u32 = 40;
    const CEILING: u32 = 25;

    /// Serves a synthetic collection of `total` numbered items, `PAGE_SIZE`
    /// per page, and records every URL it is asked for.
    struct PagedSource {
        total: u64,
        fetched: Mutex<Vec<String>>,
        delay_page: Option<u32>,
        fail_page: Option<u32>,
    }

    impl PagedSource {
        fn new(total: u64) -> Self {
            Self {
                total,
                fetched: Mutex::new(Vec::new()),
                delay_page: None,
                fail_page: None,
            }
        }

        fn fetched_pages(&self) -> Vec<u32> {
            self.fetched
                .lock()
                .unwrap()
                .iter()
                .map(|u| page_of(u))
                .collect()
        }
    }

    fn page_of(url: &str) -> u32 {
        let parsed = url::Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == "page")
            .unwrap()
            .1
            .parse()
            .unwrap()
    }

    #[async_trait]
    impl Fetcher for PagedSource {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
            self.fetched.lock().unwrap().push(request.url().to_string());
            let page = page_of(request.url());

            if self.fail_page == Some(page) {
                return Err(GleanerError::Fetch {
                    url: request.url().into(),
                    reason: "synthetic failure".into(),
                });
            }
            if self.delay_page == Some(page) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            let start = u64::from(page - 1) * u64::from(PAGE_SIZE) + 1;
            let end = self.total.min(u64::from(page) * u64::from(PAGE_SIZE));
            let items: Vec<u64> = if start <= end { (start..=end).collect() } else { vec![] };
            let body = json!({ "total": self.total, "items": items }).to_string();
            Ok(FetchResponse::new(request.url(), body))
        }
    }

    fn request_for_page(page: u32) -> Result<FetchRequest> {
        FetchRequest::new(format!("https://example.com/search?q=x&page={page}"))
    }

    fn parse_page(response: &FetchResponse) -> Result<PageResult> {
        let value: serde_json::Value = serde_json::from_str(response.text())
            .map_err(|e| GleanerError::Parse(e.to_string()))?;
        let items = value["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| {
                let mut item = RawItem::new();
                item.insert("id".into(), n.clone());
                item
            })
            .collect();
        Ok(PageResult {
            items,
            total_count: value["total"].as_u64(),
        })
    }

    fn plan() -> PaginationPlan {
        PaginationPlan::new(PAGE_SIZE, CEILING)
    }

    fn ids(result: &HarvestResult) -> Vec<u64> {
        result
            .items()
            .iter()
            .map(|i| i["id"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_pages_needed_ceiling_division() {
        let plan = plan();
        for (total, expected) in [
            (0u64, 0u32),
            (1, 1),
            (39, 1),
            (40, 1),
            (41, 2),
            (1000, 25),
            (10_000, 25),
        ] {
            assert_eq!(plan.pages_needed(total), expected, "total_count = {total}");
            assert!(plan.pages_needed(total) <= CEILING);
        }
    }

    #[test]
    fn test_max_pages_binds_only_when_smaller() {
        assert_eq!(plan().with_max_pages(Some(2)).pages_needed(2000), 2);
        assert_eq!(plan().with_max_pages(Some(100)).pages_needed(2000), 25);
        assert_eq!(plan().with_max_pages(Some(10)).pages_needed(85), 3);
        // Never clamps upward.
        assert_eq!(plan().with_max_pages(Some(10)).pages_needed(40), 1);
    }

    #[test]
    fn test_zero_page_size_means_zero_pages() {
        assert_eq!(PaginationPlan::new(0, CEILING).pages_needed(500), 0);
    }

    #[tokio::test]
    async fn test_scenario_a_three_pages() {
        let source = Arc::new(PagedSource::new(85));
        let harvester = Harvester::new(source.clone());

        let result = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap();

        assert_eq!(result.len(), 85);
        assert_eq!(result.page_count(), 3);
        assert_eq!(source.fetched_pages(), vec![1, 2, 3]);
        // Assembly drops nothing and keeps page order.
        assert_eq!(ids(&result), (1..=85).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_scenario_b_hard_ceiling_binds() {
        let source = Arc::new(PagedSource::new(2000));
        let harvester = Harvester::new(source.clone());

        let result = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap();

        let mut fetched = source.fetched_pages();
        fetched.sort_unstable();
        assert_eq!(fetched, (1..=25).collect::<Vec<_>>());
        // Ordinal 1 exactly once, nothing past the ceiling.
        assert_eq!(fetched.iter().filter(|p| **p == 1).count(), 1);
        assert_eq!(result.len(), 25 * PAGE_SIZE as usize);
    }

    #[tokio::test]
    async fn test_scenario_c_caller_limit_binds() {
        let source = Arc::new(PagedSource::new(2000));
        let harvester = Harvester::new(source.clone());

        let result = harvester
            .harvest(plan().with_max_pages(Some(2)), request_for_page, parse_page)
            .await
            .unwrap();

        assert_eq!(source.fetched_pages(), vec![1, 2]);
        assert_eq!(result.len(), 80);
    }

    #[tokio::test]
    async fn test_empty_collection_fetches_seed_only() {
        let source = Arc::new(PagedSource::new(0));
        let harvester = Harvester::new(source.clone());

        let result = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap();

        assert_eq!(source.fetched_pages(), vec![1]);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_request_order_resorts_out_of_order_completions() {
        let mut source = PagedSource::new(120);
        source.delay_page = Some(2);
        let harvester = Harvester::new(Arc::new(source));

        let result = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap();

        // Page 3 completed before page 2, but request order is restored.
        assert_eq!(ids(&result), (1..=120).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_arrival_order_keeps_completion_order() {
        let mut source = PagedSource::new(120);
        source.delay_page = Some(2);
        let harvester = Harvester::new(Arc::new(source)).ordering(OrderingPolicy::ArrivalOrder);

        let result = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap();

        // All items survive, but page 3's block lands before page 2's.
        assert_eq!(result.len(), 120);
        let ids = ids(&result);
        assert_eq!(ids[..40], (1..=40).collect::<Vec<_>>()[..]);
        assert_eq!(ids[40], 81);
    }

    #[tokio::test]
    async fn test_failed_page_aborts_by_default() {
        let mut source = PagedSource::new(120);
        source.fail_page = Some(3);
        let harvester = Harvester::new(Arc::new(source));

        let err = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap_err();
        assert!(matches!(err, GleanerError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_skip_and_log_drops_only_the_failed_page() {
        let mut source = PagedSource::new(120);
        source.fail_page = Some(2);
        let harvester =
            Harvester::new(Arc::new(source)).on_page_failure(PageFailurePolicy::SkipAndLog);

        let result = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap();

        assert_eq!(result.len(), 80);
        assert_eq!(result.page_count(), 2);
        assert_eq!(ids(&result)[40], 81);
    }

    #[tokio::test]
    async fn test_seed_fetch_failure_is_fatal_even_when_skipping() {
        let mut source = PagedSource::new(120);
        source.fail_page = Some(1);
        let harvester =
            Harvester::new(Arc::new(source)).on_page_failure(PageFailurePolicy::SkipAndLog);

        let err = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap_err();
        assert!(matches!(err, GleanerError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_seed_parse_failure_is_fatal() {
        struct Garbage;

        #[async_trait]
        impl Fetcher for Garbage {
            async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
                Ok(FetchResponse::new(request.url(), "<html>no data</html>"))
            }
        }

        let harvester =
            Harvester::new(Arc::new(Garbage)).on_page_failure(PageFailurePolicy::SkipAndLog);
        let err = harvester
            .harvest(plan(), request_for_page, parse_page)
            .await
            .unwrap_err();
        assert!(matches!(err, GleanerError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_records_single_record_no_pagination() {
        let source = Arc::new(PagedSource::new(40));
        let harvester = Harvester::new(source.clone());

        let records = harvester
            .fetch_records(
                vec![request_for_page(1).unwrap()],
                |response| {
                    let page = parse_page(response)?;
                    let mut record = RawItem::new();
                    record.insert("first_id".into(), page.items[0]["id"].clone());
                    Ok(record)
                },
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["first_id"], json!(1));
        // Exactly one fetch: no extent discovery, no fan-out.
        assert_eq!(source.fetched_pages(), vec![1]);
    }
}
