use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::app::Result;
use crate::fetcher::{FetchRequest, FetchResponse, Fetcher};

pub const DEFAULT_WORKERS: usize = 10;

/// The bulk concurrent-fetch primitive: issues a batch of requests through
/// one shared fetcher, at most `workers` in flight at a time.
///
/// Results come back in completion order, each tagged with the index of its
/// request in the submitted batch. Callers that need submission order sort
/// by the tag.
pub struct BatchFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    semaphore: Arc<Semaphore>,
}

impl BatchFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self::with_workers(fetcher, DEFAULT_WORKERS)
    }

    pub fn with_workers(fetcher: Arc<dyn Fetcher + Send + Sync>, workers: usize) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher + Send + Sync> {
        &self.fetcher
    }

    pub async fn fetch_all(
        &self,
        requests: Vec<FetchRequest>,
    ) -> Vec<(usize, Result<FetchResponse>)> {
        let mut in_flight = FuturesUnordered::new();

        for (index, request) in requests.into_iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();

            in_flight.push(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                let result = fetcher.fetch(&request).await;
                (index, result)
            });
        }

        let mut results = Vec::with_capacity(in_flight.len());
        while let Some(completed) = in_flight.next().await {
            results.push(completed);
        }
        results
    }
}
