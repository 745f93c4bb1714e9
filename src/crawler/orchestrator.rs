//! Bounded-concurrency fetch orchestrator
//!
//! One task is spawned per page. A task must hold one of K permits while its
//! page is being fetched and gives the permit back as soon as the body is in
//! hand; processing the body (including any nested asset downloads) runs
//! outside the limit. The run completes when every task has completed, or
//! fails with the first task error.

use crate::config::{Config, ProgressMode};
use crate::crawler::progress::ProgressReporter;
use crate::fetch::Dispatcher;
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Drives page fetches under a concurrency cap with progress reporting
pub struct Orchestrator {
    dispatcher: Arc<Dispatcher>,
    limiter: Arc<Semaphore>,
    progress_mode: ProgressMode,
    progress_interval: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator allowing `max_concurrent` fetches at once
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        max_concurrent: usize,
        progress_mode: ProgressMode,
        progress_interval: Duration,
    ) -> Self {
        Self {
            dispatcher,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            progress_mode,
            progress_interval,
        }
    }

    /// Creates an orchestrator from the crawler configuration
    pub fn from_config(dispatcher: Arc<Dispatcher>, config: &Config) -> Self {
        Self::new(
            dispatcher,
            config.crawler.max_concurrent_pages as usize,
            config.crawler.progress,
            Duration::from_millis(config.crawler.progress_interval_ms),
        )
    }

    /// Fetches every page as text through the dispatcher and hands each body
    /// to `process`
    ///
    /// Results are returned in the order of `pages`.
    pub async fn run<P, PFut, T>(&self, pages: Vec<Url>, process: P) -> Result<Vec<T>>
    where
        P: Fn(Url, String) -> PFut + Send + Sync + 'static,
        PFut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let dispatcher = self.dispatcher.clone();
        let fetch = move |url: Url| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.text(&url).await }
        };

        self.run_with(pages, fetch, process).await
    }

    /// Like [`run`](Self::run), with a custom throttled fetch step
    pub async fn run_with<F, FFut, B, P, PFut, T>(
        &self,
        pages: Vec<Url>,
        fetch: F,
        process: P,
    ) -> Result<Vec<T>>
    where
        F: Fn(Url) -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<B>> + Send + 'static,
        B: Send + 'static,
        P: Fn(Url, B) -> PFut + Send + Sync + 'static,
        PFut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let total = pages.len();
        let fetch = Arc::new(fetch);
        let process = Arc::new(process);
        let mut tasks = JoinSet::new();

        tracing::info!(
            "Fetching {} page(s) with up to {} in flight",
            total,
            self.limiter.available_permits()
        );

        for (index, url) in pages.into_iter().enumerate() {
            let limiter = self.limiter.clone();
            let fetch = fetch.clone();
            let process = process.clone();

            tasks.spawn(async move {
                let body = {
                    let _permit = limiter.acquire_owned().await?;
                    (*fetch)(url.clone()).await?
                };
                let value = (*process)(url, body).await?;
                Ok::<_, crate::HarvestError>((index, value))
            });
        }

        let mut progress =
            ProgressReporter::new(self.progress_mode, total as u64, self.progress_interval);
        let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(crate::HarvestError::from).and_then(|r| r);

            match outcome {
                Ok((index, value)) => {
                    results[index] = Some(value);
                    progress.complete_one();
                }
                Err(e) => {
                    tasks.abort_all();
                    progress.finish();
                    return Err(e);
                }
            }
        }

        progress.finish();
        Ok(results.into_iter().flatten().collect())
    }
}
