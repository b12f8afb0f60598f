//! Sequential endpoint walking shared by the discovery and geo-API tiers

use crate::budget::{Attempt, AttemptBudget};
use crate::deadline::until_cancelled;
use crate::endpoints;
use crate::error::{Error, Result};
use crate::traits::{HttpRequest, HttpResponse, HttpTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Walks a shuffled endpoint list one request at a time
///
/// Stops at the first endpoint whose response `accept` turns into a value.
/// Every per-endpoint error is logged at debug level and swallowed.
#[derive(Clone)]
pub(crate) struct SequentialTier {
    name: &'static str,
    transport: Arc<dyn HttpTransport>,
    grace_attempts: usize,
    grace_timeout: Duration,
}

impl SequentialTier {
    pub(crate) fn new(
        name: &'static str,
        transport: Arc<dyn HttpTransport>,
        grace_attempts: usize,
        grace_timeout: Duration,
    ) -> Self {
        Self {
            name,
            transport,
            grace_attempts,
            grace_timeout,
        }
    }

    /// Try endpoints in random order until one is accepted
    ///
    /// # Parameters
    ///
    /// - `endpoints`: full list; shuffled per call
    /// - `cancel`: the caller's deadline
    /// - `request_for`: builds the request for one endpoint
    /// - `accept`: turns a response into a value or a soft failure
    ///
    /// # Returns
    ///
    /// The first accepted value, or `None` once the list or the grace
    /// budget is exhausted
    pub(crate) async fn first_success<T>(
        &self,
        endpoints: &[String],
        cancel: &CancellationToken,
        request_for: impl Fn(&str) -> HttpRequest,
        mut accept: impl FnMut(&str, HttpResponse) -> Result<T>,
    ) -> Option<T> {
        let mut budget = AttemptBudget::new(self.grace_attempts);

        for url in endpoints::shuffled(endpoints) {
            let Some(attempt) = budget.next(cancel.is_cancelled()) else {
                debug!(
                    "{}: deadline passed and {} grace attempts used, giving up",
                    self.name,
                    budget.grace_used()
                );
                return None;
            };

            let outcome = self
                .fetch(request_for(&url), attempt, cancel)
                .await
                .and_then(|response| accept(&url, response));

            match outcome {
                Ok(value) => {
                    debug!("{}: {} answered ({:?} attempt)", self.name, url, attempt);
                    return Some(value);
                }
                Err(e) => debug!("{}: {} skipped: {}", self.name, url, e),
            }
        }

        debug!("{}: all {} endpoints tried", self.name, budget.attempts());
        None
    }

    async fn fetch(
        &self,
        request: HttpRequest,
        attempt: Attempt,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let url = request.url.clone();

        match attempt {
            Attempt::Normal => until_cancelled(cancel, self.transport.execute(request))
                .await
                .unwrap_or_else(|| Err(Error::soft_failure(url, "abandoned at deadline"))),
            Attempt::Grace => {
                let request = request.with_timeout(self.grace_timeout);
                tokio::time::timeout(self.grace_timeout, self.transport.execute(request))
                    .await
                    .unwrap_or_else(|_| Err(Error::soft_failure(url, "grace attempt timed out")))
            }
        }
    }
}

/// Only a plain 200 counts; everything else is a soft failure
pub(crate) fn require_ok(url: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.status == 200 {
        Ok(response)
    } else {
        Err(Error::soft_failure(url, format!("status {}", response.status)))
    }
}
