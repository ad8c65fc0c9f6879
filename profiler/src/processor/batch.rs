use super::plan::{build_sub_requests, demultiplex};
use crate::client::OrgClient;
use crate::models::{BatchDetail, ResultEntry};
use common::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entries of one run plus its call accounting.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub entries: Vec<ResultEntry>,
    /// Query-plan calls completed, failed ones included.
    pub completed: usize,
    /// Query-plan calls expected (filterable details).
    pub total: usize,
    /// Composite requests issued.
    pub batches: usize,
}

impl RunOutcome {
    pub fn summary_line(&self) -> String {
        if self.total > 0 {
            format!("Completed {}/{} API calls.", self.completed, self.total)
        } else {
            "Completed with skipped fields only.".to_string()
        }
    }
}

/// Runs query-plan calls for a list of details, `batch_size` per composite
/// request, one request at a time.
pub struct BatchOrchestrator {
    client: Arc<dyn OrgClient>,
    api_version: String,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn OrgClient>, api_version: &str) -> Self {
        Self {
            client,
            api_version: api_version.to_string(),
        }
    }

    /// Produces exactly one entry per detail. Skipped details come first, in
    /// input order, followed by dispatched details in input order.
    ///
    /// `on_progress(completed, total)` fires after every chunk, whether the
    /// composite call succeeded or not. A failed composite call turns every
    /// member of its chunk into an error entry and the run moves on.
    pub async fn run<F>(
        &self,
        details: &[BatchDetail],
        batch_size: usize,
        mut on_progress: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(usize, usize) + Send,
    {
        if batch_size == 0 {
            return Err(Error::InvalidInput("batch size must be at least 1".to_string()));
        }

        let mut entries = Vec::with_capacity(details.len());
        let mut requestable = Vec::new();
        for detail in details {
            match detail.skip_reason() {
                Some(reason) => entries.push(ResultEntry::skipped(detail, reason)),
                None => requestable.push(detail),
            }
        }

        let total = requestable.len();
        let mut completed = 0;
        let mut batches = 0;
        info!(
            details = details.len(),
            skipped = details.len() - total,
            total,
            batch_size,
            "Starting query plan run"
        );

        for (index, chunk) in requestable.chunks(batch_size).enumerate() {
            let requests = build_sub_requests(&self.api_version, chunk);
            batches += 1;

            match self.client.composite(&requests).await {
                Ok(responses) => {
                    debug!(batch = index, responses = responses.len(), "Composite batch returned");
                    entries.extend(demultiplex(chunk, responses));
                }
                Err(e) => {
                    warn!(batch = index, error = %e, "Composite batch failed");
                    let message = e.user_message();
                    entries.extend(chunk.iter().map(|detail| ResultEntry::failed(detail, &message)));
                }
            }

            completed += chunk.len();
            on_progress(completed, total);
        }

        let outcome = RunOutcome {
            entries,
            completed,
            total,
            batches,
        };
        info!(batches, "{}", outcome.summary_line());
        Ok(outcome)
    }
}
