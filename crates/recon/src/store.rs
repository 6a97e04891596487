//! Result store: the read model for the current batch.
//!
//! Every write produces a new immutable [`Snapshot`] that is swapped in and
//! broadcast through a `tokio::sync::watch` channel. Readers clone the `Arc`
//! and never block on a writer.
//!
//! Runs take a [`RunTicket`] before computing. Publishing checks the ticket
//! under the writer lock; a ticket older than the newest `begin_run` (or a
//! `clear`) is discarded without touching the snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::ReconError;
use crate::model::{Batch, Page, ReconciliationResult, SummaryStats};
use crate::query::{apply_filter, paginate, paginate_filtered, PageRequest, ResultFilter};
use crate::summary::compute_summary;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One published state of the store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Bumped on every publish, filter change and clear.
    pub version: u64,
    /// Bumped only when the batch is replaced or cleared.
    pub batch_id: u64,
    pub batch: Arc<Batch>,
    pub filter: ResultFilter,
    /// Summary over the filtered subsequence.
    pub summary: SummaryStats,
}

impl Snapshot {
    pub fn results(&self) -> &[ReconciliationResult] {
        &self.batch.results
    }

    pub fn total_records(&self) -> usize {
        self.batch.total_records()
    }

    pub fn filtered(&self) -> impl Iterator<Item = &ReconciliationResult> + '_ {
        apply_filter(&self.batch.results, &self.filter)
    }

    /// Page over the full, unfiltered sequence.
    pub fn page(&self, request: PageRequest) -> Page<ReconciliationResult> {
        paginate(self.batch.results.iter(), request)
    }

    /// Page over the rows matching the active filter.
    pub fn filtered_page(&self, request: PageRequest) -> Page<ReconciliationResult> {
        paginate_filtered(&self.batch.results, &self.filter, request)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket(u64);

#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Published(Arc<Snapshot>),
    /// A newer run or a clear happened after this ticket was taken.
    Discarded,
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

pub struct ResultStore {
    tx: watch::Sender<Arc<Snapshot>>,
    writer: Mutex<()>,
    latest_run: AtomicU64,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            tx,
            writer: Mutex::new(()),
            latest_run: AtomicU64::new(0),
        }
    }

    /// Current snapshot. Never blocks on a writer.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Start a run. Any ticket taken earlier becomes stale.
    pub fn begin_run(&self) -> RunTicket {
        RunTicket(self.latest_run.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replace the batch if `ticket` is still the newest. Resets the filter to All.
    pub fn publish(&self, ticket: RunTicket, batch: Batch) -> PublishOutcome {
        let _guard = self.writer.lock();

        let latest = self.latest_run.load(Ordering::SeqCst);
        if ticket.0 != latest {
            tracing::debug!(ticket = ticket.0, latest, "discarding superseded run");
            return PublishOutcome::Discarded;
        }

        let current = self.snapshot();
        let summary = compute_summary(&batch.results);
        let next = Arc::new(Snapshot {
            version: current.version + 1,
            batch_id: current.batch_id + 1,
            batch: Arc::new(batch),
            filter: ResultFilter::All,
            summary,
        });
        self.tx.send_replace(next.clone());
        tracing::debug!(version = next.version, batch_id = next.batch_id, "published batch");
        PublishOutcome::Published(next)
    }

    /// Replace the active filter and recompute the summary from the filtered rows.
    pub fn set_filter(&self, filter: ResultFilter) -> Arc<Snapshot> {
        let _guard = self.writer.lock();

        let current = self.snapshot();
        let summary = compute_summary(apply_filter(&current.batch.results, &filter));
        tracing::debug!(%filter, matching = summary.total_claims, "filter changed");
        let next = Arc::new(Snapshot {
            version: current.version + 1,
            batch_id: current.batch_id,
            batch: current.batch.clone(),
            filter,
            summary,
        });
        self.tx.send_replace(next.clone());
        next
    }

    /// Drop the current batch and supersede any run in flight.
    pub fn clear(&self) -> Arc<Snapshot> {
        let _guard = self.writer.lock();
        self.latest_run.fetch_add(1, Ordering::SeqCst);

        let current = self.snapshot();
        let next = Arc::new(Snapshot {
            version: current.version + 1,
            batch_id: current.batch_id + 1,
            ..Snapshot::default()
        });
        self.tx.send_replace(next.clone());
        tracing::debug!(version = next.version, "store cleared");
        next
    }
}

/// Page the current snapshot, validating the request against `max_limit`.
pub fn page_snapshot(
    snapshot: &Snapshot,
    skip: usize,
    limit: usize,
    max_limit: usize,
    filtered: bool,
) -> Result<Page<ReconciliationResult>, ReconError> {
    let request = PageRequest::new(skip, limit, max_limit)?;
    Ok(if filtered {
        snapshot.filtered_page(request)
    } else {
        snapshot.page(request)
    })
}
