//! Service facade: the ingest and query boundaries over one [`ResultStore`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::{self, ReconInput};
use crate::error::{Dataset, MissingColumns, ReconError};
use crate::model::{
    AnalyticsBundle, IngestReport, Page, ReconStatus, ReconciliationResult, SummaryStats,
};
use crate::normalize::{
    load_batch_csv, missing_columns, normalize_claim, normalize_invoice, normalize_records,
};
use crate::patients::PatientDirectory;
use crate::query::{patient_names, ResultFilter};
use crate::store::{page_snapshot, PublishOutcome, ResultStore, Snapshot};

/// Result of an ingest call that passed validation.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Published(IngestReport),
    /// A newer ingest or a clear won the race; nothing was published.
    Superseded,
}

impl IngestOutcome {
    pub fn report(&self) -> Option<&IngestReport> {
        match self {
            Self::Published(report) => Some(report),
            Self::Superseded => None,
        }
    }
}

pub struct ReconService {
    config: EngineConfig,
    directory: PatientDirectory,
    store: ResultStore,
}

impl ReconService {
    pub fn new(config: EngineConfig, directory: PatientDirectory) -> Self {
        Self {
            config,
            directory,
            store: ResultStore::new(),
        }
    }

    /// Build from config, loading the patient directory it names (if any).
    pub fn from_config(config: EngineConfig) -> Result<Self, ReconError> {
        let directory = match &config.patients.file {
            Some(path) => PatientDirectory::load(path)?,
            None => PatientDirectory::new(),
        };
        Ok(Self::new(config, directory))
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    /// Validate and reconcile two CSV documents. Schema failures leave the store untouched.
    pub fn ingest_csv(&self, claims_csv: &str, invoices_csv: &str) -> Result<IngestOutcome, ReconError> {
        let (claims, invoices) = load_batch_csv(claims_csv, invoices_csv)?;
        Ok(self.ingest(ReconInput::from_normalized(claims, invoices)))
    }

    /// Reconcile already-keyed rows (e.g. decoded from JSON). Columns are the
    /// union of keys across each collection; an empty collection is not checked.
    pub fn ingest_records(
        &self,
        claims: &[HashMap<String, String>],
        invoices: &[HashMap<String, String>],
    ) -> Result<IngestOutcome, ReconError> {
        let claim_columns = column_union(claims);
        let invoice_columns = column_union(invoices);

        let missing: Vec<MissingColumns> = [
            (Dataset::Claims, claims.is_empty(), &claim_columns),
            (Dataset::Invoices, invoices.is_empty(), &invoice_columns),
        ]
        .into_iter()
        .filter(|(_, empty, _)| !empty)
        .map(|(dataset, _, columns)| MissingColumns {
            dataset,
            columns: missing_columns(columns.iter().copied(), dataset.required_columns()),
        })
        .filter(|m| !m.columns.is_empty())
        .collect();
        if !missing.is_empty() {
            return Err(ReconError::Schema(missing));
        }

        let claims = normalize_records(Dataset::Claims, claims, &claim_columns, |row, r| {
            normalize_claim(row, r)
        })?;
        let invoices = normalize_records(Dataset::Invoices, invoices, &invoice_columns, |row, r| {
            normalize_invoice(row, r)
        })?;
        Ok(self.ingest(ReconInput::from_normalized(claims, invoices)))
    }

    /// Run a validated input and publish it if no newer run started meanwhile.
    pub fn ingest(&self, input: ReconInput) -> IngestOutcome {
        let ticket = self.store.begin_run();
        let batch = engine::run(&self.config, &input, &self.directory);

        match self.store.publish(ticket, batch) {
            PublishOutcome::Published(snapshot) => {
                IngestOutcome::Published(IngestReport::from_batch(&snapshot.batch, snapshot.summary))
            }
            PublishOutcome::Discarded => IngestOutcome::Superseded,
        }
    }

    /// [`Self::ingest_csv`] on the blocking pool.
    pub async fn ingest_csv_async(
        self: &Arc<Self>,
        claims_csv: String,
        invoices_csv: String,
    ) -> Result<IngestOutcome, ReconError> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || service.ingest_csv(&claims_csv, &invoices_csv))
            .await
            .map_err(|e| ReconError::Task(e.to_string()))?
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    /// Page over the unfiltered results. `None` uses the configured default limit.
    pub fn list_page(&self, skip: usize, limit: Option<usize>) -> Result<Page<ReconciliationResult>, ReconError> {
        self.page(skip, limit, false)
    }

    /// Page over the rows matching the active filter.
    pub fn list_filtered_page(
        &self,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Page<ReconciliationResult>, ReconError> {
        self.page(skip, limit, true)
    }

    fn page(&self, skip: usize, limit: Option<usize>, filtered: bool) -> Result<Page<ReconciliationResult>, ReconError> {
        let pagination = &self.config.pagination;
        let limit = limit.unwrap_or(pagination.default_limit);
        page_snapshot(&self.store.snapshot(), skip, limit, pagination.max_limit, filtered)
    }

    /// Analytics over the whole batch, regardless of the active filter.
    pub fn analytics(&self) -> AnalyticsBundle {
        self.store.snapshot().batch.analytics.clone()
    }

    pub fn summary(&self) -> SummaryStats {
        self.store.snapshot().summary
    }

    /// Filter by patient name. `None`, empty and `"ALL"` clear the filter.
    pub fn set_filter(&self, patient_name: Option<&str>) -> SummaryStats {
        self.store.set_filter(ResultFilter::patient(patient_name)).summary
    }

    pub fn set_status_filter(&self, status: ReconStatus) -> SummaryStats {
        self.store.set_filter(ResultFilter::Status(status)).summary
    }

    pub fn clear_filter(&self) -> SummaryStats {
        self.store.set_filter(ResultFilter::All).summary
    }

    /// Drop the current batch.
    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn patient_names(&self) -> Vec<String> {
        patient_names(self.store.snapshot().results())
    }
}

fn column_union(rows: &[HashMap<String, String>]) -> Vec<&str> {
    let keys: BTreeSet<&str> = rows.iter().flat_map(|row| row.keys().map(String::as_str)).collect();
    keys.into_iter().collect()
}
