//! `claims-recon`: Claims-to-invoice reconciliation engine.
//!
//! Pure engine crate: normalizes claim and invoice rows, joins invoices to
//! claims, classifies each claim, and serves summaries, pages and analytics
//! from an immutable snapshot store. No CLI dependencies.

pub mod aggregate;
pub mod analytics;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod patients;
pub mod query;
pub mod service;
pub mod store;
pub mod summary;

pub use config::EngineConfig;
pub use engine::{run, ReconInput};
pub use error::{Dataset, MissingColumns, ReconError, RowParseError};
pub use model::{
    AnalyticsBundle, Batch, Claim, IngestReport, IngestWarnings, Invoice, Page, ReconStatus,
    ReconciliationResult, SummaryStats,
};
pub use patients::PatientDirectory;
pub use query::{PageRequest, ResultFilter};
pub use service::{IngestOutcome, ReconService};
pub use store::{PublishOutcome, ResultStore, RunTicket, Snapshot};
pub use summary::compute_summary;
