use rust_decimal::Decimal;

use crate::aggregate::{aggregate_invoices, orphan_aggregates};
use crate::analytics::build_analytics;
use crate::classify::classify_claims;
use crate::config::EngineConfig;
use crate::error::ReconError;
use crate::model::{Batch, Claim, IngestWarnings, Invoice};
use crate::normalize::{load_batch_csv, Normalized};
use crate::patients::PatientDirectory;

/// Pre-validated input for one run.
pub struct ReconInput {
    pub claims: Vec<Claim>,
    pub invoices: Vec<Invoice>,
    /// Rows the normalizer already excluded. Carried into the batch warnings.
    pub warnings: IngestWarnings,
}

impl ReconInput {
    /// Rows taken as given. Amounts must stay within [`crate::normalize::MAX_AMOUNT`].
    pub fn new(claims: Vec<Claim>, invoices: Vec<Invoice>) -> Self {
        Self {
            claims,
            invoices,
            warnings: IngestWarnings::default(),
        }
    }

    pub fn from_normalized(claims: Normalized<Claim>, invoices: Normalized<Invoice>) -> Self {
        let mut row_errors = claims.rejected;
        let rejected_claims = row_errors.len();
        row_errors.extend(invoices.rejected);
        let rejected_invoices = row_errors.len() - rejected_claims;

        Self {
            claims: claims.records,
            invoices: invoices.records,
            warnings: IngestWarnings {
                rejected_claims,
                rejected_invoices,
                row_errors,
                ..IngestWarnings::default()
            },
        }
    }

    /// Parse both CSV files. A schema problem in either rejects the batch.
    pub fn from_csv(claims_csv: &str, invoices_csv: &str) -> Result<Self, ReconError> {
        let (claims, invoices) = load_batch_csv(claims_csv, invoices_csv)?;
        Ok(Self::from_normalized(claims, invoices))
    }
}

/// Join, classify and aggregate. Never fails: empty inputs give empty outputs.
pub fn run(config: &EngineConfig, input: &ReconInput, directory: &PatientDirectory) -> Batch {
    let aggregates = aggregate_invoices(&input.invoices);
    let results = classify_claims(&input.claims, &aggregates, directory);

    let orphans = orphan_aggregates(&aggregates, &input.claims);
    for agg in &orphans {
        tracing::trace!(claim_id = %agg.claim_id, invoices = ?agg.invoice_ids, "orphan invoices");
    }
    let mut warnings = input.warnings.clone();
    warnings.orphan_invoices = orphans.iter().map(|agg| agg.invoice_count).sum();
    warnings.orphan_invoice_total = orphans.iter().map(|agg| agg.total).sum::<Decimal>();

    let analytics = build_analytics(&results, &config.analytics);

    tracing::info!(
        claims = input.claims.len(),
        invoices = input.invoices.len(),
        results = results.len(),
        "reconciliation run complete"
    );
    if !warnings.is_clean() {
        tracing::warn!(
            rejected_claims = warnings.rejected_claims,
            rejected_invoices = warnings.rejected_invoices,
            orphan_invoices = warnings.orphan_invoices,
            "batch has excluded rows or orphan invoices"
        );
    }

    Batch {
        results,
        analytics,
        warnings,
    }
}
