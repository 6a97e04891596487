use crate::model::{ReconStatus, ReconciliationResult, SummaryStats};

/// Count results per status. The four counts always sum to `total_claims`.
pub fn compute_summary<'a>(results: impl IntoIterator<Item = &'a ReconciliationResult>) -> SummaryStats {
    let mut summary = SummaryStats::default();

    for r in results {
        summary.total_claims += 1;
        match r.status {
            ReconStatus::Balanced => summary.balanced += 1,
            ReconStatus::Overpaid => summary.overpaid += 1,
            ReconStatus::Underpaid => summary.underpaid += 1,
            ReconStatus::NoInvoice => summary.no_invoices += 1,
        }
    }

    summary
}
