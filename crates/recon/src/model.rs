use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::RowParseError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A billed service awaiting reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    pub claim_id: String,
    pub patient_id: String,
    /// Explicit name from the source row, if it carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    pub date_of_service: NaiveDate,
    pub charges_amount: Decimal,
}

/// A payment (or adjustment, when negative) against a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub claim_id: String,
    pub transaction_value: Decimal,
}

// ---------------------------------------------------------------------------
// Invoice aggregation
// ---------------------------------------------------------------------------

/// All invoices sharing one claim id, summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceAggregate {
    pub claim_id: String,
    pub total: Decimal,
    pub invoice_count: usize,
    pub invoice_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ReconStatus {
    #[serde(rename = "BALANCED")]
    Balanced,
    #[serde(rename = "OVERPAID")]
    Overpaid,
    #[serde(rename = "UNDERPAID")]
    Underpaid,
    #[serde(rename = "N/A")]
    NoInvoice,
}

impl ReconStatus {
    /// Every status, in display order.
    pub const ALL: [ReconStatus; 4] = [
        ReconStatus::Balanced,
        ReconStatus::Overpaid,
        ReconStatus::Underpaid,
        ReconStatus::NoInvoice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "BALANCED",
            Self::Overpaid => "OVERPAID",
            Self::Underpaid => "UNDERPAID",
            Self::NoInvoice => "N/A",
        }
    }

    /// Parse a status label, case-insensitive. Accepts `NA` and `NONE` for N/A.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "BALANCED" => Some(Self::Balanced),
            "OVERPAID" => Some(Self::Overpaid),
            "UNDERPAID" => Some(Self::Underpaid),
            "N/A" | "NA" | "NONE" => Some(Self::NoInvoice),
            _ => None,
        }
    }
}

impl fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified claim. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub claim_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub date_of_service: NaiveDate,
    pub charges_amount: Decimal,
    /// `None` when no invoice references the claim.
    pub invoice_total: Option<Decimal>,
    pub status: ReconStatus,
    pub credit: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub total_claims: usize,
    pub balanced: usize,
    pub overpaid: usize,
    pub underpaid: usize,
    pub no_invoices: usize,
}

impl SummaryStats {
    pub fn is_empty(&self) -> bool {
        self.total_claims == 0
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ReconStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientVolume {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientAmount {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyFinancials {
    pub date: NaiveDate,
    pub charges: Decimal,
    pub invoices: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAccuracy {
    pub date: NaiveDate,
    /// Percentage of the day's claims that balanced, 0..=100.
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStatusSplit {
    pub date: NaiveDate,
    pub balanced: usize,
    pub others: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeBin {
    pub bin: String,
    pub lower: Decimal,
    pub upper: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusImpact {
    pub status: ReconStatus,
    pub amount: Decimal,
}

/// Every rollup over one batch. Always computed from the unfiltered results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsBundle {
    pub status_distribution: Vec<StatusCount>,
    pub top_patients_volume: Vec<PatientVolume>,
    pub top_patients_overpaid: Vec<PatientAmount>,
    pub top_patients_underpaid: Vec<PatientAmount>,
    pub daily_volume_trend: Vec<DailyVolume>,
    pub financial_trend: Vec<DailyFinancials>,
    pub accuracy_trend: Vec<DailyAccuracy>,
    pub status_area_trend: Vec<DailyStatusSplit>,
    pub charge_distribution: Vec<ChargeBin>,
    pub financial_impact_by_status: Vec<StatusImpact>,
}

// ---------------------------------------------------------------------------
// Batch + Output
// ---------------------------------------------------------------------------

/// Non-fatal problems found while building a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestWarnings {
    pub rejected_claims: usize,
    pub rejected_invoices: usize,
    pub row_errors: Vec<RowParseError>,
    /// Invoices whose claim id matches no claim in the batch.
    pub orphan_invoices: usize,
    pub orphan_invoice_total: Decimal,
}

impl IngestWarnings {
    pub fn is_clean(&self) -> bool {
        self.rejected_claims == 0 && self.rejected_invoices == 0 && self.orphan_invoices == 0
    }
}

/// Output of one reconciliation run: the canonical result sequence plus analytics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    pub results: Vec<ReconciliationResult>,
    pub analytics: AnalyticsBundle,
    pub warnings: IngestWarnings,
}

impl Batch {
    pub fn total_records(&self) -> usize {
        self.results.len()
    }
}

/// Ingest boundary response.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub summary: SummaryStats,
    pub total_records: usize,
    pub reconciliation: Vec<ReconciliationResult>,
    pub analytics: AnalyticsBundle,
    pub warnings: IngestWarnings,
}

impl IngestReport {
    pub fn from_batch(batch: &Batch, summary: SummaryStats) -> Self {
        Self {
            summary,
            total_records: batch.total_records(),
            reconciliation: batch.results.clone(),
            analytics: batch.analytics.clone(),
            warnings: batch.warnings.clone(),
        }
    }
}

/// One slice of a result sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// `skip` for the following page, or `None` once this page reaches the end.
    pub fn next_skip(&self) -> Option<usize> {
        self.skip.checked_add(self.limit).filter(|&next| next < self.total)
    }
}
