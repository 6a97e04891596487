//! `crecon` subcommands: load a batch, reconcile it, print one view of it.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use claims_recon::normalize::check_header;
use claims_recon::{
    Dataset, EngineConfig, IngestOutcome, IngestReport, PatientDirectory, ReconService, ReconStatus,
    SummaryStats,
};

use crate::exit_codes::{EXIT_ERROR, EXIT_ROWS_REJECTED, EXIT_SCHEMA};
use crate::CliError;

/// Input files shared by every command that reconciles.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Claims CSV (claim_id, patient_id, date_of_service, charges_amount)
    #[arg(long)]
    pub claims: PathBuf,

    /// Invoices CSV (invoice_id, claim_id, transaction_value)
    #[arg(long)]
    pub invoices: PathBuf,

    /// Patient directory CSV (patient_id, name). Overrides [patients] in --config
    #[arg(long)]
    pub patients: Option<PathBuf>,

    /// Engine config TOML
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Parse a status label for `--status`.
pub fn parse_status(label: &str) -> Result<ReconStatus, String> {
    ReconStatus::parse(label).ok_or_else(|| {
        format!("unknown status \"{label}\" (expected BALANCED, OVERPAID, UNDERPAID or N/A)")
    })
}

// ============================================================================
// Loading
// ============================================================================

fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| {
        CliError::io(format!("cannot read {}: {e}", path.display()))
            .with_hint("check the path passed to --claims / --invoices")
    })
}

fn build_service(input: &InputArgs) -> Result<ReconService, CliError> {
    let mut config = match &input.config {
        Some(path) => EngineConfig::load(path).map_err(|e| {
            CliError::from(e).with_hint(format!("check {}", path.display()))
        })?,
        None => EngineConfig::default(),
    };
    if let Some(patients) = &input.patients {
        config.patients.file = Some(patients.clone());
    }

    let directory = match &config.patients.file {
        Some(path) => PatientDirectory::load(path)?,
        None => PatientDirectory::new(),
    };
    tracing::debug!(patients = directory.len(), "patient directory loaded");
    Ok(ReconService::new(config, directory))
}

/// Read both files, reconcile, and return the service holding the batch.
fn load_batch(input: &InputArgs) -> Result<(ReconService, IngestReport), CliError> {
    let claims_csv = read_input(&input.claims)?;
    let invoices_csv = read_input(&input.invoices)?;
    let service = build_service(input)?;

    let report = match service.ingest_csv(&claims_csv, &invoices_csv)? {
        IngestOutcome::Published(report) => report,
        IngestOutcome::Superseded => {
            return Err(CliError::new(EXIT_ERROR, "reconciliation run was superseded"));
        }
    };
    Ok((service, report))
}

// ============================================================================
// Output
// ============================================================================

fn write_json<T: Serialize>(value: &T, stdout: bool, output: Option<&Path>) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if stdout {
        println!("{json_str}");
    }
    Ok(())
}

fn print_summary(report: &IngestReport) {
    let s = &report.summary;
    eprintln!(
        "reconciled {} claims: {} balanced, {} overpaid, {} underpaid, {} without invoices",
        s.total_claims, s.balanced, s.overpaid, s.underpaid, s.no_invoices,
    );

    let w = &report.warnings;
    if w.rejected_claims > 0 || w.rejected_invoices > 0 {
        eprintln!(
            "rejected rows: {} claims, {} invoices",
            w.rejected_claims, w.rejected_invoices
        );
        for err in &w.row_errors {
            eprintln!("  {err}");
        }
    }
    if w.orphan_invoices > 0 {
        eprintln!(
            "orphan invoices: {} (total {}) reference no claim in this batch",
            w.orphan_invoices, w.orphan_invoice_total
        );
    }
}

// ============================================================================
// Commands
// ============================================================================

pub fn cmd_run(
    input: InputArgs,
    json: bool,
    output: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let (_service, report) = load_batch(&input)?;

    write_json(&report, json, output.as_deref())?;
    print_summary(&report);

    let rejected = report.warnings.rejected_claims + report.warnings.rejected_invoices;
    if strict && rejected > 0 {
        return Err(CliError::new(EXIT_ROWS_REJECTED, format!("{rejected} rows rejected (--strict)")));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ValidateReport {
    valid: bool,
    missing: Vec<claims_recon::MissingColumns>,
}

pub fn cmd_validate(claims: PathBuf, invoices: PathBuf, json: bool) -> Result<(), CliError> {
    let mut missing = Vec::new();
    for (dataset, path) in [(Dataset::Claims, &claims), (Dataset::Invoices, &invoices)] {
        let header = check_header(dataset, &read_input(path)?)?;
        if !header.columns.is_empty() {
            missing.push(header);
        }
    }

    let report = ValidateReport { valid: missing.is_empty(), missing };
    if json {
        write_json(&report, true, None)?;
    }

    if report.valid {
        eprintln!("ok: claims and invoices headers are valid");
        return Ok(());
    }
    let detail: Vec<String> = report.missing.iter().map(ToString::to_string).collect();
    Err(CliError::new(EXIT_SCHEMA, format!("schema error: {}", detail.join("; ")))
        .with_hint("header names are case-sensitive"))
}

pub fn cmd_summary(
    input: InputArgs,
    patient: Option<String>,
    status: Option<ReconStatus>,
) -> Result<(), CliError> {
    let (service, _report) = load_batch(&input)?;
    let summary: SummaryStats = match status {
        Some(status) => service.set_status_filter(status),
        None => service.set_filter(patient.as_deref()),
    };
    write_json(&summary, true, None)
}

pub fn cmd_page(
    input: InputArgs,
    skip: usize,
    limit: Option<usize>,
    filtered: bool,
    patient: Option<String>,
    status: Option<ReconStatus>,
) -> Result<(), CliError> {
    let (service, _report) = load_batch(&input)?;

    let page = if filtered {
        match status {
            Some(status) => service.set_status_filter(status),
            None => service.set_filter(patient.as_deref()),
        };
        service.list_filtered_page(skip, limit)?
    } else {
        service.list_page(skip, limit)?
    };

    if let Some(next) = page.next_skip() {
        eprintln!("{} of {} rows; next page: --skip {next}", page.data.len(), page.total);
    }
    write_json(&page, true, None)
}

pub fn cmd_analytics(input: InputArgs, output: Option<PathBuf>) -> Result<(), CliError> {
    let (service, _report) = load_batch(&input)?;
    write_json(&service.analytics(), output.is_none(), output.as_deref())
}
