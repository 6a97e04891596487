//! Record normalizer: raw rows in, typed claims and invoices out.
//!
//! Header validation runs before any row is read: a missing required column
//! rejects the whole batch. After that, each row either parses or becomes a
//! [`RowParseError`]; a bad row never aborts the batch.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{Dataset, MissingColumns, ReconError, RowParseError};
use crate::model::{Claim, Invoice};

pub const CLAIM_COLUMNS: [&str; 4] = ["claim_id", "patient_id", "date_of_service", "charges_amount"];
pub const INVOICE_COLUMNS: [&str; 3] = ["invoice_id", "claim_id", "transaction_value"];

/// Optional claims column carrying an explicit patient name.
pub const PATIENT_NAME_COLUMN: &str = "patient_name";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest accepted amount magnitude, in whole units. Batch sums stay far
/// below `Decimal::MAX` at this bound.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

impl Dataset {
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Claims => &CLAIM_COLUMNS,
            Self::Invoices => &INVOICE_COLUMNS,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// Field access over a source row, independent of where the row came from.
pub trait RawRecord {
    fn field(&self, name: &str) -> Option<&str>;
}

impl RawRecord for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// A CSV row addressed by header name.
struct CsvRow<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl RawRecord for CsvRow<'_> {
    fn field(&self, name: &str) -> Option<&str> {
        self.columns.get(name).and_then(|&i| self.record.get(i))
    }
}

/// Rows that parsed, plus the rows that did not.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RowParseError>,
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Required columns not present in `headers`, in schema order.
pub fn missing_columns<'a>(
    headers: impl IntoIterator<Item = &'a str>,
    required: &[&str],
) -> Vec<String> {
    let present: Vec<&str> = headers.into_iter().collect();
    required
        .iter()
        .filter(|col| !present.contains(col))
        .map(|col| col.to_string())
        .collect()
}

fn csv_reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_data.as_bytes())
}

fn read_headers(
    dataset: Dataset,
    reader: &mut csv::Reader<&[u8]>,
) -> Result<Vec<String>, ReconError> {
    let headers = reader.headers().map_err(|e| ReconError::Csv {
        dataset,
        message: e.to_string(),
    })?;
    Ok(headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect())
}

/// Check one dataset's header row without reading any data rows.
pub fn check_header(dataset: Dataset, csv_data: &str) -> Result<MissingColumns, ReconError> {
    let mut reader = csv_reader(csv_data);
    let headers = read_headers(dataset, &mut reader)?;
    Ok(MissingColumns {
        dataset,
        columns: missing_columns(headers.iter().map(String::as_str), dataset.required_columns()),
    })
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

fn reject(dataset: Dataset, row: usize, field: &str, value: &str, reason: &str) -> RowParseError {
    RowParseError {
        dataset,
        row,
        field: field.into(),
        value: value.into(),
        reason: reason.into(),
    }
}

fn required_text(
    record: &impl RawRecord,
    dataset: Dataset,
    row: usize,
    field: &str,
) -> Result<String, RowParseError> {
    match record.field(field).map(str::trim) {
        None => Err(reject(dataset, row, field, "", "is missing")),
        Some("") => Err(reject(dataset, row, field, "", "is empty")),
        Some(value) => Ok(value.to_string()),
    }
}

fn parse_decimal(
    record: &impl RawRecord,
    dataset: Dataset,
    row: usize,
    field: &str,
) -> Result<Decimal, RowParseError> {
    let text = required_text(record, dataset, row, field)?;
    let value = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| reject(dataset, row, field, &text, "is not a decimal"))?;
    if value.abs() > Decimal::from(MAX_AMOUNT) {
        return Err(reject(dataset, row, field, &text, "exceeds the largest supported amount"));
    }
    Ok(value)
}

/// Build a claim from one raw row. `row` is the 1-based data row index.
pub fn normalize_claim(row: usize, record: &impl RawRecord) -> Result<Claim, RowParseError> {
    let dataset = Dataset::Claims;
    let claim_id = required_text(record, dataset, row, "claim_id")?;
    let patient_id = required_text(record, dataset, row, "patient_id")?;

    let date_text = required_text(record, dataset, row, "date_of_service")?;
    let date_of_service = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|_| {
        reject(dataset, row, "date_of_service", &date_text, "is not a YYYY-MM-DD date")
    })?;

    let charges_amount = parse_decimal(record, dataset, row, "charges_amount")?;
    if charges_amount.is_sign_negative() && !charges_amount.is_zero() {
        return Err(reject(
            dataset,
            row,
            "charges_amount",
            &charges_amount.to_string(),
            "must not be negative",
        ));
    }

    let patient_name = record
        .field(PATIENT_NAME_COLUMN)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(Claim {
        claim_id,
        patient_id,
        patient_name,
        date_of_service,
        charges_amount,
    })
}

/// Build an invoice from one raw row. `row` is the 1-based data row index.
pub fn normalize_invoice(row: usize, record: &impl RawRecord) -> Result<Invoice, RowParseError> {
    let dataset = Dataset::Invoices;
    Ok(Invoice {
        invoice_id: required_text(record, dataset, row, "invoice_id")?,
        claim_id: required_text(record, dataset, row, "claim_id")?,
        transaction_value: parse_decimal(record, dataset, row, "transaction_value")?,
    })
}

/// Normalize already-decoded rows (API payloads, database rows).
///
/// Keys are column names. The required columns are checked against the union
/// of keys across all rows; an empty input has nothing to check.
pub fn normalize_records<R: RawRecord, T>(
    dataset: Dataset,
    rows: &[R],
    present_columns: &[&str],
    parse: fn(usize, &R) -> Result<T, RowParseError>,
) -> Result<Normalized<T>, ReconError> {
    if !rows.is_empty() {
        let missing = missing_columns(present_columns.iter().copied(), dataset.required_columns());
        if !missing.is_empty() {
            return Err(ReconError::Schema(vec![MissingColumns { dataset, columns: missing }]));
        }
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();
    for (i, raw) in rows.iter().enumerate() {
        match parse(i + 1, raw) {
            Ok(record) => records.push(record),
            Err(err) => rejected.push(err),
        }
    }
    Ok(Normalized { records, rejected })
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn load_csv<T>(
    dataset: Dataset,
    csv_data: &str,
    parse: fn(usize, &CsvRow<'_>) -> Result<T, RowParseError>,
) -> Result<Normalized<T>, ReconError> {
    let mut reader = csv_reader(csv_data);
    let headers = read_headers(dataset, &mut reader)?;

    let missing = missing_columns(headers.iter().map(String::as_str), dataset.required_columns());
    if !missing.is_empty() {
        return Err(ReconError::Schema(vec![MissingColumns { dataset, columns: missing }]));
    }

    let columns: HashMap<String, usize> = headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| (h, i))
        .collect();

    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                rejected.push(reject(dataset, row, "<record>", "", &e.to_string()));
                continue;
            }
        };
        // Blank lines between records carry no data.
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }

        match parse(row, &CsvRow { columns: &columns, record: &record }) {
            Ok(parsed) => records.push(parsed),
            Err(err) => {
                tracing::debug!(%dataset, row, field = %err.field, "row rejected");
                rejected.push(err);
            }
        }
    }

    Ok(Normalized { records, rejected })
}

pub fn load_claims_csv(csv_data: &str) -> Result<Normalized<Claim>, ReconError> {
    load_csv(Dataset::Claims, csv_data, |row, record| normalize_claim(row, record))
}

pub fn load_invoices_csv(csv_data: &str) -> Result<Normalized<Invoice>, ReconError> {
    load_csv(Dataset::Invoices, csv_data, |row, record| normalize_invoice(row, record))
}

/// Load both files of a batch. Both headers are validated first, so a schema
/// rejection reports every missing column of both datasets at once.
pub fn load_batch_csv(
    claims_csv: &str,
    invoices_csv: &str,
) -> Result<(Normalized<Claim>, Normalized<Invoice>), ReconError> {
    let missing: Vec<MissingColumns> = [
        check_header(Dataset::Claims, claims_csv)?,
        check_header(Dataset::Invoices, invoices_csv)?,
    ]
    .into_iter()
    .filter(|m| !m.columns.is_empty())
    .collect();

    if !missing.is_empty() {
        return Err(ReconError::Schema(missing));
    }

    Ok((load_claims_csv(claims_csv)?, load_invoices_csv(invoices_csv)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_claims_good() {
        let csv = "\
claim_id,patient_id,date_of_service,charges_amount
c1,1,2023-01-01,100
c2,2,2023-01-02,250.75
";
        let claims = load_claims_csv(csv).unwrap();
        assert!(claims.rejected.is_empty());
        assert_eq!(claims.records.len(), 2);
        assert_eq!(claims.records[0].claim_id, "c1");
        assert_eq!(claims.records[0].patient_id, "1");
        assert_eq!(claims.records[1].charges_amount, Decimal::new(25075, 2));
        assert_eq!(
            claims.records[1].date_of_service,
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
        );
    }

    #[test]
    fn load_invoices_good() {
        let csv = "invoice_id,claim_id,transaction_value\ni1,c1,100\ni2,c1,-25.5\n";
        let invoices = load_invoices_csv(csv).unwrap();
        assert_eq!(invoices.records.len(), 2);
        assert_eq!(invoices.records[0].invoice_id, "i1");
        assert_eq!(invoices.records[1].transaction_value, Decimal::new(-255, 1));
    }

    #[test]
    fn missing_column_rejects_before_rows() {
        // Row 1 is malformed too, but the header check fails first.
        let csv = "claim_id,patient_id,charges_amount\nc1,1,abc\n";
        let err = load_claims_csv(csv).unwrap_err();
        let missing = err.missing_columns();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].dataset, Dataset::Claims);
        assert_eq!(missing[0].columns, vec!["date_of_service"]);
    }

    #[test]
    fn batch_enumerates_missing_columns_of_both_files() {
        let claims = "claim_id,patient_id\nc1,1\n";
        let invoices = "invoice_id,claim_id\ni1,c1\n";
        let err = load_batch_csv(claims, invoices).unwrap_err();
        let missing = err.missing_columns();
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].columns, vec!["date_of_service", "charges_amount"]);
        assert_eq!(missing[1].dataset, Dataset::Invoices);
        assert_eq!(missing[1].columns, vec!["transaction_value"]);
    }

    #[test]
    fn malformed_rows_are_excluded_not_fatal() {
        let csv = "\
claim_id,patient_id,date_of_service,charges_amount
c1,1,2023-01-01,100
c2,1,01/02/2023,100
c3,1,2023-01-03,ten
c4,1,2023-01-04,-5
,1,2023-01-05,10
c6,1,2023-01-06
c7,1,2023-01-07,70
";
        let claims = load_claims_csv(csv).unwrap();
        let ids: Vec<_> = claims.records.iter().map(|c| c.claim_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c7"]);

        let fields: Vec<(usize, &str)> = claims
            .rejected
            .iter()
            .map(|e| (e.row, e.field.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                (2, "date_of_service"),
                (3, "charges_amount"),
                (4, "charges_amount"),
                (5, "claim_id"),
                (6, "charges_amount"),
            ]
        );
        assert_eq!(claims.rejected[3].reason, "is empty");
        assert_eq!(claims.rejected[4].reason, "is missing");
    }

    #[test]
    fn header_whitespace_and_bom_are_ignored() {
        let csv = "\u{feff}claim_id , patient_id,date_of_service , charges_amount\nc1, 1 ,2023-01-01, 100\n";
        let claims = load_claims_csv(csv).unwrap();
        assert_eq!(claims.records.len(), 1);
        assert_eq!(claims.records[0].patient_id, "1");
    }

    #[test]
    fn optional_patient_name_column() {
        let csv = "\
claim_id,patient_id,patient_name,date_of_service,charges_amount
c1,1,Alice,2023-01-01,100
c2,2,,2023-01-01,100
";
        let claims = load_claims_csv(csv).unwrap();
        assert_eq!(claims.records[0].patient_name.as_deref(), Some("Alice"));
        assert_eq!(claims.records[1].patient_name, None);
    }

    #[test]
    fn scientific_notation_amount() {
        let csv = "invoice_id,claim_id,transaction_value\ni1,c1,1e3\n";
        let invoices = load_invoices_csv(csv).unwrap();
        assert_eq!(invoices.records[0].transaction_value, Decimal::from(1000));
    }

    #[test]
    fn amounts_beyond_max_are_rejected() {
        let csv = "\
claim_id,patient_id,date_of_service,charges_amount
c1,1,2023-01-01,79228162514264337593543950335
c2,1,2023-01-01,1000000000000000
c3,1,2023-01-01,1000000000000000.01
";
        let claims = load_claims_csv(csv).unwrap();
        assert_eq!(claims.records.len(), 1);
        assert_eq!(claims.records[0].claim_id, "c2");
        assert_eq!(claims.rejected.len(), 2);
        assert_eq!(claims.rejected[0].field, "charges_amount");
        assert!(claims.rejected[0].reason.contains("largest supported"));

        let invoices = load_invoices_csv(
            "invoice_id,claim_id,transaction_value\ni1,c1,-79228162514264337593543950335\n",
        )
        .unwrap();
        assert!(invoices.records.is_empty());
        assert_eq!(invoices.rejected[0].row, 1);
    }

    #[test]
    fn empty_file_is_a_schema_error() {
        let err = load_invoices_csv("").unwrap_err();
        assert_eq!(err.missing_columns()[0].columns.len(), 3);
    }

    #[test]
    fn normalize_map_records() {
        let row: HashMap<String, String> = HashMap::from([
            ("invoice_id".to_string(), "i1".to_string()),
            ("claim_id".to_string(), "c1".to_string()),
            ("transaction_value".to_string(), "12.50".to_string()),
        ]);
        let out = normalize_records(
            Dataset::Invoices,
            &[row],
            &INVOICE_COLUMNS,
            |i, r| normalize_invoice(i, r),
        )
        .unwrap();
        assert_eq!(out.records[0].transaction_value, Decimal::new(1250, 2));
    }

    #[test]
    fn normalize_map_records_checks_schema() {
        let row: HashMap<String, String> = HashMap::new();
        let err = normalize_records(
            Dataset::Claims,
            &[row],
            &["claim_id"],
            |i, r| normalize_claim(i, r),
        )
        .unwrap_err();
        assert_eq!(
            err.missing_columns()[0].columns,
            vec!["patient_id", "date_of_service", "charges_amount"]
        );
    }
}
