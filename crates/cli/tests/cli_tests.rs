// Integration tests for the crecon binary: exit codes and the --json stdout contract.
//
// Run with: cargo test -p claims-recon-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const CLAIMS: &str = "\
claim_id,patient_id,date_of_service,charges_amount
C1,P1,2024-03-01,100.00
C2,P2,2024-03-01,250.50
C3,P1,2024-03-02,60.00
C4,P3,2024-03-02,75.25
C5,P1,2024-03-03,300.00
";

const INVOICES: &str = "\
invoice_id,claim_id,transaction_value
I1,C1,100.00
I2,C2,200.00
I3,C3,30.00
I4,C3,40.00
I5,C4,70.00
";

const PATIENTS: &str = "\
patient_id,name
P1,Mark Mcdowell
P2,Ana Ruiz
";

struct Inputs {
    _dir: TempDir,
    claims: PathBuf,
    invoices: PathBuf,
    patients: PathBuf,
}

fn write_inputs(claims: &str, invoices: &str) -> Inputs {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, body: &str| {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    };
    let claims = write("claims.csv", claims);
    let invoices = write("invoices.csv", invoices);
    let patients = write("patients.csv", PATIENTS);
    Inputs { _dir: dir, claims, invoices, patients }
}

fn crecon(args: &[&str], inputs: &Inputs) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crecon"));
    cmd.args(args)
        .arg("--claims")
        .arg(&inputs.claims)
        .arg("--invoices")
        .arg(&inputs.invoices)
        .env_remove("RUST_LOG");
    cmd.output().expect("run crecon")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Assert stdout is a single, parseable JSON value.
fn assert_single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed)
        .unwrap_or_else(|e| panic!("stdout must be valid JSON.\nParse error: {e}\nstdout:\n{trimmed}"))
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

// ===========================================================================
// crecon run
// ===========================================================================

#[test]
fn run_json_report_shape() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let output = crecon(&["run", "--json", "--patients", path_str(&inputs.patients)], &inputs);
    assert_exit(&output, 0);

    let val = assert_single_json(&output);
    assert_eq!(val["total_records"], 5);
    assert_eq!(val["summary"]["balanced"], 1);
    assert_eq!(val["summary"]["overpaid"], 1);
    assert_eq!(val["summary"]["underpaid"], 2);
    assert_eq!(val["summary"]["no_invoices"], 1);

    let rows = val["reconciliation"].as_array().unwrap();
    assert_eq!(rows[0]["patient_name"], "Mark Mcdowell");
    assert_eq!(rows[2]["status"], "OVERPAID");
    assert_eq!(rows[2]["credit"], "10.00");
    assert_eq!(rows[3]["patient_name"], "Patient P3");
    assert_eq!(rows[4]["status"], "N/A");
    assert!(rows[4]["invoice_total"].is_null());

    assert!(val["analytics"]["status_distribution"].is_array());
    assert_eq!(val["analytics"]["accuracy_trend"][0]["date"], "2024-03-01");
}

#[test]
fn run_without_json_keeps_stdout_empty() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let output = crecon(&["run"], &inputs);
    assert_exit(&output, 0);
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("reconciled 5 claims"), "stderr: {stderr}");
}

#[test]
fn run_writes_output_file() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let out = inputs.claims.with_file_name("report.json");
    let output = crecon(&["run", "--output", path_str(&out)], &inputs);
    assert_exit(&output, 0);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["total_records"], 5);
}

#[test]
fn schema_rejection_exits_3() {
    let inputs = write_inputs("claim_id,patient\nC1,P1\n", "invoice_id,claim_id\nI1,C1\n");
    let output = crecon(&["run", "--json"], &inputs);
    assert_exit(&output, 3);
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("claims missing: patient_id, date_of_service, charges_amount"), "{stderr}");
    assert!(stderr.contains("invoices missing: transaction_value"), "{stderr}");
}

#[test]
fn strict_exits_4_on_rejected_rows() {
    let bad_invoices = format!("{INVOICES}I6,C5,abc\n");
    let inputs = write_inputs(CLAIMS, &bad_invoices);

    let output = crecon(&["run"], &inputs);
    assert_exit(&output, 0);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invoices row 6"), "{stderr}");

    let output = crecon(&["run", "--strict", "--json"], &inputs);
    assert_exit(&output, 4);
    let val = assert_single_json(&output);
    assert_eq!(val["warnings"]["rejected_invoices"], 1);
}

#[test]
fn missing_input_exits_5() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    std::fs::remove_file(&inputs.invoices).unwrap();
    let output = crecon(&["run"], &inputs);
    assert_exit(&output, 5);
}

// ===========================================================================
// crecon validate
// ===========================================================================

#[test]
fn validate_reports_missing_columns() {
    let inputs = write_inputs("claim_id,patient_id\n", INVOICES);
    let output = crecon(&["validate", "--json"], &inputs);
    assert_exit(&output, 3);

    let val = assert_single_json(&output);
    assert_eq!(val["valid"], false);
    assert_eq!(val["missing"][0]["dataset"], "claims");
    assert_eq!(val["missing"][0]["columns"][0], "date_of_service");

    let inputs = write_inputs(CLAIMS, INVOICES);
    assert_exit(&crecon(&["validate"], &inputs), 0);
}

// ===========================================================================
// crecon summary / page / analytics
// ===========================================================================

#[test]
fn summary_filters_by_patient_and_status() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let patients = path_str(&inputs.patients).to_string();

    let output = crecon(&["summary", "--patients", &patients, "--patient", "Mark Mcdowell"], &inputs);
    assert_exit(&output, 0);
    let val = assert_single_json(&output);
    assert_eq!(val["total_claims"], 3);

    let output = crecon(&["summary", "--patient", "ALL"], &inputs);
    assert_eq!(assert_single_json(&output)["total_claims"], 5);

    let output = crecon(&["summary", "--status", "underpaid"], &inputs);
    assert_eq!(assert_single_json(&output)["total_claims"], 2);

    let output = crecon(&["summary", "--status", "PAID"], &inputs);
    assert_exit(&output, 2);
}

#[test]
fn page_walks_the_batch() {
    let inputs = write_inputs(CLAIMS, INVOICES);

    let output = crecon(&["page", "--skip", "0", "--limit", "2"], &inputs);
    assert_exit(&output, 0);
    let val = assert_single_json(&output);
    assert_eq!(val["total"], 5);
    assert_eq!(val["data"].as_array().unwrap().len(), 2);
    assert_eq!(val["data"][0]["claim_id"], "C1");

    let output = crecon(&["page", "--skip", "4", "--limit", "2"], &inputs);
    let val = assert_single_json(&output);
    assert_eq!(val["data"].as_array().unwrap().len(), 1);

    let output = crecon(&["page", "--limit", "0"], &inputs);
    assert_exit(&output, 2);
}

#[test]
fn page_skip_at_usize_max_is_empty() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let output = crecon(&["page", "--skip", "18446744073709551615", "--limit", "5"], &inputs);
    assert_exit(&output, 0);
    let val = assert_single_json(&output);
    assert_eq!(val["total"], 5);
    assert!(val["data"].as_array().unwrap().is_empty());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("next page"));
}

#[test]
fn filtered_page_counts_matching_rows() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let output = crecon(&["page", "--filtered", "--status", "UNDERPAID"], &inputs);
    assert_exit(&output, 0);
    let val = assert_single_json(&output);
    assert_eq!(val["total"], 2);
    assert_eq!(val["data"][0]["claim_id"], "C2");

    // --patient only makes sense with --filtered
    let output = crecon(&["page", "--patient", "Mark Mcdowell"], &inputs);
    assert_exit(&output, 2);
}

#[test]
fn analytics_json_covers_whole_batch() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let output = crecon(&["analytics", "--patients", path_str(&inputs.patients)], &inputs);
    assert_exit(&output, 0);

    let val = assert_single_json(&output);
    assert_eq!(val["top_patients_volume"][0]["name"], "Mark Mcdowell");
    assert_eq!(val["top_patients_volume"][0]["count"], 3);
    assert_eq!(val["daily_volume_trend"].as_array().unwrap().len(), 3);
    assert_eq!(val["charge_distribution"].as_array().unwrap().len(), 10);
}

#[test]
fn config_file_sets_limits_and_patients() {
    let inputs = write_inputs(CLAIMS, INVOICES);
    let config = inputs.claims.with_file_name("recon.toml");
    std::fs::write(
        &config,
        "[pagination]\ndefault_limit = 2\nmax_limit = 3\n\n[patients]\nfile = \"patients.csv\"\n",
    )
    .unwrap();

    let output = crecon(&["page", "--config", path_str(&config)], &inputs);
    let val = assert_single_json(&output);
    assert_eq!(val["limit"], 2);
    assert_eq!(val["data"][0]["patient_name"], "Mark Mcdowell");

    let output = crecon(&["page", "--config", path_str(&config), "--limit", "100"], &inputs);
    assert_eq!(assert_single_json(&output)["limit"], 3);

    std::fs::write(&config, "[analytics]\nhistogram_bins = 0\n").unwrap();
    let output = crecon(&["analytics", "--config", path_str(&config)], &inputs);
    assert_exit(&output, 2);
}

#[test]
fn long_version_names_commit_target_and_profile() {
    let output = Command::new(env!("CARGO_BIN_EXE_crecon"))
        .arg("--version")
        .output()
        .expect("run crecon");
    assert_exit(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    assert!(stdout.contains("target:"));
    assert!(stdout.contains("profile:"));
}
