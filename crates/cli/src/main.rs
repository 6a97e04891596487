// crecon - claims-to-invoice reconciliation from the command line

mod exit_codes;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use claims_recon::{ReconError, ReconStatus};
use exit_codes::{recon_exit_code, EXIT_IO, EXIT_SUCCESS};
use recon::{parse_status, InputArgs};

#[derive(Parser)]
#[command(name = "crecon")]
#[command(about = "Reconcile insurance claims against invoice payments")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a claims file against an invoices file
    #[command(after_help = "\
Examples:
  crecon run --claims claims.csv --invoices invoices.csv
  crecon run --claims claims.csv --invoices invoices.csv --json
  crecon run --claims claims.csv --invoices invoices.csv --patients patients.csv --output report.json
  crecon run --claims claims.csv --invoices invoices.csv --strict")]
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Output the JSON report to stdout instead of only the human summary
        #[arg(long)]
        json: bool,

        /// Write the JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit 4 when any claim or invoice row was rejected
        #[arg(long)]
        strict: bool,
    },

    /// Check both CSV headers without reconciling
    #[command(after_help = "\
Examples:
  crecon validate --claims claims.csv --invoices invoices.csv
  crecon validate --claims claims.csv --invoices invoices.csv --json")]
    Validate {
        #[arg(long)]
        claims: PathBuf,

        #[arg(long)]
        invoices: PathBuf,

        /// Output the validation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summary counts, optionally scoped to one patient or status
    #[command(after_help = "\
Examples:
  crecon summary --claims claims.csv --invoices invoices.csv
  crecon summary --claims claims.csv --invoices invoices.csv --patient 'Mark Mcdowell'
  crecon summary --claims claims.csv --invoices invoices.csv --status OVERPAID")]
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Patient name ("ALL" selects everyone)
        #[arg(long, conflicts_with = "status")]
        patient: Option<String>,

        /// BALANCED, OVERPAID, UNDERPAID or N/A
        #[arg(long, value_parser = parse_status)]
        status: Option<ReconStatus>,
    },

    /// One page of reconciliation rows as JSON
    #[command(after_help = "\
Examples:
  crecon page --claims claims.csv --invoices invoices.csv --skip 0 --limit 50
  crecon page --claims claims.csv --invoices invoices.csv --skip 50
  crecon page --claims claims.csv --invoices invoices.csv --filtered --patient 'Mark Mcdowell'")]
    Page {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Rows per page (default from config, 50 without one)
        #[arg(long)]
        limit: Option<usize>,

        /// Page over rows matching --patient / --status instead of the whole batch
        #[arg(long)]
        filtered: bool,

        #[arg(long, requires = "filtered", conflicts_with = "status")]
        patient: Option<String>,

        #[arg(long, requires = "filtered", value_parser = parse_status)]
        status: Option<ReconStatus>,
    },

    /// Every analytics rollup over the whole batch as JSON
    #[command(after_help = "\
Examples:
  crecon analytics --claims claims.csv --invoices invoices.csv
  crecon analytics --claims claims.csv --invoices invoices.csv --config recon.toml --output analytics.json")]
    Analytics {
        #[command(flatten)]
        input: InputArgs,

        /// Write JSON to file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  claims-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
        "\nprofile: ", env!("CRECON_BUILD_PROFILE"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { input, json, output, strict } => recon::cmd_run(input, json, output, strict),
        Commands::Validate { claims, invoices, json } => recon::cmd_validate(claims, invoices, json),
        Commands::Summary { input, patient, status } => recon::cmd_summary(input, patient, status),
        Commands::Page { input, skip, limit, filtered, patient, status } => {
            recon::cmd_page(input, skip, limit, filtered, patient, status)
        }
        Commands::Analytics { input, output } => recon::cmd_analytics(input, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::Schema(_) => {
                Some("claims need claim_id, patient_id, date_of_service, charges_amount; \
                      invoices need invoice_id, claim_id, transaction_value"
                    .to_string())
            }
            ReconError::InvalidPage(_) => Some("--limit must be at least 1".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}
