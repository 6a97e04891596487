//! Filter/query layer: predicates and pagination over a result sequence.
//!
//! Nothing here mutates the sequence. Filtering yields borrowed rows in their
//! original order; pagination clones only the requested slice.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{Page, ReconStatus, ReconciliationResult};

/// The active selection. `All` is the identity filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResultFilter {
    #[default]
    All,
    Patient(String),
    Status(ReconStatus),
}

impl ResultFilter {
    /// Patient filter from a picker value. `None`, empty and `"ALL"` select everything.
    pub fn patient(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") | Some("ALL") => Self::All,
            Some(name) => Self::Patient(name.to_string()),
        }
    }

    pub fn matches(&self, result: &ReconciliationResult) -> bool {
        match self {
            Self::All => true,
            Self::Patient(name) => result.patient_name == *name,
            Self::Status(status) => result.status == *status,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for ResultFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Patient(name) => write!(f, "patient={name}"),
            Self::Status(status) => write!(f, "status={status}"),
        }
    }
}

/// Rows matching `filter`, in original order.
pub fn apply_filter<'a>(
    results: &'a [ReconciliationResult],
    filter: &'a ResultFilter,
) -> impl Iterator<Item = &'a ReconciliationResult> + 'a {
    results.iter().filter(move |r| filter.matches(r))
}

/// Validated page request. `limit` is clamped to `max_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(skip: usize, limit: usize, max_limit: usize) -> Result<Self, ReconError> {
        if limit == 0 {
            return Err(ReconError::InvalidPage("limit must be greater than 0".into()));
        }
        Ok(Self {
            skip,
            limit: limit.min(max_limit.max(1)),
        })
    }
}

/// Slice `rows` for one page. A `skip` past the end yields an empty page.
pub fn paginate<'a>(
    rows: impl ExactSizeIterator<Item = &'a ReconciliationResult>,
    request: PageRequest,
) -> Page<ReconciliationResult> {
    let total = rows.len();
    let data = rows.skip(request.skip).take(request.limit).cloned().collect();
    Page {
        data,
        total,
        skip: request.skip,
        limit: request.limit,
    }
}

/// Page over rows matching `filter`. The total counts matching rows only.
pub fn paginate_filtered(
    results: &[ReconciliationResult],
    filter: &ResultFilter,
    request: PageRequest,
) -> Page<ReconciliationResult> {
    if filter.is_all() {
        return paginate(results.iter(), request);
    }
    let matching: Vec<&ReconciliationResult> = apply_filter(results, filter).collect();
    paginate(matching.into_iter(), request)
}

/// Distinct patient names in first-seen order.
pub fn patient_names(results: &[ReconciliationResult]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut names = Vec::new();
    for r in results {
        if seen.insert(r.patient_name.as_str()) {
            names.push(r.patient_name.clone());
        }
    }
    names
}
