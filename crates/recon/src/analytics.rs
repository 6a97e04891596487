//! Analytics rollups: computed once per batch over the full result sequence.
//!
//! Every builder is a pure function of its input slice. Output order is fixed:
//! statuses in display order, days ascending, rankings by value descending then
//! name ascending.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::AnalyticsConfig;
use crate::model::{
    AnalyticsBundle, ChargeBin, DailyAccuracy, DailyFinancials, DailyStatusSplit, DailyVolume,
    PatientAmount, PatientVolume, ReconStatus, ReconciliationResult, StatusCount, StatusImpact,
};

/// Build every rollup.
pub fn build_analytics(results: &[ReconciliationResult], config: &AnalyticsConfig) -> AnalyticsBundle {
    let days = daily_totals(results);

    let bundle = AnalyticsBundle {
        status_distribution: status_distribution(results),
        top_patients_volume: top_patients_volume(results, config.top_patients),
        top_patients_overpaid: top_patients_overpaid(results, config.top_patients),
        top_patients_underpaid: top_patients_underpaid(results, config.top_patients),
        daily_volume_trend: volume_from_days(&days),
        financial_trend: financials_from_days(&days),
        accuracy_trend: accuracy_from_days(&days),
        status_area_trend: status_split_from_days(&days),
        charge_distribution: charge_distribution(results, config.histogram_bins),
        financial_impact_by_status: financial_impact_by_status(results),
    };

    tracing::debug!(results = results.len(), days = days.len(), "analytics built");
    bundle
}

// ---------------------------------------------------------------------------
// Status rollups
// ---------------------------------------------------------------------------

/// Count per status. All four statuses are present, zero-filled.
pub fn status_distribution(results: &[ReconciliationResult]) -> Vec<StatusCount> {
    let mut counts: HashMap<ReconStatus, usize> = HashMap::new();
    for r in results {
        *counts.entry(r.status).or_insert(0) += 1;
    }

    ReconStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: counts.get(&status).copied().unwrap_or(0),
        })
        .collect()
}

/// Summed |credit| per status. N/A has no credit and BALANCED has zero credit.
pub fn financial_impact_by_status(results: &[ReconciliationResult]) -> Vec<StatusImpact> {
    let mut amounts: HashMap<ReconStatus, Decimal> = HashMap::new();
    for r in results {
        let impact = r.credit.map(|c| c.abs()).unwrap_or(Decimal::ZERO);
        *amounts.entry(r.status).or_insert(Decimal::ZERO) += impact;
    }

    ReconStatus::ALL
        .iter()
        .map(|&status| StatusImpact {
            status,
            amount: amounts.get(&status).copied().unwrap_or(Decimal::ZERO),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Patient rankings
// ---------------------------------------------------------------------------

/// Claims per patient name, top `n`.
pub fn top_patients_volume(results: &[ReconciliationResult], n: usize) -> Vec<PatientVolume> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in results {
        *counts.entry(r.patient_name.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<PatientVolume> = counts
        .into_iter()
        .map(|(name, count)| PatientVolume { name: name.to_string(), count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}

/// Summed positive credit per patient, top `n`. Patients never overpaid are left out.
pub fn top_patients_overpaid(results: &[ReconciliationResult], n: usize) -> Vec<PatientAmount> {
    rank_by_amount(results, n, |credit| (credit > Decimal::ZERO).then_some(credit))
}

/// Summed |negative credit| per patient, top `n`. Patients never underpaid are left out.
pub fn top_patients_underpaid(results: &[ReconciliationResult], n: usize) -> Vec<PatientAmount> {
    rank_by_amount(results, n, |credit| (credit < Decimal::ZERO).then_some(-credit))
}

fn rank_by_amount(
    results: &[ReconciliationResult],
    n: usize,
    magnitude: impl Fn(Decimal) -> Option<Decimal>,
) -> Vec<PatientAmount> {
    let mut amounts: HashMap<&str, Decimal> = HashMap::new();
    for r in results {
        if let Some(amount) = r.credit.and_then(&magnitude) {
            *amounts.entry(r.patient_name.as_str()).or_insert(Decimal::ZERO) += amount;
        }
    }

    let mut ranked: Vec<PatientAmount> = amounts
        .into_iter()
        .map(|(name, amount)| PatientAmount { name: name.to_string(), amount })
        .collect();
    ranked.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}

// ---------------------------------------------------------------------------
// Daily trends
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DayTotals {
    count: usize,
    balanced: usize,
    charges: Decimal,
    invoices: Decimal,
}

fn daily_totals(results: &[ReconciliationResult]) -> BTreeMap<NaiveDate, DayTotals> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for r in results {
        let day = days.entry(r.date_of_service).or_default();
        day.count += 1;
        if r.status == ReconStatus::Balanced {
            day.balanced += 1;
        }
        day.charges += r.charges_amount;
        day.invoices += r.invoice_total.unwrap_or(Decimal::ZERO);
    }
    days
}

fn volume_from_days(days: &BTreeMap<NaiveDate, DayTotals>) -> Vec<DailyVolume> {
    days.iter()
        .map(|(&date, d)| DailyVolume { date, count: d.count })
        .collect()
}

fn financials_from_days(days: &BTreeMap<NaiveDate, DayTotals>) -> Vec<DailyFinancials> {
    days.iter()
        .map(|(&date, d)| DailyFinancials {
            date,
            charges: d.charges,
            invoices: d.invoices,
        })
        .collect()
}

fn accuracy_from_days(days: &BTreeMap<NaiveDate, DayTotals>) -> Vec<DailyAccuracy> {
    days.iter()
        .filter(|(_, d)| d.count > 0)
        .map(|(&date, d)| {
            let pct = d.balanced as f64 / d.count as f64 * 100.0;
            DailyAccuracy {
                date,
                accuracy: (pct * 100.0).round() / 100.0,
            }
        })
        .collect()
}

fn status_split_from_days(days: &BTreeMap<NaiveDate, DayTotals>) -> Vec<DailyStatusSplit> {
    days.iter()
        .map(|(&date, d)| DailyStatusSplit {
            date,
            balanced: d.balanced,
            others: d.count - d.balanced,
        })
        .collect()
}

/// Claims per day of service, ascending.
pub fn daily_volume_trend(results: &[ReconciliationResult]) -> Vec<DailyVolume> {
    volume_from_days(&daily_totals(results))
}

/// Summed charges and invoice totals per day (missing totals count as zero).
pub fn financial_trend(results: &[ReconciliationResult]) -> Vec<DailyFinancials> {
    financials_from_days(&daily_totals(results))
}

/// Percentage of balanced claims per day, rounded to two places.
pub fn accuracy_trend(results: &[ReconciliationResult]) -> Vec<DailyAccuracy> {
    accuracy_from_days(&daily_totals(results))
}

/// Balanced vs everything else, per day.
pub fn status_area_trend(results: &[ReconciliationResult]) -> Vec<DailyStatusSplit> {
    status_split_from_days(&daily_totals(results))
}

// ---------------------------------------------------------------------------
// Charge histogram
// ---------------------------------------------------------------------------

/// Fixed-width histogram of `charges_amount` over the observed [min, max].
///
/// The maximum lands in the last bin. When every charge is equal there is a
/// single bin holding all of them.
pub fn charge_distribution(results: &[ReconciliationResult], bins: usize) -> Vec<ChargeBin> {
    let Some(first) = results.first().map(|r| r.charges_amount) else {
        return Vec::new();
    };
    let (min, max) = results.iter().fold((first, first), |(lo, hi), r| {
        (lo.min(r.charges_amount), hi.max(r.charges_amount))
    });

    if min == max {
        return vec![bin(min, max, results.len())];
    }

    let bins = bins.max(1);
    let last = bins - 1;
    let width = (max - min) / Decimal::from(bins);

    let mut counts = vec![0usize; bins];
    for r in results {
        let offset = ((r.charges_amount - min) / width).floor();
        let idx = offset.to_usize().unwrap_or(last).min(last);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = min + width * Decimal::from(i);
            let upper = if i == last { max } else { min + width * Decimal::from(i + 1) };
            bin(lower, upper, count)
        })
        .collect()
}

fn bin(lower: Decimal, upper: Decimal, count: usize) -> ChargeBin {
    let lower = lower.round_dp(2);
    let upper = upper.round_dp(2);
    ChargeBin {
        bin: format!("{}-{}", lower.normalize(), upper.normalize()),
        lower,
        upper,
        count,
    }
}
