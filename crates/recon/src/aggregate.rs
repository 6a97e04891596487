use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;

use crate::model::{Claim, Invoice, InvoiceAggregate};

/// Group invoices by claim id and sum their transaction values.
///
/// A claim id appears in the map only if at least one invoice references it,
/// so a present entry with `total == 0` is distinct from an absent one.
pub fn aggregate_invoices(invoices: &[Invoice]) -> BTreeMap<String, InvoiceAggregate> {
    let mut groups: BTreeMap<String, InvoiceAggregate> = BTreeMap::new();

    for invoice in invoices {
        let entry = groups
            .entry(invoice.claim_id.clone())
            .or_insert_with(|| InvoiceAggregate {
                claim_id: invoice.claim_id.clone(),
                total: Decimal::ZERO,
                invoice_count: 0,
                invoice_ids: Vec::new(),
            });
        entry.total += invoice.transaction_value;
        entry.invoice_count += 1;
        entry.invoice_ids.push(invoice.invoice_id.clone());
    }

    groups
}

/// Aggregates whose claim id matches no claim in the batch.
pub fn orphan_aggregates<'a>(
    aggregates: &'a BTreeMap<String, InvoiceAggregate>,
    claims: &[Claim],
) -> Vec<&'a InvoiceAggregate> {
    let known: HashSet<&str> = claims.iter().map(|c| c.claim_id.as_str()).collect();
    aggregates
        .values()
        .filter(|agg| !known.contains(agg.claim_id.as_str()))
        .collect()
}
