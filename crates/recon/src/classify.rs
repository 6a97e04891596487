use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::model::{Claim, InvoiceAggregate, ReconStatus, ReconciliationResult};
use crate::patients::PatientDirectory;

/// Status and credit for one claim. Exact decimal comparison, no tolerance.
pub fn classify(charges_amount: Decimal, invoice_total: Option<Decimal>) -> (ReconStatus, Option<Decimal>) {
    let Some(total) = invoice_total else {
        return (ReconStatus::NoInvoice, None);
    };

    let status = match total.cmp(&charges_amount) {
        Ordering::Equal => ReconStatus::Balanced,
        Ordering::Greater => ReconStatus::Overpaid,
        Ordering::Less => ReconStatus::Underpaid,
    };
    (status, Some(total - charges_amount))
}

/// Classify every claim against its invoice aggregate, preserving claim order.
///
/// Duplicate claim ids are not collapsed: each row is classified on its own
/// against the same aggregate.
pub fn classify_claims(
    claims: &[Claim],
    aggregates: &BTreeMap<String, InvoiceAggregate>,
    directory: &PatientDirectory,
) -> Vec<ReconciliationResult> {
    claims
        .iter()
        .map(|claim| {
            let invoice_total = aggregates.get(&claim.claim_id).map(|agg| agg.total);
            let (status, credit) = classify(claim.charges_amount, invoice_total);

            ReconciliationResult {
                claim_id: claim.claim_id.clone(),
                patient_id: claim.patient_id.clone(),
                patient_name: directory.resolve(&claim.patient_id, claim.patient_name.as_deref()),
                date_of_service: claim.date_of_service,
                charges_amount: claim.charges_amount,
                invoice_total,
                status,
                credit,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_invoices;
    use crate::model::Invoice;
    use chrono::NaiveDate;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn claim(id: &str, patient: &str, charges: &str) -> Claim {
        Claim {
            claim_id: id.into(),
            patient_id: patient.into(),
            patient_name: None,
            date_of_service: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            charges_amount: dec(charges),
        }
    }

    fn invoice(id: &str, claim_id: &str, value: &str) -> Invoice {
        Invoice {
            invoice_id: id.into(),
            claim_id: claim_id.into(),
            transaction_value: dec(value),
        }
    }

    #[test]
    fn classify_by_credit_sign() {
        assert_eq!(classify(dec("100"), Some(dec("100.00"))), (ReconStatus::Balanced, Some(Decimal::ZERO)));
        assert_eq!(classify(dec("60"), Some(dec("70"))), (ReconStatus::Overpaid, Some(dec("10"))));
        assert_eq!(classify(dec("60"), Some(dec("59.99"))), (ReconStatus::Underpaid, Some(dec("-0.01"))));
        assert_eq!(classify(dec("0"), None), (ReconStatus::NoInvoice, None));
    }

    #[test]
    fn exact_decimal_sum_balances() {
        // 0.1 + 0.2 == 0.3 holds for decimals.
        let claims = vec![claim("c1", "1", "0.3")];
        let invoices = vec![invoice("i1", "c1", "0.1"), invoice("i2", "c1", "0.2")];
        let results = classify_claims(&claims, &aggregate_invoices(&invoices), &PatientDirectory::new());
        assert_eq!(results[0].status, ReconStatus::Balanced);
    }

    #[test]
    fn two_invoices_overpay() {
        let claims = vec![claim("C3", "1", "60")];
        let invoices = vec![invoice("I1", "C3", "30"), invoice("I2", "C3", "40")];
        let results = classify_claims(&claims, &aggregate_invoices(&invoices), &PatientDirectory::new());
        assert_eq!(results[0].invoice_total, Some(dec("70")));
        assert_eq!(results[0].status, ReconStatus::Overpaid);
        assert_eq!(results[0].credit, Some(dec("10")));
    }

    #[test]
    fn zero_total_is_not_no_invoice() {
        let claims = vec![claim("c1", "1", "0"), claim("c2", "1", "0")];
        let invoices = vec![invoice("i1", "c1", "25"), invoice("i2", "c1", "-25")];
        let results = classify_claims(&claims, &aggregate_invoices(&invoices), &PatientDirectory::new());
        assert_eq!(results[0].status, ReconStatus::Balanced);
        assert_eq!(results[0].invoice_total, Some(Decimal::ZERO));
        assert_eq!(results[1].status, ReconStatus::NoInvoice);
        assert_eq!(results[1].invoice_total, None);
    }

    #[test]
    fn duplicates_classified_independently_in_order() {
        let mut second = claim("c1", "2", "80");
        second.patient_name = Some("Bob".into());
        let claims = vec![claim("c1", "1", "100"), claim("c9", "1", "5"), second];
        let invoices = vec![invoice("i1", "c1", "100")];

        let mut dir = PatientDirectory::new();
        dir.insert("1", "Mark Mcdowell");
        let results = classify_claims(&claims, &aggregate_invoices(&invoices), &dir);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, ReconStatus::Balanced);
        assert_eq!(results[0].patient_name, "Mark Mcdowell");
        assert_eq!(results[1].claim_id, "c9");
        assert_eq!(results[2].status, ReconStatus::Overpaid);
        assert_eq!(results[2].patient_name, "Bob");
    }
}
