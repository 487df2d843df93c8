use serde::Serialize;
use std::collections::HashMap;

use super::PnlRecord;
use crate::loss_reasons::{loss_reason_label, UNSPECIFIED};
use crate::models::Outcome;
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossReasonBucket {
    pub reason: String,
    pub label: String,
    pub count: usize,
    /// Percent of all losses carrying this reason.
    pub share: f64,
    pub pnl: Money,
}

/// Losses grouped by tagged reason, most frequent first. A loss tagged with
/// several reasons counts in each of them.
pub fn loss_reason_histogram<R: PnlRecord>(records: &[R]) -> Vec<LossReasonBucket> {
    let mut total_losses = 0;
    let mut buckets: HashMap<String, (usize, Money)> = HashMap::new();

    for record in records {
        if record.outcome() != Some(Outcome::Loss) {
            continue;
        }
        total_losses += 1;
        let pnl = record.pnl();
        let mut reasons = record.loss_reasons();
        if reasons.is_empty() {
            reasons.push(UNSPECIFIED.to_string());
        }
        for reason in reasons {
            let entry = buckets.entry(reason).or_insert((0, Money::ZERO));
            entry.0 += 1;
            entry.1 += pnl;
        }
    }

    let mut out: Vec<LossReasonBucket> = buckets
        .into_iter()
        .map(|(reason, (count, pnl))| LossReasonBucket {
            label: loss_reason_label(&reason),
            share: count as f64 * 100.0 / total_losses as f64,
            reason,
            count,
            pnl,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    out
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    fn tagged(pnl: &str, reasons: &[&str]) -> Rec {
        let mut rec = loss(day(2025, 6, 2), pnl);
        rec.reasons = reasons.iter().map(|r| r.to_string()).collect();
        rec
    }

    #[test]
    fn test_histogram_counts_and_labels() {
        let records = vec![
            tagged("-10", &["contre_sma"]),
            tagged("-20", &["contre_sma", "erreur_psychologique"]),
            tagged("-5", &[]),
            tagged("-1", &["my own reason"]),
            win(day(2025, 6, 2), "100"),
        ];
        let hist = loss_reason_histogram(&records);
        assert_eq!(hist.len(), 4);
        assert_eq!(hist[0].reason, "contre_sma");
        assert_eq!(hist[0].label, "📈 Contre sma");
        assert_eq!(hist[0].count, 2);
        assert_eq!(hist[0].share, 50.0);
        assert_eq!(hist[0].pnl.to_storage(), "-30.00");

        let custom = hist.iter().find(|b| b.reason == "my own reason").unwrap();
        assert_eq!(custom.label, "my own reason");
        let untagged = hist.iter().find(|b| b.reason == UNSPECIFIED).unwrap();
        assert_eq!(untagged.count, 1);
    }

    #[test]
    fn test_histogram_ignores_non_losses() {
        let records = vec![win(day(2025, 6, 2), "10"), be(day(2025, 6, 2))];
        assert!(loss_reason_histogram(&records).is_empty());
    }
}
