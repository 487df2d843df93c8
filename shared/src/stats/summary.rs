use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::fmt;

use super::{month_bounds, PnlRecord};
use crate::error::DomainError;
use crate::models::Outcome;
use crate::money::Money;

/// Winning P&L over losing P&L.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitFactor {
    /// Wins without a single loss.
    Infinite,
    Value(f64),
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Infinite => f.write_str("∞"),
            ProfitFactor::Value(v) => write!(f, "{:.2}", v),
        }
    }
}

impl Serialize for ProfitFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_pnl: Money,
    pub total_records: usize,
    pub closed: usize,
    pub wins: usize,
    pub losses: usize,
    pub break_evens: usize,
    pub active: usize,
    /// Percent of decided records (wins + losses) that won.
    pub win_rate: f64,
    pub profit_factor: ProfitFactor,
    pub avg_win: Money,
    /// Absolute value.
    pub avg_loss: Money,
    pub best_trade: Option<Money>,
    pub worst_trade: Option<Money>,
}

impl Summary {
    pub fn compute<R: PnlRecord>(records: &[R]) -> Summary {
        Summary::from_records(records.iter())
    }

    fn from_records<'a, R: PnlRecord + 'a>(records: impl Iterator<Item = &'a R>) -> Summary {
        let mut total_records = 0;
        let mut total_pnl = Money::ZERO;
        let mut wins = 0;
        let mut losses = 0;
        let mut break_evens = 0;
        let mut active = 0;
        let mut winning = Money::ZERO;
        let mut losing = Money::ZERO;
        let mut best: Option<Money> = None;
        let mut worst: Option<Money> = None;

        for record in records {
            total_records += 1;
            let outcome = match record.outcome() {
                Some(outcome) => outcome,
                None => {
                    active += 1;
                    continue;
                }
            };
            let pnl = record.pnl();
            total_pnl += pnl;
            best = Some(best.map_or(pnl, |b| b.max(pnl)));
            worst = Some(worst.map_or(pnl, |w| w.min(pnl)));
            match outcome {
                Outcome::Win => {
                    wins += 1;
                    winning += pnl;
                }
                Outcome::Loss => {
                    losses += 1;
                    losing += pnl.abs();
                }
                Outcome::BreakEven => break_evens += 1,
            }
        }

        let decided = wins + losses;
        let win_rate = if decided == 0 {
            0.0
        } else {
            wins as f64 * 100.0 / decided as f64
        };

        let profit_factor = if !losing.is_zero() {
            ProfitFactor::Value(winning.to_f64() / losing.to_f64())
        } else if wins > 0 {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Value(0.0)
        };

        Summary {
            total_pnl,
            total_records,
            closed: decided + break_evens,
            wins,
            losses,
            break_evens,
            active,
            win_rate,
            profit_factor,
            avg_win: average(winning, wins),
            avg_loss: average(losing, losses),
            best_trade: best,
            worst_trade: worst,
        }
    }
}

fn average(total: Money, count: usize) -> Money {
    if count == 0 {
        return Money::ZERO;
    }
    Money::new(total.amount() / rust_decimal::Decimal::from(count as u64))
}

pub fn month_summary<R: PnlRecord>(
    records: &[R],
    tz: &Tz,
    year: i32,
    month: u32,
) -> Result<Summary, DomainError> {
    let (first, last) = month_bounds(year, month)?;
    Ok(Summary::from_records(records.iter().filter(|r| {
        let date = r.local_date(tz);
        date >= first && date <= last
    })))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn test_profit_factor_rendering() {
        let d = day(2025, 6, 2);
        let only_wins = Summary::compute(&[win(d, "+100")]);
        assert_eq!(only_wins.profit_factor.to_string(), "∞");

        let nothing: Vec<Rec> = Vec::new();
        assert_eq!(Summary::compute(&nothing).profit_factor.to_string(), "0.00");

        let mixed = Summary::compute(&[win(d, "150"), loss(d, "-50"), loss(d, "-25")]);
        assert_eq!(mixed.profit_factor.to_string(), "2.00");
    }

    #[test]
    fn test_summary_counters() {
        let d = day(2025, 6, 2);
        let records = vec![
            win(d, "+$100"),
            win(d, "+$50"),
            loss(d, "-$30"),
            be(d),
            open(d),
        ];
        let s = Summary::compute(&records);
        assert_eq!(s.total_records, 5);
        assert_eq!(s.closed, 4);
        assert_eq!((s.wins, s.losses, s.break_evens, s.active), (2, 1, 1, 1));
        assert_eq!(s.total_pnl.to_storage(), "120.00");
        assert!((s.win_rate - 66.666).abs() < 0.01);
        assert_eq!(s.avg_win.to_storage(), "75.00");
        assert_eq!(s.avg_loss.to_storage(), "30.00");
        assert_eq!(s.best_trade.map(|m| m.to_storage()), Some("100.00".to_string()));
        assert_eq!(s.worst_trade.map(|m| m.to_storage()), Some("-30.00".to_string()));
    }

    #[test]
    fn test_break_evens_do_not_move_win_rate() {
        let d = day(2025, 6, 2);
        let s = Summary::compute(&[win(d, "10"), be(d), be(d)]);
        assert_eq!(s.win_rate, 100.0);
        assert_eq!(s.profit_factor, ProfitFactor::Infinite);
    }

    #[test]
    fn test_month_summary_filters_by_month() {
        let records = vec![
            win(day(2025, 5, 31), "500"),
            win(day(2025, 6, 1), "10"),
            loss(day(2025, 6, 30), "-5"),
            win(day(2025, 7, 1), "999"),
        ];
        let s = month_summary(&records, &Tz::UTC, 2025, 6).unwrap();
        assert_eq!(s.total_records, 2);
        assert_eq!(s.total_pnl.to_storage(), "5.00");
        assert!(month_summary(&records, &Tz::UTC, 2025, 13).is_err());
    }

    #[test]
    fn test_summary_serializes_profit_factor_as_text() {
        let d = day(2025, 6, 2);
        let json = serde_json::to_value(Summary::compute(&[win(d, "1")])).unwrap();
        assert_eq!(json["profit_factor"], "∞");
        assert_eq!(json["total_pnl"], 1.0);
    }
}
