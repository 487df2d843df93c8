use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use super::{daily_buckets, PnlRecord};
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub pnl: Money,
    pub balance: Money,
}

/// Running balance per day, oldest first, starting from `initial`.
pub fn balance_series<R: PnlRecord>(records: &[R], tz: &Tz, initial: Money) -> Vec<BalancePoint> {
    let mut balance = initial;
    daily_buckets(records, tz)
        .into_values()
        .map(|day| {
            balance += day.pnl;
            BalancePoint {
                date: day.date,
                pnl: day.pnl,
                balance,
            }
        })
        .collect()
}

/// Drop points repeating the previous balance. The last point always stays.
pub fn compress_series(points: &[BalancePoint]) -> Vec<BalancePoint> {
    let mut out: Vec<BalancePoint> = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        let is_last = i + 1 == points.len();
        let repeats = out.last().map_or(false, |prev| prev.balance == point.balance);
        if !repeats || is_last {
            out.push(point.clone());
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountHealth {
    pub initial_balance: Money,
    pub current_balance: Money,
    pub peak_balance: Money,
    pub max_drawdown: Money,
    /// Drawdown as a percent of the peak it fell from.
    pub max_drawdown_pct: f64,
    pub minimum_balance: Money,
    pub breached_minimum: bool,
    /// Current balance minus the minimum; negative once breached.
    pub distance_to_minimum: Money,
}

pub fn account_health(series: &[BalancePoint], initial: Money, minimum: Money) -> AccountHealth {
    let mut peak = initial;
    let mut max_drawdown = Money::ZERO;
    let mut max_drawdown_pct = 0.0;
    let mut breached = initial < minimum;

    for point in series {
        if point.balance > peak {
            peak = point.balance;
        }
        let drawdown = peak - point.balance;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
            if peak.is_positive() {
                max_drawdown_pct = drawdown.to_f64() * 100.0 / peak.to_f64();
            }
        }
        if point.balance < minimum {
            breached = true;
        }
    }

    let current = series.last().map_or(initial, |p| p.balance);
    AccountHealth {
        initial_balance: initial,
        current_balance: current,
        peak_balance: peak,
        max_drawdown,
        max_drawdown_pct,
        minimum_balance: minimum,
        breached_minimum: breached,
        distance_to_minimum: current - minimum,
    }
}
