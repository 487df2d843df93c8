//! P&L aggregation over signals and journal trades.
//!
//! Everything here is a pure function over a slice of records. Views call
//! these on every request; nothing is cached.

mod calendar;
mod losses;
mod series;
mod summary;

pub use calendar::{
    daily_buckets, month_bounds, month_calendar, monthly_breakdown, parse_month, weekly_breakdown,
    CalendarCell, DayBucket, DayTone, MonthBucket, MonthCalendar, WeekBucket,
};
pub use losses::{loss_reason_histogram, LossReasonBucket};
pub use series::{account_health, balance_series, compress_series, AccountHealth, BalancePoint};
pub use summary::{month_summary, ProfitFactor, Summary};

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::entity::{personal_trades, signals};
use crate::models::Outcome;
use crate::money::Money;

/// Anything with a P&L that can be bucketed by day.
pub trait PnlRecord {
    /// `None` while the record is still open.
    fn outcome(&self) -> Option<Outcome>;

    fn pnl(&self) -> Money;

    /// Calendar day the record belongs to, in the given timezone.
    fn local_date(&self, tz: &Tz) -> NaiveDate;

    fn loss_reasons(&self) -> Vec<String>;

    fn is_closed(&self) -> bool {
        self.outcome().is_some()
    }
}

impl PnlRecord for signals::Model {
    fn outcome(&self) -> Option<Outcome> {
        self.status.parse().ok()
    }

    fn pnl(&self) -> Money {
        Money::parse_lenient(self.pnl.as_deref().unwrap_or_default())
    }

    fn local_date(&self, tz: &Tz) -> NaiveDate {
        self.created_at.with_timezone(tz).date_naive()
    }

    fn loss_reasons(&self) -> Vec<String> {
        self.loss_reason
            .iter()
            .filter(|r| !r.is_empty())
            .cloned()
            .collect()
    }
}

impl PnlRecord for personal_trades::Model {
    fn outcome(&self) -> Option<Outcome> {
        self.status.parse().ok()
    }

    fn pnl(&self) -> Money {
        Money::parse_lenient(&self.pnl)
    }

    fn local_date(&self, _tz: &Tz) -> NaiveDate {
        self.trade_date
    }

    fn loss_reasons(&self) -> Vec<String> {
        self.loss_reason_list()
    }
}

/// Currency-like text to a float: `"+$123.45"` is 123.45, `""` is 0.
pub fn parse_pnl(raw: &str) -> f64 {
    Money::parse_lenient(raw).to_f64()
}

/// Reward over risk using absolute distances from the entry.
pub fn risk_reward(entry: &str, take_profit: &str, stop_loss: &str) -> Option<f64> {
    let entry = Money::parse_prefix(entry)?;
    let take_profit = Money::parse_prefix(take_profit)?;
    let stop_loss = Money::parse_prefix(stop_loss)?;

    let risk = (entry - stop_loss).abs();
    if risk.is_zero() {
        return None;
    }
    let reward = (take_profit - entry).abs();
    Some(reward.to_f64() / risk.to_f64())
}

pub fn format_risk_reward(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.2}", r),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal record for aggregation tests.
    #[derive(Debug, Clone)]
    pub struct Rec {
        pub outcome: Option<Outcome>,
        pub pnl: Money,
        pub date: NaiveDate,
        pub reasons: Vec<String>,
    }

    impl PnlRecord for Rec {
        fn outcome(&self) -> Option<Outcome> {
            self.outcome
        }

        fn pnl(&self) -> Money {
            self.pnl
        }

        fn local_date(&self, _tz: &Tz) -> NaiveDate {
            self.date
        }

        fn loss_reasons(&self) -> Vec<String> {
            self.reasons.clone()
        }
    }

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn win(date: NaiveDate, pnl: &str) -> Rec {
        rec(Some(Outcome::Win), date, pnl)
    }

    pub fn loss(date: NaiveDate, pnl: &str) -> Rec {
        rec(Some(Outcome::Loss), date, pnl)
    }

    pub fn be(date: NaiveDate) -> Rec {
        rec(Some(Outcome::BreakEven), date, "0")
    }

    pub fn open(date: NaiveDate) -> Rec {
        rec(None, date, "")
    }

    fn rec(outcome: Option<Outcome>, date: NaiveDate, pnl: &str) -> Rec {
        Rec {
            outcome,
            pnl: Money::parse_lenient(pnl),
            date,
            reasons: Vec::new(),
        }
    }
}
