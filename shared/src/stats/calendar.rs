use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

use super::PnlRecord;
use crate::error::DomainError;
use crate::models::Outcome;
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    /// Sum over closed records only.
    pub pnl: Money,
    pub records: usize,
    pub wins: usize,
    pub losses: usize,
    pub break_evens: usize,
}

impl DayBucket {
    fn new(date: NaiveDate) -> Self {
        DayBucket {
            date,
            pnl: Money::ZERO,
            records: 0,
            wins: 0,
            losses: 0,
            break_evens: 0,
        }
    }

    fn add<R: PnlRecord>(&mut self, record: &R) {
        self.records += 1;
        match record.outcome() {
            Some(Outcome::Win) => self.wins += 1,
            Some(Outcome::Loss) => self.losses += 1,
            Some(Outcome::BreakEven) => self.break_evens += 1,
            None => return,
        }
        self.pnl += record.pnl();
    }

    fn closed(&self) -> usize {
        self.wins + self.losses + self.break_evens
    }

    pub fn tone(&self) -> DayTone {
        if self.closed() == 0 {
            return if self.records > 0 { DayTone::Open } else { DayTone::Empty };
        }
        if self.pnl.is_positive() {
            DayTone::Profit
        } else if self.pnl.is_negative() {
            DayTone::Loss
        } else {
            DayTone::Flat
        }
    }
}

pub fn daily_buckets<R: PnlRecord>(records: &[R], tz: &Tz) -> BTreeMap<NaiveDate, DayBucket> {
    let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for record in records {
        let date = record.local_date(tz);
        days.entry(date)
            .or_insert_with(|| DayBucket::new(date))
            .add(record);
    }
    days
}

/// First and last day of a month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), DomainError> {
    let invalid = || DomainError::InvalidMonth(format!("{:04}-{:02}", year, month));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let last = next.pred_opt().ok_or_else(invalid)?;
    Ok((first, last))
}

/// `"2025-06"` to `(2025, 6)`.
pub fn parse_month(raw: &str) -> Result<(i32, u32), DomainError> {
    let invalid = || DomainError::InvalidMonth(raw.to_string());
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    month_bounds(year, month).map_err(|_| invalid())?;
    Ok((year, month))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayTone {
    Profit,
    Loss,
    Flat,
    Open,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell {
    pub day: u32,
    pub date: NaiveDate,
    pub tone: DayTone,
    pub pnl: Money,
    pub records: usize,
    pub wins: usize,
    pub losses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    /// Blank cells before the 1st in a Monday-first grid.
    pub leading_blanks: u32,
    pub cells: Vec<CalendarCell>,
}

pub fn month_calendar<R: PnlRecord>(
    records: &[R],
    tz: &Tz,
    year: i32,
    month: u32,
) -> Result<MonthCalendar, DomainError> {
    let (first, last) = month_bounds(year, month)?;
    let days = daily_buckets(records, tz);

    let cells = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| {
            let bucket = days.get(&date).cloned().unwrap_or_else(|| DayBucket::new(date));
            CalendarCell {
                day: date.day(),
                date,
                tone: bucket.tone(),
                pnl: bucket.pnl,
                records: bucket.records,
                wins: bucket.wins,
                losses: bucket.losses,
            }
        })
        .collect();

    Ok(MonthCalendar {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_monday(),
        cells,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBucket {
    pub week: u32,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub records: usize,
    pub pnl: Money,
    pub wins: usize,
    pub losses: usize,
    pub is_current_week: bool,
}

/// Monday-anchored weeks of a month, each clipped to the month. Week 1 is
/// the Monday..Sunday span holding the 1st.
pub fn weekly_breakdown<R: PnlRecord>(
    records: &[R],
    tz: &Tz,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Result<Vec<WeekBucket>, DomainError> {
    let (first, last) = month_bounds(year, month)?;
    let days = daily_buckets(records, tz);

    let mut weeks = Vec::new();
    let mut monday = first - Duration::days(first.weekday().num_days_from_monday() as i64);
    let mut week = 1;
    while monday <= last {
        let start = monday.max(first);
        let end = (monday + Duration::days(6)).min(last);

        let mut bucket = WeekBucket {
            week,
            label: format!("Week {}", week),
            start,
            end,
            records: 0,
            pnl: Money::ZERO,
            wins: 0,
            losses: 0,
            is_current_week: today >= start && today <= end,
        };
        for (_, day) in days.range(start..=end) {
            bucket.records += day.records;
            bucket.pnl += day.pnl;
            bucket.wins += day.wins;
            bucket.losses += day.losses;
        }
        weeks.push(bucket);

        monday += Duration::days(7);
        week += 1;
    }
    Ok(weeks)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: u32,
    pub records: usize,
    pub pnl: Money,
    pub wins: usize,
    pub losses: usize,
    pub break_evens: usize,
    pub win_rate: f64,
}

/// Twelve buckets for a year, January first.
pub fn monthly_breakdown<R: PnlRecord>(records: &[R], tz: &Tz, year: i32) -> Vec<MonthBucket> {
    let mut months: Vec<MonthBucket> = (1..=12)
        .map(|month| MonthBucket {
            month,
            records: 0,
            pnl: Money::ZERO,
            wins: 0,
            losses: 0,
            break_evens: 0,
            win_rate: 0.0,
        })
        .collect();

    for (date, day) in daily_buckets(records, tz) {
        if date.year() != year {
            continue;
        }
        let bucket = &mut months[date.month0() as usize];
        bucket.records += day.records;
        bucket.pnl += day.pnl;
        bucket.wins += day.wins;
        bucket.losses += day.losses;
        bucket.break_evens += day.break_evens;
    }

    for bucket in &mut months {
        let decided = bucket.wins + bucket.losses;
        if decided > 0 {
            bucket.win_rate = bucket.wins as f64 * 100.0 / decided as f64;
        }
    }
    months
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(2024, 2).unwrap().1, day(2024, 2, 29));
        assert_eq!(month_bounds(2025, 12).unwrap().1, day(2025, 12, 31));
        assert!(month_bounds(2025, 0).is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2025-06").unwrap(), (2025, 6));
        assert_eq!(parse_month("2025-6").unwrap(), (2025, 6));
        assert!(matches!(parse_month("2025-13"), Err(DomainError::InvalidMonth(_))));
        assert!(parse_month("june").is_err());
    }

    #[test]
    fn test_calendar_tones() {
        let records = vec![
            win(day(2025, 6, 2), "+50"),
            loss(day(2025, 6, 3), "-20"),
            win(day(2025, 6, 4), "10"),
            loss(day(2025, 6, 4), "-10"),
            open(day(2025, 6, 5)),
        ];
        let cal = month_calendar(&records, &Tz::UTC, 2025, 6).unwrap();
        assert_eq!(cal.cells.len(), 30);
        // June 1st 2025 is a Sunday
        assert_eq!(cal.leading_blanks, 6);

        let tone = |d: usize| cal.cells[d - 1].tone;
        assert_eq!(tone(2), DayTone::Profit);
        assert_eq!(tone(3), DayTone::Loss);
        assert_eq!(tone(4), DayTone::Flat);
        assert_eq!(tone(5), DayTone::Open);
        assert_eq!(tone(6), DayTone::Empty);
        assert_eq!(cal.cells[1].pnl.to_storage(), "50.00");
    }

    #[test]
    fn test_open_records_do_not_add_pnl() {
        let mut rec = open(day(2025, 6, 5));
        rec.pnl = Money::parse_lenient("999");
        let days = daily_buckets(&[rec], &Tz::UTC);
        assert!(days[&day(2025, 6, 5)].pnl.is_zero());
        assert_eq!(days[&day(2025, 6, 5)].records, 1);
    }

    #[test]
    fn test_weekly_breakdown_clips_to_month() {
        let records = vec![
            win(day(2025, 6, 1), "10"),
            win(day(2025, 6, 2), "5"),
            loss(day(2025, 6, 8), "-3"),
            win(day(2025, 6, 30), "7"),
        ];
        let weeks = weekly_breakdown(&records, &Tz::UTC, 2025, 6, day(2025, 6, 4)).unwrap();
        assert_eq!(weeks.len(), 6);
        // week 1 is just Sunday the 1st
        assert_eq!((weeks[0].start, weeks[0].end), (day(2025, 6, 1), day(2025, 6, 1)));
        assert_eq!(weeks[0].records, 1);
        assert_eq!((weeks[1].start, weeks[1].end), (day(2025, 6, 2), day(2025, 6, 8)));
        assert_eq!((weeks[1].wins, weeks[1].losses), (1, 1));
        assert_eq!(weeks[1].pnl.to_storage(), "2.00");
        assert!(weeks[1].is_current_week);
        assert!(!weeks[0].is_current_week);
        assert_eq!((weeks[5].start, weeks[5].end), (day(2025, 6, 30), day(2025, 6, 30)));
        assert_eq!(weeks[5].label, "Week 6");
    }

    #[test]
    fn test_monthly_breakdown() {
        let records = vec![
            win(day(2025, 1, 10), "10"),
            loss(day(2025, 1, 11), "-5"),
            be(day(2025, 3, 1)),
            win(day(2024, 1, 10), "100"),
        ];
        let months = monthly_breakdown(&records, &Tz::UTC, 2025);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].records, 2);
        assert_eq!(months[0].win_rate, 50.0);
        assert_eq!(months[0].pnl.to_storage(), "5.00");
        assert_eq!(months[2].break_evens, 1);
        assert_eq!(months[2].win_rate, 0.0);
    }
}
