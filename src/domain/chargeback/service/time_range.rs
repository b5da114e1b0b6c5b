use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::domain::chargeback::model::{Interval, RangeOptions, TimeRange};
use crate::errors::{ChargebackError, ChargebackResult};

/// Resolves the report range in `tz`, returned in UTC.
pub fn resolve_range<Tz: TimeZone>(
    options: &RangeOptions,
    interval: Interval,
    tz: &Tz,
    now: DateTime<Utc>,
) -> ChargebackResult<TimeRange> {
    match (options.start_time, options.end_time) {
        (Some(start), Some(end)) => return Ok(TimeRange::new(start, end)),
        (None, None) => {}
        _ => {
            return Err(ChargebackError::Config(
                "start_time and end_time must be given together".into(),
            ))
        }
    }

    let count = options
        .interval_count
        .filter(|c| *c > 0)
        .ok_or_else(|| ChargebackError::Config("interval_count must be at least 1".into()))?;
    let end_offset = options.end_interval_offset.unwrap_or(0);
    let start_offset = end_offset.checked_add(count - 1).ok_or_else(|| {
        ChargebackError::Config(format!(
            "end_interval_offset {end_offset} plus interval_count {count} is out of range"
        ))
    })?;

    let current = period_start_date(now.with_timezone(tz).date_naive(), interval)?;
    let start_date = shift_back(current, interval, start_offset)?;
    let end_date = shift_back(current, interval, end_offset)?;

    let start = local_midnight(tz, start_date)?;
    let end = local_midnight(tz, next_period_start_date(end_date, interval)?)? - Duration::seconds(1);

    Ok(TimeRange::new(
        start.with_timezone(&Utc),
        end.with_timezone(&Utc),
    ))
}

impl TimeRange {
    /// Consecutive one-day query windows covering `[start, end)` exactly.
    pub fn day_windows(&self) -> Vec<TimeRange> {
        let mut windows = Vec::new();
        let mut cursor = self.start;

        while cursor < self.end {
            let next = (cursor + Duration::days(1)).min(self.end);
            windows.push(TimeRange::new(cursor, next));
            cursor = next;
        }

        windows
    }
}

/// Start of the period containing `ts`: local midnight of the day, of
/// Monday for weeks, of the first for months.
pub fn period_start<Tz: TimeZone>(ts: &DateTime<Tz>, interval: Interval) -> ChargebackResult<DateTime<Tz>> {
    let date = period_start_date(ts.date_naive(), interval)?;
    local_midnight(&ts.timezone(), date)
}

/// Last second of the period containing `ts`.
pub fn period_end<Tz: TimeZone>(ts: &DateTime<Tz>, interval: Interval) -> ChargebackResult<DateTime<Tz>> {
    let start = period_start_date(ts.date_naive(), interval)?;
    let next = local_midnight(&ts.timezone(), next_period_start_date(start, interval)?)?;
    Ok(next - Duration::seconds(1))
}

/// Display label of the period starting at `start`.
pub fn period_label<Tz: TimeZone>(start: &DateTime<Tz>, interval: Interval) -> String {
    let local = start.naive_local();
    match interval {
        Interval::Daily => local.format("%m/%d/%Y").to_string(),
        Interval::Weekly => format!("Week of {}", local.format("%m/%d/%Y")),
        Interval::Monthly => local.format("%b %Y").to_string(),
    }
}

fn period_start_date(date: NaiveDate, interval: Interval) -> ChargebackResult<NaiveDate> {
    match interval {
        Interval::Daily => Ok(date),
        Interval::Weekly => {
            Ok(date - Duration::days(date.weekday().num_days_from_monday() as i64))
        }
        Interval::Monthly => date
            .with_day(1)
            .ok_or_else(|| ChargebackError::InvalidLocalTime(format!("first day of {date}"))),
    }
}

fn next_period_start_date(start: NaiveDate, interval: Interval) -> ChargebackResult<NaiveDate> {
    let next = match interval {
        Interval::Daily => start.checked_add_signed(Duration::days(1)),
        Interval::Weekly => start.checked_add_signed(Duration::days(7)),
        Interval::Monthly => start.checked_add_months(Months::new(1)),
    };
    next.ok_or_else(|| ChargebackError::InvalidLocalTime(format!("period after {start}")))
}

fn shift_back(start: NaiveDate, interval: Interval, intervals: u32) -> ChargebackResult<NaiveDate> {
    let shifted = match interval {
        Interval::Daily => start.checked_sub_signed(Duration::days(intervals as i64)),
        Interval::Weekly => start.checked_sub_signed(Duration::days(7 * intervals as i64)),
        Interval::Monthly => start.checked_sub_months(Months::new(intervals)),
    };
    shifted.ok_or_else(|| {
        ChargebackError::Config(format!("{intervals} {interval} intervals before {start} is out of range"))
    })
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> ChargebackResult<DateTime<Tz>> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| ChargebackError::InvalidLocalTime(naive.to_string()))
}
