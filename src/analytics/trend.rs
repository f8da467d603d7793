use crate::records::{BetRecord, Outcome};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DailyResult {
    pub date: String,
    pub wins: u32,
    /// Every non-win, so that `net == wins - losses`.
    pub losses: u32,
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub cumulative_profit: i64,
}

/// Group records by the UTC calendar date they were placed, ascending.
/// Records without a placed_at are skipped.
pub fn daily_results(records: &[BetRecord]) -> Vec<DailyResult> {
    let mut days: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();

    for rec in records {
        let Some(ts) = rec.placed_at else {
            tracing::debug!(id = %rec.id, "no placed_at, skipped for trend");
            continue;
        };
        let day = days.entry(ts.date_naive()).or_default();
        if rec.outcome == Outcome::Win {
            day.0 += 1;
        } else {
            day.1 += 1;
        }
    }

    days.into_iter()
        .map(|(date, (wins, losses))| DailyResult {
            date: date.format("%Y-%m-%d").to_string(),
            wins,
            losses,
            net: wins as i64 - losses as i64,
        })
        .collect()
}

/// Running sum of daily net deltas. Input must already be date-ordered.
pub fn cumulative_trend(daily: &[DailyResult]) -> Vec<TrendPoint> {
    daily
        .iter()
        .scan(0i64, |total, day| {
            *total += day.net;
            Some(TrendPoint {
                date: day.date.clone(),
                cumulative_profit: *total,
            })
        })
        .collect()
}
