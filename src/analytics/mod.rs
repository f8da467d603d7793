//! Dashboard aggregation. All functions are pure: records in, figures out.

pub mod breakdown;
pub mod kpi;
pub mod trend;

use crate::records::BetRecord;
use breakdown::{Breakdown, Breakdowns};
use kpi::KpiSummary;
use trend::{DailyResult, TrendPoint};

/// Everything the chart UI needs for one request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DashboardData {
    pub kpis: KpiSummary,
    pub performance_by_league: Breakdown,
    pub performance_by_type: Breakdown,
    pub performance_by_country: Breakdown,
    pub performance_by_day: Breakdown,
    pub performance_by_initial_score: Breakdown,
    pub profit_trend: Vec<TrendPoint>,
    pub daily_results: Vec<DailyResult>,
    pub recent_bets: Vec<BetRecord>,
}

/// Two-decimal rounding, ties to even (3.125 -> 3.12).
#[inline]
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Build the full dashboard from fetched records (most recent first).
///
/// `recent_bets` keeps fetch order. Everything else is computed after a
/// stable ascending sort on placed_at, so streaks are chronological;
/// undated records sort first.
pub fn build_dashboard(mut records: Vec<BetRecord>, recent_limit: usize) -> DashboardData {
    let recent_bets: Vec<BetRecord> = records.iter().take(recent_limit).cloned().collect();

    records.sort_by_key(|r| r.placed_at);

    let kpis = kpi::summarize(&records);
    let Breakdowns {
        by_league,
        by_type,
        by_country,
        by_day,
        by_initial_score,
    } = breakdown::breakdowns(&records);
    let daily_results = trend::daily_results(&records);
    let profit_trend = trend::cumulative_trend(&daily_results);

    tracing::debug!(
        total = kpis.total_bets,
        days = daily_results.len(),
        leagues = by_league.len(),
        "dashboard aggregated"
    );

    DashboardData {
        kpis,
        performance_by_league: by_league,
        performance_by_type: by_type,
        performance_by_country: by_country,
        performance_by_day: by_day,
        performance_by_initial_score: by_initial_score,
        profit_trend,
        daily_results,
        recent_bets,
    }
}
