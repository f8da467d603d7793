use super::round2;
use crate::records::{BetRecord, Outcome};

/// Headline performance figures under the unit-stake model.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct KpiSummary {
    pub total_bets: usize,
    pub win_rate: f64,
    pub net_profit: i64,
    pub roi: f64,
    pub biggest_win_streak: u32,
    pub biggest_loss_streak: u32,
}

/// Compute KPIs over `records`. Pure function.
/// Streaks follow the order given; callers sort first when chronology matters.
pub fn summarize(records: &[BetRecord]) -> KpiSummary {
    let total = records.len();
    if total == 0 {
        return KpiSummary::default();
    }

    let wins = records.iter().filter(|r| r.outcome == Outcome::Win).count();
    let net_profit: i64 = records.iter().map(|r| r.outcome.unit_profit()).sum();
    let (biggest_win_streak, biggest_loss_streak) = streaks(records);

    KpiSummary {
        total_bets: total,
        win_rate: round2(wins as f64 / total as f64 * 100.0),
        net_profit,
        roi: round2(net_profit as f64 / total as f64 * 100.0),
        biggest_win_streak,
        biggest_loss_streak,
    }
}

/// Longest (win, loss) runs. Unknown outcomes neither extend nor break a run.
fn streaks(records: &[BetRecord]) -> (u32, u32) {
    let (mut cur_win, mut best_win) = (0u32, 0u32);
    let (mut cur_loss, mut best_loss) = (0u32, 0u32);

    for rec in records {
        match rec.outcome {
            Outcome::Win => {
                cur_win += 1;
                best_win = best_win.max(cur_win);
                cur_loss = 0;
            }
            Outcome::Loss => {
                cur_loss += 1;
                best_loss = best_loss.max(cur_loss);
                cur_win = 0;
            }
            Outcome::Unknown => {}
        }
    }

    (best_win, best_loss)
}
