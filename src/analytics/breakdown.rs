use super::round2;
use crate::records::{BetRecord, Outcome};
use std::collections::BTreeMap;

/// Raw win/loss counts for one category key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
}

impl Tally {
    /// Only exact wins and losses are counted.
    #[inline]
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Unknown => {}
        }
    }

    pub fn win_rate(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided == 0 {
            return 0.0;
        }
        round2(self.wins as f64 / decided as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CategoryPerformance {
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
}

impl From<Tally> for CategoryPerformance {
    fn from(t: Tally) -> Self {
        Self {
            wins: t.wins,
            losses: t.losses,
            win_rate: t.win_rate(),
        }
    }
}

pub type Breakdown = BTreeMap<String, CategoryPerformance>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakdowns {
    pub by_league: Breakdown,
    pub by_type: Breakdown,
    pub by_country: Breakdown,
    pub by_day: Breakdown,
    pub by_initial_score: Breakdown,
}

#[derive(Debug, Default)]
struct Counters {
    league: BTreeMap<String, Tally>,
    bet_type: BTreeMap<String, Tally>,
    country: BTreeMap<String, Tally>,
    day: BTreeMap<String, Tally>,
    initial_score: BTreeMap<String, Tally>,
}

impl Counters {
    fn observe(&mut self, rec: &BetRecord) {
        bump(&mut self.league, &rec.league, rec.outcome);
        bump(&mut self.bet_type, rec.bet_type.as_str(), rec.outcome);
        bump(&mut self.country, &rec.country, rec.outcome);
        bump(&mut self.initial_score, rec.score_key(), rec.outcome);

        match rec.placed_at {
            Some(ts) => bump(&mut self.day, &ts.format("%A").to_string(), rec.outcome),
            None => tracing::debug!(id = %rec.id, "no placed_at, skipped for day-of-week"),
        }
    }

    fn finish(self) -> Breakdowns {
        Breakdowns {
            by_league: convert(self.league),
            by_type: convert(self.bet_type),
            by_country: convert(self.country),
            by_day: convert(self.day),
            by_initial_score: convert(self.initial_score),
        }
    }
}

fn bump(map: &mut BTreeMap<String, Tally>, key: &str, outcome: Outcome) {
    if let Some(t) = map.get_mut(key) {
        t.record(outcome);
    } else {
        map.entry(key.to_string()).or_default().record(outcome);
    }
}

fn convert(map: BTreeMap<String, Tally>) -> Breakdown {
    map.into_iter().map(|(k, t)| (k, t.into())).collect()
}

/// One pass over `records`, counting wins/losses per category. Pure function.
pub fn breakdowns(records: &[BetRecord]) -> Breakdowns {
    let mut counters = Counters::default();
    for rec in records {
        counters.observe(rec);
    }
    counters.finish()
}
