use crate::errors::{DashboardError, DashboardResult};
use crate::records::{parse_timestamp, BetRecord, PLACED_AT};
use crate::store::{Direction, DocumentStore, FilterOp, FilterValue, RawDocument, RecordQuery};
use chrono::{DateTime, NaiveDate, Utc};

/// Parsed request filters. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub match_name: Option<String>,
    pub league: Option<String>,
}

impl BetFilter {
    /// Parse raw query-string values. Empty strings count as absent.
    /// A bare end date covers that whole day.
    pub fn parse(
        start_date: Option<&str>,
        end_date: Option<&str>,
        match_name: Option<&str>,
        league: Option<&str>,
    ) -> DashboardResult<Self> {
        Ok(Self {
            start: parse_bound("start_date", start_date, false)?,
            end: parse_bound("end_date", end_date, true)?,
            match_name: non_empty(match_name),
            league: non_empty(league),
        })
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_bound(
    name: &str,
    raw: Option<&str>,
    end_of_day: bool,
) -> DashboardResult<Option<DateTime<Utc>>> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };

    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        let naive = if end_of_day {
            date.and_hms_micro_opt(23, 59, 59, 999_999)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        return Ok(naive.map(|n| n.and_utc()));
    }

    parse_timestamp(&raw).map(Some).ok_or_else(|| {
        DashboardError::InvalidFilter(format!("{name}: not an ISO-8601 date: {raw}"))
    })
}

/// Reads resolved bets from the document store. Never fails: a broken
/// primary query falls back to a small unfiltered sample, then to nothing.
pub struct BetFetcher<S> {
    store: S,
    collection: String,
    fallback_limit: u32,
}

impl<S: DocumentStore> BetFetcher<S> {
    pub fn new(store: S, collection: &str, fallback_limit: u32) -> Self {
        Self {
            store,
            collection: collection.to_string(),
            fallback_limit,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Range and ordering both use `placed_at`, the field the aggregates
    /// are keyed on.
    pub fn primary_query(&self, filter: &BetFilter) -> RecordQuery {
        let mut q = RecordQuery::new(&self.collection);
        if let Some(start) = filter.start {
            q = q.filter(PLACED_AT, FilterOp::GreaterThanOrEqual, FilterValue::Timestamp(start));
        }
        if let Some(end) = filter.end {
            q = q.filter(PLACED_AT, FilterOp::LessThanOrEqual, FilterValue::Timestamp(end));
        }
        if let Some(m) = &filter.match_name {
            q = q.filter("match", FilterOp::Equal, FilterValue::String(m.clone()));
        }
        if let Some(l) = &filter.league {
            q = q.filter("league", FilterOp::Equal, FilterValue::String(l.clone()));
        }
        q.order_by(PLACED_AT, Direction::Descending)
    }

    pub fn fallback_query(&self) -> RecordQuery {
        RecordQuery::new(&self.collection).limit(self.fallback_limit)
    }

    pub async fn fetch(&self, filter: &BetFilter) -> Vec<BetRecord> {
        let docs = match self.store.run_query(&self.primary_query(filter)).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(error = %e, "bet query failed, trying unfiltered fallback");
                match self.store.run_query(&self.fallback_query()).await {
                    Ok(docs) => {
                        tracing::warn!(count = docs.len(), "serving fallback sample");
                        docs
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "fallback query failed");
                        return Vec::new();
                    }
                }
            }
        };

        let bets = normalize(docs, Utc::now());
        tracing::info!(count = bets.len(), "fetched resolved bets");
        bets
    }

    /// Unfiltered raw sample, errors surfaced. Used by the debug endpoint.
    pub async fn sample(&self, limit: u32) -> DashboardResult<Vec<RawDocument>> {
        self.store
            .run_query(&RecordQuery::new(&self.collection).limit(limit))
            .await
    }
}

fn normalize(docs: Vec<RawDocument>, now: DateTime<Utc>) -> Vec<BetRecord> {
    let total = docs.len();
    let bets: Vec<BetRecord> = docs
        .into_iter()
        .filter_map(|doc| match BetRecord::from_document(doc, now) {
            Ok(bet) => Some(bet),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed record");
                None
            }
        })
        .collect();

    if bets.len() < total {
        tracing::warn!(skipped = total - bets.len(), total, "some records were malformed");
    }
    bets
}
