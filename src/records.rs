//! Resolved-bet schema. Documents are validated here once, at ingestion;
//! everything downstream works with typed fields and explicit defaults.

use crate::errors::{DashboardError, DashboardResult};
use crate::store::RawDocument;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const UNKNOWN: &str = "Unknown";

/// Timestamp field that drives the date range, the query ordering and every
/// date-keyed aggregate.
pub const PLACED_AT: &str = "placed_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Unknown,
}

impl Outcome {
    /// Exact match only: anything other than "win"/"loss" is unknown.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "win" => Self::Win,
            "loss" => Self::Loss,
            _ => Self::Unknown,
        }
    }

    /// Unit-stake profit: a win gains one unit, anything else costs one.
    #[inline]
    pub fn unit_profit(self) -> i64 {
        if self == Self::Win {
            1
        } else {
            -1
        }
    }
}

/// Bet market. Each variant maps to the score snapshot it is judged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetType {
    FirstHalf,
    Other(String),
}

impl BetType {
    pub const FIRST_HALF: &'static str = "first_half";

    pub fn from_wire(s: &str) -> Self {
        if s == Self::FIRST_HALF {
            Self::FirstHalf
        } else {
            Self::Other(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::FirstHalf => Self::FIRST_HALF,
            Self::Other(s) => s,
        }
    }

    /// Document field holding the initial score for this bet type.
    pub fn score_field(&self) -> &'static str {
        match self {
            Self::FirstHalf => "first_half_score",
            Self::Other(_) => "initial_score",
        }
    }
}

impl Default for BetType {
    fn default() -> Self {
        Self::Other(UNKNOWN.to_string())
    }
}

impl Serialize for BetType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetRecord {
    pub id: String,
    pub outcome: Outcome,
    pub placed_at: Option<DateTime<Utc>>,
    pub resolved_at: DateTime<Utc>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_name: Option<String>,
    pub league: String,
    pub country: String,
    pub bet_type: BetType,
    /// Score snapshot read from `bet_type.score_field()`. The raw score
    /// fields stay in `extra`.
    #[serde(skip)]
    pub initial_score: Option<String>,
    /// Fields this service does not interpret (scores, odds, selection, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BetRecord {
    /// Validate and normalize a raw document. `now` stands in for a missing
    /// `resolved_at`. Fails only when a known field has the wrong type.
    pub fn from_document(doc: RawDocument, now: DateTime<Utc>) -> DashboardResult<Self> {
        let RawDocument { id, mut fields } = doc;
        if id.is_empty() {
            return Err(malformed("<unnamed>", "document has no id"));
        }

        // the store id always wins over any stored "id" field
        fields.remove("id");

        let outcome = match fields.remove("outcome") {
            None | Some(Value::Null) => Outcome::Unknown,
            Some(Value::String(s)) => Outcome::from_wire(&s),
            Some(other) => return Err(malformed(&id, &format!("outcome is not a string: {other}"))),
        };

        let placed_at = match fields.remove(PLACED_AT) {
            None | Some(Value::Null) => None,
            Some(v) => {
                let parsed = v.as_str().and_then(parse_timestamp);
                if parsed.is_none() {
                    tracing::warn!(id = %id, value = %v, "unparseable placed_at");
                }
                parsed
            }
        };

        let resolved_at = match fields.remove("resolved_at") {
            None | Some(Value::Null) => now,
            Some(v) => v.as_str().and_then(parse_timestamp).unwrap_or_else(|| {
                tracing::warn!(id = %id, value = %v, "unparseable resolved_at, using now");
                now
            }),
        };

        let match_name = take_string(&mut fields, &id, "match")?;
        let league = take_string(&mut fields, &id, "league")?.unwrap_or_else(|| UNKNOWN.into());
        let country = take_string(&mut fields, &id, "country")?.unwrap_or_else(|| UNKNOWN.into());
        let bet_type = take_string(&mut fields, &id, "bet_type")?
            .map(|s| BetType::from_wire(&s))
            .unwrap_or_default();
        let initial_score = read_score(&fields, &id, bet_type.score_field())?;

        Ok(Self {
            id,
            outcome,
            placed_at,
            resolved_at,
            match_name,
            league,
            country,
            bet_type,
            initial_score,
            extra: fields,
        })
    }

    /// Initial-score category key.
    pub fn score_key(&self) -> &str {
        self.initial_score.as_deref().unwrap_or(UNKNOWN)
    }
}

fn malformed(id: &str, reason: &str) -> DashboardError {
    DashboardError::MalformedRecord {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn take_string(
    fields: &mut Map<String, Value>,
    id: &str,
    key: &str,
) -> DashboardResult<Option<String>> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(malformed(id, &format!("{key} is not a string: {other}"))),
    }
}

/// Scores may be stored as "1-0" strings or bare numbers.
fn read_score(fields: &Map<String, Value>, id: &str, key: &str) -> DashboardResult<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(malformed(id, &format!("{key} is not a scalar: {other}"))),
    }
}

/// Parse an ISO-8601 timestamp. Offset-less values are taken as UTC and a
/// bare date means midnight.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
