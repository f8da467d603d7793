use super::{
    Direction, FieldFilter, FilterOp, FilterValue, RawDocument, RecordQuery, TimestampEncoding,
};
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── runQuery request body ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    FieldFilter(FieldFilterBody),
    CompositeFilter(CompositeFilterBody),
}

#[derive(Debug, Serialize)]
pub struct FieldFilterBody {
    pub field: FieldReference,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct CompositeFilterBody {
    pub op: &'static str,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Serialize)]
pub struct Order {
    pub field: FieldReference,
    pub direction: Direction,
}

impl RunQueryRequest {
    pub fn build(query: &RecordQuery, encoding: TimestampEncoding) -> Self {
        let mut filters: Vec<Filter> = query
            .filters
            .iter()
            .map(|f| Filter::FieldFilter(field_filter(f, encoding)))
            .collect();

        // Firestore rejects composite filters with fewer than two members.
        let filter = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::CompositeFilter(CompositeFilterBody {
                op: "AND",
                filters,
            })),
        };

        let order_by = query
            .order_by
            .iter()
            .map(|o| Order {
                field: FieldReference {
                    field_path: o.field.clone(),
                },
                direction: o.direction,
            })
            .collect();

        Self {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: query.collection.clone(),
                }],
                filter,
                order_by,
                limit: query.limit,
            },
        }
    }
}

fn field_filter(f: &FieldFilter, encoding: TimestampEncoding) -> FieldFilterBody {
    FieldFilterBody {
        field: FieldReference {
            field_path: f.field.clone(),
        },
        op: f.op,
        value: encode_value(&f.value, encoding),
    }
}

fn encode_value(value: &FilterValue, encoding: TimestampEncoding) -> Value {
    match (value, encoding) {
        (FilterValue::String(s), _) => serde_json::json!({ "stringValue": s }),
        (FilterValue::Timestamp(ts), TimestampEncoding::Native) => {
            serde_json::json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
        }
        (FilterValue::Timestamp(ts), TimestampEncoding::Iso8601) => {
            serde_json::json!({ "stringValue": naive_iso(ts) })
        }
    }
}

/// Offset-less ISO form, matching how string timestamps are stored.
/// Whole seconds omit the fraction so bounds compare correctly as strings.
fn naive_iso(ts: &DateTime<Utc>) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

// ── runQuery response ──

/// One element of the runQuery response array. Elements without a
/// document only carry progress info (readTime, skippedResults).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryItem {
    pub document: Option<Document>,
    #[allow(dead_code)]
    pub read_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: Option<String>,
    pub fields: Option<Map<String, Value>>,
    #[allow(dead_code)]
    pub create_time: Option<String>,
    #[allow(dead_code)]
    pub update_time: Option<String>,
}

impl Document {
    /// Document id is the last segment of the resource name.
    pub fn id(&self) -> String {
        self.name
            .as_deref()
            .and_then(|n| n.rsplit('/').next())
            .unwrap_or_default()
            .to_string()
    }

    pub fn into_raw(self) -> RawDocument {
        let id = self.id();
        let fields = self.fields.as_ref().map(decode_fields).unwrap_or_default();
        RawDocument { id, fields }
    }
}

/// Decode a Firestore `fields` map into plain JSON.
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

/// Decode a single typed Firestore value (`{"stringValue": "x"}` etc.).
pub fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "booleanValue" | "referenceValue" | "bytesValue"
        | "geoPointValue" | "doubleValue" => inner.clone(),
        // int64 travels as a decimal string
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_decode_scalar_values() {
        assert_eq!(decode_value(&json!({"stringValue": "win"})), json!("win"));
        assert_eq!(decode_value(&json!({"integerValue": "42"})), json!(42));
        assert_eq!(decode_value(&json!({"doubleValue": 1.85})), json!(1.85));
        assert_eq!(decode_value(&json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})), Value::Null);
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-03-02T18:30:00Z"})),
            json!("2024-03-02T18:30:00Z")
        );
    }

    #[test]
    fn test_decode_nested_values() {
        let v = json!({
            "mapValue": {"fields": {
                "home": {"integerValue": "1"},
                "tags": {"arrayValue": {"values": [{"stringValue": "live"}]}}
            }}
        });
        assert_eq!(decode_value(&v), json!({"home": 1, "tags": ["live"]}));
        assert_eq!(decode_value(&json!({"arrayValue": {}})), json!([]));
    }

    #[test]
    fn test_document_id_and_fields() {
        let item: RunQueryItem = serde_json::from_value(json!({
            "document": {
                "name": "projects/p/databases/(default)/documents/resolved_bets/abc123",
                "fields": {"outcome": {"stringValue": "loss"}},
                "createTime": "2024-03-02T18:30:00Z"
            },
            "readTime": "2024-03-02T18:31:00Z"
        }))
        .unwrap();

        let raw = item.document.unwrap().into_raw();
        assert_eq!(raw.id, "abc123");
        assert_eq!(raw.fields.get("outcome"), Some(&json!("loss")));
    }

    #[test]
    fn test_read_time_only_item_has_no_document() {
        let item: RunQueryItem = serde_json::from_value(json!({"readTime": "2024-03-02T18:31:00Z"})).unwrap();
        assert!(item.document.is_none());
    }

    #[test]
    fn test_request_without_filters_has_no_where() {
        let q = RecordQuery::new("resolved_bets").limit(10);
        let body =
            serde_json::to_value(RunQueryRequest::build(&q, TimestampEncoding::Native)).unwrap();
        assert_eq!(
            body,
            json!({"structuredQuery": {"from": [{"collectionId": "resolved_bets"}], "limit": 10}})
        );
    }

    #[test]
    fn test_request_single_filter_is_field_filter() {
        let q = RecordQuery::new("resolved_bets")
            .filter("league", FilterOp::Equal, FilterValue::String("EPL".into()))
            .order_by("placed_at", Direction::Descending);
        let body =
            serde_json::to_value(RunQueryRequest::build(&q, TimestampEncoding::Native)).unwrap();
        let sq = &body["structuredQuery"];
        assert_eq!(
            sq["where"],
            json!({"fieldFilter": {
                "field": {"fieldPath": "league"},
                "op": "EQUAL",
                "value": {"stringValue": "EPL"}
            }})
        );
        assert_eq!(
            sq["orderBy"],
            json!([{"field": {"fieldPath": "placed_at"}, "direction": "DESCENDING"}])
        );
        assert!(sq.get("limit").is_none());
    }

    #[test]
    fn test_request_range_is_composite_and() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let q = RecordQuery::new("resolved_bets")
            .filter("placed_at", FilterOp::GreaterThanOrEqual, FilterValue::Timestamp(start))
            .filter("placed_at", FilterOp::LessThanOrEqual, FilterValue::Timestamp(start));
        let body =
            serde_json::to_value(RunQueryRequest::build(&q, TimestampEncoding::Native)).unwrap();
        let composite = &body["structuredQuery"]["where"]["compositeFilter"];
        assert_eq!(composite["op"], "AND");
        assert_eq!(composite["filters"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            composite["filters"][0]["fieldFilter"]["op"],
            "GREATER_THAN_OR_EQUAL"
        );
        assert_eq!(
            composite["filters"][0]["fieldFilter"]["value"],
            json!({"timestampValue": "2024-03-01T00:00:00Z"})
        );
    }

    #[test]
    fn test_iso_encoding_uses_string_values() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc
            .with_ymd_and_hms(2024, 3, 31, 23, 59, 59)
            .unwrap()
            .with_nanosecond(999_999_000)
            .unwrap();
        assert_eq!(
            encode_value(&FilterValue::Timestamp(start), TimestampEncoding::Iso8601),
            json!({"stringValue": "2024-03-01T00:00:00"})
        );
        assert_eq!(
            encode_value(&FilterValue::Timestamp(end), TimestampEncoding::Iso8601),
            json!({"stringValue": "2024-03-31T23:59:59.999999"})
        );
    }
}
