//! JSON row encoding for the PostgREST wire.
//!
//! Nulls are written explicitly: an omitted field would leave the remote
//! column untouched on upsert, which is not the replace semantics we want.

use chrono::NaiveDate;
use randwatch_core::{factor::KEEP_COLUMNS, frame::INDEX_NAME, store::SnapshotRow};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// ISO day format used for the remote date key.
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_row(row: &SnapshotRow) -> Value {
  let mut map = Map::new();
  map.insert(
    INDEX_NAME.to_string(),
    Value::String(row.date.format(DATE_FORMAT).to_string()),
  );
  for (name, value) in &row.values {
    let json = value
      .and_then(Number::from_f64)
      .map(Value::Number)
      .unwrap_or(Value::Null);
    map.insert(name.clone(), json);
  }
  Value::Object(map)
}

pub fn decode_row(value: &Value) -> Result<SnapshotRow> {
  let map = value
    .as_object()
    .ok_or_else(|| Error::MalformedRow(format!("expected object, got {value}")))?;

  let date_str = map
    .get(INDEX_NAME)
    .and_then(Value::as_str)
    .ok_or_else(|| Error::MalformedRow("missing Date key".to_string()))?;
  let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
    .map_err(|e| Error::MalformedRow(format!("bad date {date_str:?}: {e}")))?;

  // Known columns first, in schema order; anything else after, so rows
  // written by an older deployment still decode.
  let mut values: Vec<(String, Option<f64>)> = Vec::new();
  for col in KEEP_COLUMNS {
    if let Some(v) = map.get(col) {
      values.push((col.to_string(), v.as_f64()));
    }
  }
  for (key, v) in map {
    if key != INDEX_NAME && !KEEP_COLUMNS.contains(&key.as_str()) {
      values.push((key.clone(), v.as_f64()));
    }
  }

  Ok(SnapshotRow { date, values })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row() -> SnapshotRow {
    SnapshotRow {
      date:   NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
      values: vec![
        ("VIX".to_string(), Some(14.5)),
        ("GOLD_PRICE".to_string(), None),
        ("ZAR_USD".to_string(), Some(18.9)),
      ],
    }
  }

  #[test]
  fn encode_writes_iso_date_and_explicit_nulls() {
    let v = encode_row(&row());
    assert_eq!(v["Date"], "2024-01-31");
    assert_eq!(v["VIX"], 14.5);
    assert!(v["GOLD_PRICE"].is_null());
  }

  #[test]
  fn decode_round_trips_known_columns() {
    let decoded = decode_row(&encode_row(&row())).unwrap();
    assert_eq!(decoded.date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    let vix = decoded.values.iter().find(|(n, _)| n == "VIX").unwrap();
    assert_eq!(vix.1, Some(14.5));
    let gold = decoded.values.iter().find(|(n, _)| n == "GOLD_PRICE").unwrap();
    assert_eq!(gold.1, None);
  }

  #[test]
  fn decode_rejects_missing_date() {
    let v = serde_json::json!({ "VIX": 14.5 });
    assert!(decode_row(&v).is_err());
  }

  #[test]
  fn decode_rejects_bad_date() {
    let v = serde_json::json!({ "Date": "31/01/2024" });
    assert!(decode_row(&v).is_err());
  }
}
