//! The monthly aligner: merges heterogeneous raw series into one
//! month-end-indexed table under the fixed schema policy.
//!
//! Resampling takes the *last* observation within each month, not a mean —
//! last-value-wins is the domain convention for point-in-time economic
//! indicators. Forward-fill runs before the null-target row drop; that
//! order is part of the contract, not an accident.

use chrono::{Datelike, NaiveDate};

use crate::{
  factor::{INFLATION_DIFFERENCES, KEEP_COLUMNS, SA_INFLATION, TARGET_COLUMN, USA_INFLATION},
  frame::{AlignedRow, AlignedTable, RawTable},
};

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
  let (year, month) = if date.month() == 12 {
    (date.year() + 1, 1)
  } else {
    (date.year(), date.month() + 1)
  };
  match NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.pred_opt()) {
    Some(d) => d,
    // Unreachable for chrono-representable inputs.
    None => date,
  }
}

/// All month-end dates from the month of `first` through the month of
/// `last`, ascending.
fn month_index(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
  let mut out = Vec::new();
  let mut cursor = month_end(first);
  let stop = month_end(last);
  while cursor <= stop {
    out.push(cursor);
    let next = cursor.succ_opt();
    cursor = match next {
      Some(d) => month_end(d),
      None => break,
    };
  }
  out
}

/// Align `raw` into the monthly output table over the inclusive
/// `[start, end]` window.
///
/// Empty input (or a window containing no observations) yields an empty
/// table; alignment itself cannot fail.
pub fn align(raw: &RawTable, start: NaiveDate, end: NaiveDate) -> AlignedTable {
  // Window clip, and the combined date extent that fixes the monthly index.
  let mut first: Option<NaiveDate> = None;
  let mut last: Option<NaiveDate> = None;
  for (_, series) in raw.columns() {
    for (date, _) in series.iter() {
      if date < start || date > end {
        continue;
      }
      first = Some(first.map_or(date, |f| f.min(date)));
      last = Some(last.map_or(date, |l| l.max(date)));
    }
  }
  let (Some(first), Some(last)) = (first, last) else {
    return AlignedTable::empty();
  };

  let index = month_index(first, last);
  let source_names: Vec<String> = raw.column_names().map(str::to_owned).collect();

  // Last observation per month bucket, then forward-fill down the index.
  let mut filled: Vec<Vec<Option<f64>>> = Vec::with_capacity(source_names.len());
  for name in &source_names {
    let series = raw.column(name).map(|s| s.iter().collect::<Vec<_>>()).unwrap_or_default();
    let mut column: Vec<Option<f64>> = Vec::with_capacity(index.len());
    for &bucket in &index {
      let last_in_month = series
        .iter()
        .filter(|(d, _)| *d >= start && *d <= end)
        .filter(|(d, _)| month_end(*d) == bucket)
        .next_back()
        .map(|(_, v)| *v);
      column.push(last_in_month);
    }
    let mut carry: Option<f64> = None;
    for cell in &mut column {
      match *cell {
        Some(v) => carry = Some(v),
        None => *cell = carry,
      }
    }
    filled.push(column);
  }

  let position = |name: &str| source_names.iter().position(|n| n == name);

  // Derived differential, only when both sources exist in the input schema.
  let differential: Option<Vec<Option<f64>>> =
    match (position(SA_INFLATION), position(USA_INFLATION)) {
      (Some(sa), Some(usa)) => Some(
        (0..index.len())
          .map(|row| match (filled[sa][row], filled[usa][row]) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
          })
          .collect(),
      ),
      _ => None,
    };

  // Prune and order columns: allow-list ∩ present.
  let mut out_columns: Vec<String> = Vec::new();
  let mut out_data: Vec<&[Option<f64>]> = Vec::new();
  for keep in KEEP_COLUMNS {
    if keep == INFLATION_DIFFERENCES {
      if let Some(diff) = differential.as_deref() {
        out_columns.push(keep.to_owned());
        out_data.push(diff);
      }
    } else if let Some(idx) = position(keep) {
      out_columns.push(keep.to_owned());
      out_data.push(&filled[idx]);
    }
  }

  let target_idx = out_columns.iter().position(|c| c == TARGET_COLUMN);

  let mut rows: Vec<AlignedRow> = Vec::with_capacity(index.len());
  for (row, &date) in index.iter().enumerate() {
    let values: Vec<Option<f64>> = out_data.iter().map(|col| col[row]).collect();
    // A row without the target has nothing to explain; drop it. When the
    // target column never fetched at all the schema shrank instead, and
    // every row stays.
    if let Some(t) = target_idx {
      if values[t].is_none() {
        continue;
      }
    }
    rows.push(AlignedRow { date, values });
  }

  AlignedTable::new(out_columns, rows)
}
