//! The date-indexed column model: raw fetched series and the aligned
//! monthly table derived from them.
//!
//! A [`Series`] is a sparse, possibly irregular run of dated observations.
//! A [`RawTable`] is the outer union of named series — no dates dropped,
//! absent cells are simply absent. An [`AlignedTable`] is the strictly
//! monthly, forward-filled product of [`crate::align::align`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The name of the aligned table's date index.
pub const INDEX_NAME: &str = "Date";

// ─── Series ──────────────────────────────────────────────────────────────────

/// A single dated sequence of numeric observations, sorted and unique by
/// date (last insert wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
  observations: BTreeMap<NaiveDate, f64>,
}

impl Series {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, date: NaiveDate, value: f64) {
    self.observations.insert(date, value);
  }

  pub fn is_empty(&self) -> bool {
    self.observations.is_empty()
  }

  pub fn len(&self) -> usize {
    self.observations.len()
  }

  /// Observations in ascending date order.
  pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    self.observations.iter().map(|(d, v)| (*d, *v))
  }
}

impl FromIterator<(NaiveDate, f64)> for Series {
  fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
    Self {
      observations: iter.into_iter().collect(),
    }
  }
}

// ─── Raw table ───────────────────────────────────────────────────────────────

/// Named series unioned on their date index. Column order is insertion
/// order (the fetch order of the request).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
  columns: Vec<(String, Series)>,
}

impl RawTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a fetched column. A repeated name replaces the earlier column.
  pub fn push_column(&mut self, name: impl Into<String>, series: Series) {
    let name = name.into();
    self.columns.retain(|(n, _)| *n != name);
    self.columns.push((name, series));
  }

  /// A table with zero columns — the "no data" result of a fully failed
  /// fetch. Distinct from an error by construction.
  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }

  pub fn column_names(&self) -> impl Iterator<Item = &str> {
    self.columns.iter().map(|(n, _)| n.as_str())
  }

  pub fn column(&self, name: &str) -> Option<&Series> {
    self
      .columns
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, s)| s)
  }

  pub fn columns(&self) -> impl Iterator<Item = (&str, &Series)> {
    self.columns.iter().map(|(n, s)| (n.as_str(), s))
  }
}

// ─── Aligned table ───────────────────────────────────────────────────────────

/// One month-end row of the aligned table. `values` is positional over
/// the table's column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
  pub date:   NaiveDate,
  pub values: Vec<Option<f64>>,
}

/// The monthly aligned output table.
///
/// Invariants, maintained by [`crate::align::align`]:
/// - row dates are strictly ascending, unique, and all month-end;
/// - `values.len() == columns.len()` for every row;
/// - the target column is non-null in every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedTable {
  columns: Vec<String>,
  rows:    Vec<AlignedRow>,
}

impl AlignedTable {
  pub fn new(columns: Vec<String>, rows: Vec<AlignedRow>) -> Self {
    debug_assert!(rows.iter().all(|r| r.values.len() == columns.len()));
    Self { columns, rows }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn rows(&self) -> &[AlignedRow] {
    &self.rows
  }

  /// Positional index of a named column.
  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  /// Value of `name` on the row at `row_idx`, if both exist.
  pub fn value(&self, row_idx: usize, name: &str) -> Option<f64> {
    let col = self.column_index(name)?;
    self.rows.get(row_idx)?.values.get(col).copied().flatten()
  }
}
