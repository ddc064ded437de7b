//! The factor catalogue — which provider series feed the aligned table,
//! and the fixed output schema it is pruned to.
//!
//! Column names are plain strings rather than an enum: a series that fails
//! to fetch silently shrinks the schema, and the set of requested factors
//! is caller-configurable.

use serde::{Deserialize, Serialize};

// ─── Output schema ───────────────────────────────────────────────────────────

/// The single column the whole pipeline exists to explain. Rows without a
/// value here are dropped from the aligned table.
pub const TARGET_COLUMN: &str = "ZAR_USD";

/// Inflation source columns; fetched but not published directly.
pub const SA_INFLATION: &str = "SA_INFLATION";
pub const USA_INFLATION: &str = "USA_INFLATION";

/// Derived column: `SA_INFLATION - USA_INFLATION`. Present in the output
/// only when both source columns survived the fetch.
pub const INFLATION_DIFFERENCES: &str = "INFLATION_DIFFERENCES";

/// The allow-list: aligned output is restricted to these columns, in this
/// order, intersected with whatever actually fetched.
pub const KEEP_COLUMNS: [&str; 9] = [
  "EPU(USA)",
  "WUIZAF(SA)",
  "10_YEAR_BOND_RATES(USA)",
  "10_YEAR_BOND_RATES(SA)",
  INFLATION_DIFFERENCES,
  "VIX",
  "GOLD_PRICE",
  "BRENT_OIL_PRICE",
  TARGET_COLUMN,
];

// ─── Request ─────────────────────────────────────────────────────────────────

/// One requested factor: a human-readable column name and the provider's
/// series identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
  pub name:      String,
  pub series_id: String,
}

/// An ordered set of factors to fetch. Order matters only for progress
/// percentages (attempt index over total).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesRequest {
  entries: Vec<SeriesSpec>,
}

impl SeriesRequest {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a factor. Duplicate names are the caller's bug; the last
  /// fetched column with a given name wins in the raw table.
  pub fn push(&mut self, name: impl Into<String>, series_id: impl Into<String>) {
    self.entries.push(SeriesSpec {
      name:      name.into(),
      series_id: series_id.into(),
    });
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &SeriesSpec> {
    self.entries.iter()
  }

  /// The standard ten-series FRED request behind the dashboard.
  pub fn fred_default() -> Self {
    let mut req = Self::new();
    req.push("EPU(USA)", "USEPUINDXM");
    req.push("WUIZAF(SA)", "WUIZAF");
    req.push("10_YEAR_BOND_RATES(USA)", "GS10");
    req.push("10_YEAR_BOND_RATES(SA)", "IRLTLT01ZAM156N");
    req.push(SA_INFLATION, "CPALTT01ZAM659N");
    req.push(USA_INFLATION, "CPALTT01USM659N");
    req.push("VIX", "VIXCLS");
    req.push("GOLD_PRICE", "PCU2122212122210");
    req.push("BRENT_OIL_PRICE", "POILBREUSDM");
    req.push(TARGET_COLUMN, "DEXSFUS");
    req
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_request_covers_schema_sources() {
    let req = SeriesRequest::fred_default();
    assert_eq!(req.len(), 10);

    let names: Vec<&str> = req.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&TARGET_COLUMN));
    assert!(names.contains(&SA_INFLATION));
    assert!(names.contains(&USA_INFLATION));

    // Every allow-listed column except the derived one is requested.
    for col in KEEP_COLUMNS {
      if col != INFLATION_DIFFERENCES {
        assert!(names.contains(&col), "missing request for {col}");
      }
    }
  }
}
