use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsSnapshot;

/// One row of cells as delivered by the sheet, addressed by position.
pub type ExternalRow = Vec<String>;

/// Rectangular-ish block of cells; row 0 is the header row.
pub type Grid = Vec<ExternalRow>;

/// Owning identifier of a tenant (the `users.id` of a client account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl fmt::Display for TenantId {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self.0)
   }
}

/// Positional join key between a sheet row and its local record.
///
/// `row_<n>` where `n` is the 1-based sheet row number, so the first data row
/// below the header is `row_2`.
#[derive(
   Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SheetRowId(String);

impl SheetRowId {
   /// Builds the id for the data row at `index` (0-based, header excluded).
   pub fn for_data_row(index: usize) -> Self {
      Self(format!("row_{}", index + 2))
   }

   pub fn as_str(&self) -> &str {
      &self.0
   }
}

impl From<String> for SheetRowId {
   fn from(value: String) -> Self {
      Self(value)
   }
}

impl fmt::Display for SheetRowId {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(&self.0)
   }
}

/// Tenant domain served by a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
   Recruiting,
   Insurance,
}

impl Vertical {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Recruiting => "recruiting",
         Self::Insurance => "insurance",
      }
   }
}

/// Which transport produced the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
   Api,
   Csv,
}

/// Tenant directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
   pub id:        i64,
   pub email:     String,
   pub name:      Option<String>,
   pub sheet_url: Option<String>,
}

impl Tenant {
   pub const fn tenant_id(&self) -> TenantId {
      TenantId(self.id)
   }
}

/// Spreadsheet location a reconciliation reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTarget {
   pub spreadsheet_id: String,
   pub tab:            String,
}

/// Row accounting for one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
   pub imported: usize,
   pub updated:  usize,
   pub deleted:  usize,
   pub skipped:  usize,
}

impl SyncCounts {
   /// Human-readable summary used by the CLI and HTTP responses.
   pub fn message(&self) -> String {
      let mut parts = Vec::new();
      if self.imported > 0 {
         parts.push(format!("{} added", self.imported));
      }
      if self.updated > 0 {
         parts.push(format!("{} updated", self.updated));
      }
      if self.deleted > 0 {
         parts.push(format!("{} deleted", self.deleted));
      }
      if parts.is_empty() {
         "No changes needed - already in sync".to_string()
      } else {
         format!("Sync complete: {}", parts.join(", "))
      }
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
   Complete,
   SourceUnreachable,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
   pub tenant:    TenantId,
   pub vertical:  Vertical,
   pub status:    SyncStatus,
   pub source:    Option<FetchSource>,
   #[serde(flatten)]
   pub counts:    SyncCounts,
   pub message:   String,
   #[serde(default)]
   pub error:     Option<String>,
   #[serde(default)]
   pub analytics: Option<AnalyticsSnapshot>,
}

impl SyncReport {
   pub const fn is_complete(&self) -> bool {
      matches!(self.status, SyncStatus::Complete)
   }
}
