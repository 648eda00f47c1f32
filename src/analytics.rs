//! Aggregate dashboard counters with a last-known-good cache per tenant.

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
   Result,
   classify::Classifier,
   error::Error,
   sheets::{self, SheetSource},
   store::Store,
   types::{ExternalRow, TenantId},
};

pub const NO_DATA_NOTE: &str = "No data available";
pub const STALE_NOTE: &str = "Unable to fetch live data. Showing cached results.";

/// Counters over the data rows of one recruiting sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AggregateCounts {
   pub total:                i64,
   pub interviews_scheduled: i64,
   pub interviews_today:     i64,
   pub weekly_total:         i64,
   pub weekly_interviews:    i64,
   pub shortlisted:          i64,
   pub rejected:             i64,
}

/// Cached counters as stored for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CachedAnalytics {
   #[sqlx(flatten)]
   pub counts:       AggregateCounts,
   pub last_updated: DateTime<Utc>,
}

/// One tenant in the admin overview; tenants never synced read as zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenantAnalytics {
   pub tenant_id:    i64,
   pub email:        String,
   pub name:         Option<String>,
   #[sqlx(flatten)]
   #[serde(flatten)]
   pub counts:       AggregateCounts,
   pub last_updated: Option<DateTime<Utc>>,
}

/// What the dashboard renders: counters plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
   #[serde(flatten)]
   pub counts:       AggregateCounts,
   pub last_updated: Option<DateTime<Utc>>,
   pub cached:       bool,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub note:         Option<String>,
}

impl AnalyticsSnapshot {
   pub fn live(counts: AggregateCounts, at: DateTime<Utc>) -> Self {
      Self { counts, last_updated: Some(at), cached: false, note: None }
   }

   pub fn empty() -> Self {
      Self {
         counts:       AggregateCounts::default(),
         last_updated: None,
         cached:       false,
         note:         Some(NO_DATA_NOTE.to_string()),
      }
   }

   pub fn is_empty_fallback(&self) -> bool {
      !self.cached && self.note.as_deref() == Some(NO_DATA_NOTE)
   }
}

impl From<CachedAnalytics> for AnalyticsSnapshot {
   fn from(c: CachedAnalytics) -> Self {
      Self { counts: c.counts, last_updated: Some(c.last_updated), cached: true, note: None }
   }
}

// Day-first wins over month-first for ambiguous dates.
const DATE_FORMATS: &[&str] = &[
   "%Y-%m-%d",
   "%d/%m/%Y",
   "%m/%d/%Y",
   "%d-%m-%Y",
   "%d %b %Y",
   "%b %d, %Y",
   "%d %B %Y",
   "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] =
   &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

/// Best-effort calendar date of a cell; only years after 2020 count.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
   let cell = cell.trim();
   if cell.len() < 6 || !cell.bytes().any(|b| b.is_ascii_digit()) {
      return None;
   }
   let date = DateTime::parse_from_rfc3339(cell)
      .map(|d| d.with_timezone(&Utc).date_naive())
      .ok()
      .or_else(|| {
         DATETIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(cell, f).ok())
            .map(|d| d.date())
      })
      .or_else(|| DATE_FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(cell, f).ok()))?;
   (date.year() > 2020).then_some(date)
}

/// First date-like cell of the row, if any.
pub fn row_date(row: &[String]) -> Option<NaiveDate> {
   row.iter().find_map(|c| parse_date(c))
}

/// Counts interviews and weekly activity across `rows` as of `now`.
pub fn compute(classifier: &Classifier, rows: &[ExternalRow], now: DateTime<Utc>) -> AggregateCounts {
   let today = now.date_naive();
   let week_ago = today - Duration::days(7);
   let mut counts = AggregateCounts { total: rows.len() as i64, ..AggregateCounts::default() };

   for row in rows {
      let interview = classifier.has_meeting(row);
      if interview {
         counts.shortlisted += 1;
         counts.interviews_scheduled += 1;
         if row.iter().any(|c| parse_date(c) == Some(today)) {
            counts.interviews_today += 1;
         }
      } else {
         counts.rejected += 1;
      }

      if row_date(row).is_some_and(|d| d > week_ago && d <= today) {
         counts.weekly_total += 1;
         if interview {
            counts.weekly_interviews += 1;
         }
      }
   }
   counts
}

/// Overwrites the tenant's cached counters.
pub async fn persist<St: Store + ?Sized>(
   store: &St,
   tenant: TenantId,
   counts: &AggregateCounts,
   at: DateTime<Utc>,
) -> Result<()> {
   store.save_analytics(tenant, counts, at).await
}

/// Cached counters, or a zeroed snapshot marked "No data available".
pub async fn read_cached<St: Store + ?Sized>(store: &St, tenant: TenantId) -> Result<AnalyticsSnapshot> {
   Ok(store
      .cached_analytics(tenant)
      .await?
      .map_or_else(AnalyticsSnapshot::empty, AnalyticsSnapshot::from))
}

/// Cached counters for every tenant, by tenant id.
pub async fn overview<St: Store + ?Sized>(store: &St) -> Result<Vec<TenantAnalytics>> {
   store.all_cached_analytics().await
}

/// Live counters for the tenant's own sheet, falling back to the cache.
pub async fn refresh<S, St>(
   source: &S,
   store: &St,
   classifier: &Classifier,
   tenant: TenantId,
   tab: &str,
) -> Result<AnalyticsSnapshot>
where
   S: SheetSource + ?Sized,
   St: Store + ?Sized,
{
   let record = store.tenant(tenant).await?.ok_or(Error::UnknownTenant(tenant))?;
   let url = record
      .sheet_url
      .as_deref()
      .filter(|u| !u.trim().is_empty())
      .ok_or_else(|| Error::NotConfigured("no Google Sheet configured for this client".to_string()))?;
   let spreadsheet_id = sheets::extract_sheet_id(url)
      .ok_or_else(|| Error::NotConfigured(format!("invalid Google Sheet URL: {url}")))?;

   match sheets::fetch_grid(source, spreadsheet_id, tab, crate::schema::CANDIDATES.last_column).await {
      Ok(fetched) => {
         let now = Utc::now();
         let rows = fetched.grid.get(1..).unwrap_or_default();
         let counts = compute(classifier, rows, now);
         if let Err(e) = persist(store, tenant, &counts, now).await {
            tracing::warn!(%tenant, "failed to cache analytics: {e}");
         }
         Ok(AnalyticsSnapshot::live(counts, now))
      },
      Err(Error::SourceUnreachable { reason }) => {
         tracing::warn!(%tenant, "live analytics unavailable: {reason}");
         let mut snapshot = read_cached(store, tenant).await?;
         snapshot.note = Some(STALE_NOTE.to_string());
         Ok(snapshot)
      },
      Err(e) => Err(e),
   }
}
