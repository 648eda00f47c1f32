//! Spreadsheet access: the transport seam, the tabular fetcher and URL helpers.

pub mod csv;
pub mod google;

use std::sync::LazyLock;

use regex::Regex;

pub use self::google::GoogleSheets;
use crate::{
   Result,
   error::{Error, SheetsError},
   types::{FetchSource, Grid},
};

static SHEET_ID_RE: LazyLock<Option<Regex>> =
   LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").ok());

/// Transport for reading and writing spreadsheet tabs.
///
/// `get_values` is the authenticated path; `get_csv` is the public export of
/// the same tab and needs no credentials.
#[async_trait::async_trait]
pub trait SheetSource: Send + Sync {
   async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Grid, SheetsError>;

   async fn get_csv(&self, spreadsheet_id: &str, tab: &str) -> Result<String, SheetsError>;

   async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsError>;

   async fn update_values(
      &self,
      spreadsheet_id: &str,
      range: &str,
      rows: &Grid,
   ) -> Result<(), SheetsError>;
}

#[async_trait::async_trait]
impl<T: SheetSource + ?Sized> SheetSource for std::sync::Arc<T> {
   async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Grid, SheetsError> {
      (**self).get_values(spreadsheet_id, range).await
   }

   async fn get_csv(&self, spreadsheet_id: &str, tab: &str) -> Result<String, SheetsError> {
      (**self).get_csv(spreadsheet_id, tab).await
   }

   async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsError> {
      (**self).clear_values(spreadsheet_id, range).await
   }

   async fn update_values(
      &self,
      spreadsheet_id: &str,
      range: &str,
      rows: &Grid,
   ) -> Result<(), SheetsError> {
      (**self).update_values(spreadsheet_id, range, rows).await
   }
}

/// A grid together with the transport that produced it.
#[derive(Debug, Clone)]
pub struct Fetched {
   pub grid:   Grid,
   pub source: FetchSource,
}

/// Reads `tab` through the authenticated API, falling back to the CSV export.
///
/// Fails with [`Error::SourceUnreachable`] only when both paths fail.
pub async fn fetch_grid<S: SheetSource + ?Sized>(
   source: &S,
   spreadsheet_id: &str,
   tab: &str,
   last_column: &str,
) -> Result<Fetched> {
   let range = format!("{tab}!A:{last_column}");
   let api_err = match source.get_values(spreadsheet_id, &range).await {
      Ok(grid) => {
         tracing::debug!(spreadsheet_id, tab, rows = grid.len(), "fetched via sheets api");
         return Ok(Fetched { grid, source: FetchSource::Api });
      },
      Err(e) => {
         tracing::warn!(spreadsheet_id, tab, "sheets api failed, trying csv export: {e}");
         e
      },
   };

   match source.get_csv(spreadsheet_id, tab).await {
      Ok(text) => {
         let grid = csv::parse(&text);
         tracing::debug!(spreadsheet_id, tab, rows = grid.len(), "fetched via csv export");
         Ok(Fetched { grid, source: FetchSource::Csv })
      },
      Err(csv_err) => {
         tracing::warn!(spreadsheet_id, tab, "csv export failed: {csv_err}");
         Err(Error::SourceUnreachable { reason: format!("api: {api_err}; csv: {csv_err}") })
      },
   }
}

/// Pulls the spreadsheet id out of a sharing URL such as
/// `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`.
pub fn extract_sheet_id(url: &str) -> Option<&str> {
   SHEET_ID_RE
      .as_ref()?
      .captures(url)
      .and_then(|c| c.get(1))
      .map(|m| m.as_str())
}
