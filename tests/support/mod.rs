#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::{
   Arc,
   atomic::{AtomicBool, AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use sheetsync::{
   config::Config,
   error::SheetsError,
   sheets::{SheetSource, csv},
   store::{SqliteStore, Store},
   sync::Reconciler,
   types::{Grid, TenantId},
};

pub const CANDIDATE_HEADER: &[&str] = &[
   "Name",
   "Email",
   "Summary",
   "Match Score",
   "Resume",
   "Mobile",
   "Interview Date",
   "Status",
   "Transcript",
   "Job Description",
   "Matching Skills",
];

pub const KMG_HEADER: &[&str] = &[
   "Name",
   "Mobile",
   "Activated Date",
   "Renewal Date",
   "OD Expiry",
   "TP Expiry",
   "Premium Mode",
   "Premium",
   "Vertical",
   "Product",
   "Registration No",
   "Policy No",
   "Company",
   "Status",
   "New Policy No",
   "New Company",
   "Policy Doc Link",
   "Thank You Sent",
   "Reason",
   "Email",
   "Notes",
];

pub const JOBAN_HEADER: &[&str] = &[
   "Name",
   "Mobile",
   "Email",
   "Product",
   "Vertical",
   "Policy No",
   "Company",
   "REGN no",
   "Last Year Premium",
   "Premium Amount",
   "Premium Mode",
   "Date of Expiry",
   "TP Expiry",
   "Activated Date",
   "Status",
   "ThankYouSent",
   "Cheque Hold",
   "Payment Date",
   "Cheque No",
   "Cheque Bounce",
   "New Policy No",
   "New Policy Company",
   "Policy doc link",
   "Owner Alert Sent",
   "Notes",
];

pub fn row(cells: &[&str]) -> Vec<String> {
   cells.iter().map(|c| (*c).to_string()).collect()
}

/// Header row followed by data rows.
pub fn sheet(header: &[&str], data: &[&[&str]]) -> Grid {
   std::iter::once(row(header)).chain(data.iter().map(|r| row(r))).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
   Clear(String),
   Update(String, Grid),
}

/// Scripted sheet source. The API and CSV paths are toggled independently.
#[derive(Default)]
pub struct FakeSheets {
   grid:          Mutex<Grid>,
   api_up:        AtomicBool,
   csv_up:        AtomicBool,
   writable:      AtomicBool,
   pub api_calls: AtomicUsize,
   pub csv_calls: AtomicUsize,
   pub ranges:    Mutex<Vec<String>>,
   pub writes:    Mutex<Vec<Write>>,
}

impl FakeSheets {
   /// Both transports up, writes allowed.
   pub fn serving(grid: Grid) -> Arc<Self> {
      let fake = Self { grid: Mutex::new(grid), ..Self::default() };
      fake.api_up.store(true, Ordering::SeqCst);
      fake.csv_up.store(true, Ordering::SeqCst);
      fake.writable.store(true, Ordering::SeqCst);
      Arc::new(fake)
   }

   pub fn set_grid(&self, grid: Grid) {
      *self.grid.lock() = grid;
   }

   pub fn set_api(&self, up: bool) {
      self.api_up.store(up, Ordering::SeqCst);
   }

   pub fn set_csv(&self, up: bool) {
      self.csv_up.store(up, Ordering::SeqCst);
   }

   pub fn set_writable(&self, writable: bool) {
      self.writable.store(writable, Ordering::SeqCst);
   }

   pub fn unreachable(&self) {
      self.set_api(false);
      self.set_csv(false);
   }

   pub fn api_calls(&self) -> usize {
      self.api_calls.load(Ordering::SeqCst)
   }

   pub fn csv_calls(&self) -> usize {
      self.csv_calls.load(Ordering::SeqCst)
   }
}

#[async_trait::async_trait]
impl SheetSource for FakeSheets {
   async fn get_values(&self, _spreadsheet_id: &str, range: &str) -> Result<Grid, SheetsError> {
      self.api_calls.fetch_add(1, Ordering::SeqCst);
      self.ranges.lock().push(range.to_string());
      if !self.api_up.load(Ordering::SeqCst) {
         return Err(SheetsError::NotConfigured);
      }
      Ok(self.grid.lock().clone())
   }

   async fn get_csv(&self, _spreadsheet_id: &str, _tab: &str) -> Result<String, SheetsError> {
      self.csv_calls.fetch_add(1, Ordering::SeqCst);
      if !self.csv_up.load(Ordering::SeqCst) {
         return Err(SheetsError::StatusCode(404));
      }
      Ok(csv::serialize(&self.grid.lock()))
   }

   async fn clear_values(&self, _spreadsheet_id: &str, range: &str) -> Result<(), SheetsError> {
      if !self.writable.load(Ordering::SeqCst) {
         return Err(SheetsError::NotConfigured);
      }
      self.writes.lock().push(Write::Clear(range.to_string()));
      Ok(())
   }

   async fn update_values(
      &self,
      _spreadsheet_id: &str,
      range: &str,
      rows: &Grid,
   ) -> Result<(), SheetsError> {
      if !self.writable.load(Ordering::SeqCst) {
         return Err(SheetsError::NotConfigured);
      }
      self.writes.lock().push(Write::Update(range.to_string(), rows.clone()));
      Ok(())
   }
}

pub type TestReconciler = Reconciler<Arc<FakeSheets>, SqliteStore>;

pub const SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/sheet-123/edit#gid=0";

/// Reconciler over an in-memory store with one tenant registered.
pub async fn harness_with(
   config: &Config,
   sheets: &Arc<FakeSheets>,
   email: &str,
) -> (TestReconciler, TenantId) {
   let store = SqliteStore::in_memory().await.unwrap();
   let reconciler = Reconciler::new(Arc::clone(sheets), store, config);
   let tenant = reconciler
      .store()
      .add_tenant(email, Some("Test Tenant"), Some(SHEET_URL))
      .await
      .unwrap()
      .tenant_id();
   (reconciler, tenant)
}

pub async fn harness(sheets: &Arc<FakeSheets>, email: &str) -> (TestReconciler, TenantId) {
   harness_with(&Config::default(), sheets, email).await
}
