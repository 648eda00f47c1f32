//! Tenant-scoped record storage with a SQLite implementation.

mod sqlite;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

pub use self::sqlite::SqliteStore;
use crate::{
   Result,
   analytics::{AggregateCounts, CachedAnalytics, TenantAnalytics},
   records::{Candidate, CandidateRecord, InsuranceCustomer, InsuranceRecord},
   types::{SheetRowId, SyncCounts, Tenant, TenantId, Vertical},
};

/// Writes one reconciliation pass applies, partitioned against the local ids.
#[derive(Debug, Clone)]
pub struct SyncPlan<R> {
   pub inserts: Vec<R>,
   pub updates: Vec<R>,
   pub prune:   Vec<SheetRowId>,
}

impl<R> Default for SyncPlan<R> {
   fn default() -> Self {
      Self { inserts: Vec::new(), updates: Vec::new(), prune: Vec::new() }
   }
}

impl<R> SyncPlan<R> {
   pub fn is_empty(&self) -> bool {
      self.inserts.is_empty() && self.updates.is_empty() && self.prune.is_empty()
   }
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
   async fn tenant(&self, id: TenantId) -> Result<Option<Tenant>>;

   async fn add_tenant(
      &self,
      email: &str,
      name: Option<&str>,
      sheet_url: Option<&str>,
   ) -> Result<Tenant>;

   async fn list_tenants(&self) -> Result<Vec<Tenant>>;

   async fn existing_row_ids(
      &self,
      tenant: TenantId,
      vertical: Vertical,
   ) -> Result<HashSet<SheetRowId>>;

   /// Applies the plan in one transaction; a failing row is skipped, not fatal.
   async fn apply_candidates(
      &self,
      tenant: TenantId,
      plan: &SyncPlan<CandidateRecord>,
   ) -> Result<SyncCounts>;

   /// Applies the plan in one transaction; a failing row is skipped, not fatal.
   async fn apply_insurance(
      &self,
      tenant: TenantId,
      plan: &SyncPlan<InsuranceRecord>,
   ) -> Result<SyncCounts>;

   async fn candidates(&self, tenant: TenantId) -> Result<Vec<Candidate>>;

   /// Customers in insertion order.
   async fn insurance_customers(&self, tenant: TenantId) -> Result<Vec<InsuranceCustomer>>;

   async fn save_analytics(
      &self,
      tenant: TenantId,
      counts: &AggregateCounts,
      at: DateTime<Utc>,
   ) -> Result<()>;

   async fn cached_analytics(&self, tenant: TenantId) -> Result<Option<CachedAnalytics>>;

   /// Every tenant joined with its cached counters, including never-synced ones.
   async fn all_cached_analytics(&self) -> Result<Vec<TenantAnalytics>>;
}
