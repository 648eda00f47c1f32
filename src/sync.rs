//! Sheet-to-database reconciliation for both verticals.
//!
//! A run fetches the tab, maps each data row to a record keyed by its
//! positional [`SheetRowId`], partitions against the tenant's existing ids and
//! hands the resulting plan to the store, which applies upserts and pruning in
//! one transaction. Nothing is deleted unless the fetch succeeded.

use std::{
   collections::{HashMap, HashSet},
   sync::Arc,
};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::{
   Result, analytics,
   classify::Classifier,
   config::{Config, InsuranceConfig, SheetDefaults},
   error::Error,
   export::{self, ExportReport},
   records,
   schema::{self, CANDIDATES},
   sheets::{self, SheetSource},
   store::{Store, SyncPlan},
   types::{
      ExternalRow, Grid, SheetRowId, SheetTarget, SyncCounts, SyncReport, SyncStatus, Tenant,
      TenantId, Vertical,
   },
};

/// Per-tenant single-flight registry.
///
/// Entries are kept for the life of the process, one per tenant that has
/// ever synced, so a released lock is reused by the next run.
#[derive(Debug, Clone, Default)]
pub struct TenantLocks {
   inner: Arc<Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TenantLocks {
   /// Returns a guard, or `None` when a run for `tenant` is already active.
   pub fn try_acquire(&self, tenant: TenantId) -> Option<OwnedMutexGuard<()>> {
      let lock = self.inner.lock().entry(tenant).or_default().clone();
      lock.try_lock_owned().ok()
   }
}

/// Optional caller-supplied location that beats tenant and config defaults.
#[derive(Debug, Clone, Default)]
pub struct TargetOverride {
   pub spreadsheet_id: Option<String>,
   pub tab:            Option<String>,
}

/// Reconciliation engine over a sheet source and a record store.
pub struct Reconciler<S: SheetSource, St: Store> {
   source:         S,
   store:          St,
   classifier:     Classifier,
   strict_headers: bool,
   recruiting:     SheetDefaults,
   insurance:      InsuranceConfig,
   locks:          TenantLocks,
}

fn split_header(grid: &Grid) -> (Option<&ExternalRow>, &[ExternalRow]) {
   match grid.split_first() {
      Some((header, data)) => (Some(header), data),
      None => (None, &[]),
   }
}

/// Partitions mapped rows into inserts and updates, and collects stale ids.
///
/// A row that fails to map still claims its position, so its stored record
/// is neither updated nor pruned.
fn build_plan<R>(
   data: &[ExternalRow],
   existing: &HashSet<SheetRowId>,
   map: impl Fn(usize, &[String]) -> Option<R>,
) -> (SyncPlan<R>, usize) {
   let mut plan = SyncPlan::default();
   let mut seen = HashSet::with_capacity(data.len());
   let mut skipped = 0;

   for (i, row) in data.iter().enumerate() {
      let id = SheetRowId::for_data_row(i);
      let Some(record) = map(i, row) else {
         tracing::debug!(row = i + 2, "skipping row with empty identity fields");
         skipped += 1;
         seen.insert(id);
         continue;
      };
      if existing.contains(&id) {
         plan.updates.push(record);
      } else {
         plan.inserts.push(record);
      }
      seen.insert(id);
   }

   let mut prune: Vec<SheetRowId> = existing.difference(&seen).cloned().collect();
   prune.sort();
   plan.prune = prune;
   (plan, skipped)
}

impl<S, St> Reconciler<S, St>
where
   S: SheetSource,
   St: Store,
{
   pub fn new(source: S, store: St, config: &Config) -> Self {
      Self {
         source,
         store,
         classifier: Classifier::from_config(&config.classifier),
         strict_headers: config.strict_headers,
         recruiting: config.recruiting.clone(),
         insurance: config.insurance.clone(),
         locks: TenantLocks::default(),
      }
   }

   pub const fn source(&self) -> &S {
      &self.source
   }

   pub const fn store(&self) -> &St {
      &self.store
   }

   pub const fn classifier(&self) -> &Classifier {
      &self.classifier
   }

   pub const fn locks(&self) -> &TenantLocks {
      &self.locks
   }

   pub const fn recruiting_defaults(&self) -> &SheetDefaults {
      &self.recruiting
   }

   async fn load_tenant(&self, tenant: TenantId) -> Result<Tenant> {
      self.store.tenant(tenant).await?.ok_or(Error::UnknownTenant(tenant))
   }

   fn guard(&self, tenant: TenantId) -> Result<OwnedMutexGuard<()>> {
      self.locks.try_acquire(tenant).ok_or(Error::SyncInProgress(tenant))
   }

   /// Resolves where `tenant` reads `vertical` from.
   ///
   /// Precedence: explicit override, the tenant's own sheet URL, then the
   /// configured default for the vertical (or insurance layout).
   pub async fn target_for(
      &self,
      tenant: TenantId,
      vertical: Vertical,
      overrides: &TargetOverride,
   ) -> Result<SheetTarget> {
      let record = self.load_tenant(tenant).await?;
      let defaults = match vertical {
         Vertical::Recruiting => &self.recruiting,
         Vertical::Insurance => match schema::resolve_insurance(&record.email).key {
            "joban" => &self.insurance.joban,
            _ => &self.insurance.kmg,
         },
      };

      let spreadsheet_id = overrides
         .spreadsheet_id
         .clone()
         .or_else(|| record.sheet_url.as_deref().and_then(sheets::extract_sheet_id).map(str::to_string))
         .or_else(|| defaults.spreadsheet_id.clone())
         .filter(|id| !id.trim().is_empty())
         .ok_or_else(|| {
            Error::NotConfigured(format!(
               "no {} spreadsheet configured for tenant {tenant}",
               vertical.as_str()
            ))
         })?;
      let tab = overrides.tab.clone().unwrap_or_else(|| defaults.tab.clone());
      Ok(SheetTarget { spreadsheet_id, tab })
   }

   pub async fn sync_candidates(&self, tenant: TenantId, overrides: &TargetOverride) -> Result<SyncReport> {
      let target = self.target_for(tenant, Vertical::Recruiting, overrides).await?;
      self.reconcile_candidates(tenant, &target).await
   }

   pub async fn sync_insurance(&self, tenant: TenantId, overrides: &TargetOverride) -> Result<SyncReport> {
      let target = self.target_for(tenant, Vertical::Insurance, overrides).await?;
      self.reconcile_insurance(tenant, &target).await
   }

   fn unreachable(tenant: TenantId, vertical: Vertical, reason: String) -> SyncReport {
      tracing::warn!(%tenant, vertical = vertical.as_str(), "sheet unreachable, local data untouched: {reason}");
      SyncReport {
         tenant,
         vertical,
         status: SyncStatus::SourceUnreachable,
         source: None,
         counts: SyncCounts::default(),
         message: "Sheet unreachable - local data left unchanged".to_string(),
         error: Some(reason),
         analytics: None,
      }
   }

   /// Mirrors the recruiting tab into the tenant's candidates.
   pub async fn reconcile_candidates(&self, tenant: TenantId, target: &SheetTarget) -> Result<SyncReport> {
      let _guard = self.guard(tenant)?;
      self.load_tenant(tenant).await?;
      tracing::info!(%tenant, spreadsheet = %target.spreadsheet_id, tab = %target.tab, "syncing candidates");

      let fetched = match sheets::fetch_grid(
         &self.source,
         &target.spreadsheet_id,
         &target.tab,
         CANDIDATES.last_column,
      )
      .await
      {
         Ok(fetched) => fetched,
         Err(Error::SourceUnreachable { reason }) => {
            let mut report = Self::unreachable(tenant, Vertical::Recruiting, reason);
            report.analytics = Some(analytics::read_cached(&self.store, tenant).await?);
            return Ok(report);
         },
         Err(e) => return Err(e),
      };

      let (header, data) = split_header(&fetched.grid);
      if self.strict_headers
         && let Some(header) = header
      {
         CANDIDATES.validate_header(header)?;
      }

      let existing = self.store.existing_row_ids(tenant, Vertical::Recruiting).await?;
      let (plan, skipped) = build_plan(
         data,
         &existing,
         |i, row| records::map_candidate(&CANDIDATES, &self.classifier, i, row),
      );
      let mut counts = self.store.apply_candidates(tenant, &plan).await?;
      counts.skipped += skipped;

      let now = Utc::now();
      let aggregate = analytics::compute(&self.classifier, data, now);
      if let Err(e) = analytics::persist(&self.store, tenant, &aggregate, now).await {
         tracing::warn!(%tenant, "failed to cache analytics: {e}");
      }

      tracing::info!(
         %tenant,
         imported = counts.imported,
         updated = counts.updated,
         deleted = counts.deleted,
         skipped = counts.skipped,
         "candidate sync complete"
      );
      Ok(SyncReport {
         tenant,
         vertical: Vertical::Recruiting,
         status: SyncStatus::Complete,
         source: Some(fetched.source),
         counts,
         message: counts.message(),
         error: None,
         analytics: Some(analytics::AnalyticsSnapshot::live(aggregate, now)),
      })
   }

   /// Mirrors the insurance tab into the tenant's customers, using the
   /// layout resolved from the tenant email.
   pub async fn reconcile_insurance(&self, tenant: TenantId, target: &SheetTarget) -> Result<SyncReport> {
      let _guard = self.guard(tenant)?;
      let record = self.load_tenant(tenant).await?;
      let schema = schema::resolve_insurance(&record.email);
      tracing::info!(
         %tenant,
         schema = schema.name,
         spreadsheet = %target.spreadsheet_id,
         tab = %target.tab,
         "syncing insurance customers"
      );

      let fetched =
         match sheets::fetch_grid(&self.source, &target.spreadsheet_id, &target.tab, schema.last_column)
            .await
         {
            Ok(fetched) => fetched,
            Err(Error::SourceUnreachable { reason }) => {
               return Ok(Self::unreachable(tenant, Vertical::Insurance, reason));
            },
            Err(e) => return Err(e),
         };

      let (header, data) = split_header(&fetched.grid);
      if self.strict_headers
         && let Some(header) = header
      {
         schema.validate_header(header)?;
      }

      let existing = self.store.existing_row_ids(tenant, Vertical::Insurance).await?;
      let (plan, skipped) = build_plan(
         data,
         &existing,
         |i, row| records::map_insurance(schema, i, row),
      );
      let mut counts = self.store.apply_insurance(tenant, &plan).await?;
      counts.skipped += skipped;

      tracing::info!(
         %tenant,
         imported = counts.imported,
         updated = counts.updated,
         deleted = counts.deleted,
         skipped = counts.skipped,
         "insurance sync complete"
      );
      Ok(SyncReport {
         tenant,
         vertical: Vertical::Insurance,
         status: SyncStatus::Complete,
         source: Some(fetched.source),
         counts,
         message: counts.message(),
         error: None,
         analytics: None,
      })
   }

   /// Writes the tenant's stored customers back to its insurance tab.
   pub async fn export_insurance(
      &self,
      tenant: TenantId,
      overrides: &TargetOverride,
   ) -> Result<ExportReport> {
      let _guard = self.guard(tenant)?;
      let target = self.target_for(tenant, Vertical::Insurance, overrides).await?;
      let record = self.load_tenant(tenant).await?;
      let schema = schema::resolve_insurance(&record.email);
      let customers = self.store.insurance_customers(tenant).await?;
      export::push_insurance(&self.source, schema, tenant, &target, &customers).await
   }

   /// Reconciles every tenant that has a sheet URL, one after another.
   ///
   /// Failures are logged and do not stop the remaining tenants.
   pub async fn sync_all(&self) -> Result<Vec<SyncReport>> {
      let tenants = self.store.list_tenants().await?;
      let mut reports = Vec::new();
      for tenant in tenants.iter().filter(|t| t.sheet_url.as_deref().is_some_and(|u| !u.is_empty())) {
         match self.sync_candidates(tenant.tenant_id(), &TargetOverride::default()).await {
            Ok(report) => reports.push(report),
            Err(e) => tracing::warn!(tenant = %tenant.tenant_id(), "auto-sync failed: {e}"),
         }
      }
      Ok(reports)
   }
}
