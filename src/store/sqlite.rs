use std::{collections::HashSet, path::Path, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use sqlx::{
   Connection, Pool, Sqlite, Transaction,
   query::Query,
   sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use super::{Store, SyncPlan};
use crate::{
   Result,
   analytics::{AggregateCounts, CachedAnalytics, TenantAnalytics},
   records::{Candidate, CandidateRecord, InsuranceCustomer, InsuranceRecord},
   types::{SheetRowId, SyncCounts, Tenant, TenantId, Vertical},
};

const MIGRATIONS: &[&str] = &[
   "CREATE TABLE IF NOT EXISTS users (
      id               INTEGER PRIMARY KEY AUTOINCREMENT,
      email            TEXT NOT NULL UNIQUE,
      name             TEXT,
      google_sheet_url TEXT,
      created_at       DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
   )",
   "CREATE TABLE IF NOT EXISTS candidates (
      id              INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
      sheet_row_id    TEXT NOT NULL,
      name            TEXT NOT NULL,
      email           TEXT NOT NULL,
      mobile          TEXT,
      summary         TEXT,
      resume_text     TEXT,
      match_score     INTEGER,
      matching_skills TEXT,
      missing_skills  TEXT,
      status          TEXT NOT NULL DEFAULT 'applied',
      interview_date  TEXT,
      transcript      TEXT,
      job_description TEXT,
      created_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
      updated_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
      UNIQUE (user_id, sheet_row_id)
   )",
   "CREATE TABLE IF NOT EXISTS insurance_customers (
      id                       INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id                  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
      sheet_row_id             TEXT NOT NULL,
      name                     TEXT NOT NULL,
      mobile_number            TEXT NOT NULL,
      email                    TEXT NOT NULL DEFAULT '',
      product                  TEXT NOT NULL DEFAULT '',
      vertical                 TEXT NOT NULL DEFAULT 'motor',
      current_policy_no        TEXT NOT NULL DEFAULT '',
      company                  TEXT NOT NULL DEFAULT '',
      registration_no          TEXT NOT NULL DEFAULT '',
      premium                  REAL NOT NULL DEFAULT 0,
      premium_mode             TEXT NOT NULL DEFAULT '',
      renewal_date             TEXT NOT NULL DEFAULT '',
      od_expiry_date           TEXT NOT NULL DEFAULT '',
      tp_expiry_date           TEXT NOT NULL DEFAULT '',
      insurance_activated_date TEXT NOT NULL DEFAULT '',
      status                   TEXT NOT NULL DEFAULT 'pending',
      thank_you_sent           TEXT NOT NULL DEFAULT '',
      new_policy_no            TEXT NOT NULL DEFAULT '',
      new_company              TEXT NOT NULL DEFAULT '',
      policy_doc_link          TEXT NOT NULL DEFAULT '',
      reason                   TEXT NOT NULL DEFAULT '',
      notes                    TEXT NOT NULL DEFAULT '',
      created_at               DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
      updated_at               DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
      UNIQUE (user_id, sheet_row_id)
   )",
   "CREATE TABLE IF NOT EXISTS client_analytics_cache (
      user_id              INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
      total                INTEGER NOT NULL DEFAULT 0,
      interviews_scheduled INTEGER NOT NULL DEFAULT 0,
      interviews_today     INTEGER NOT NULL DEFAULT 0,
      weekly_total         INTEGER NOT NULL DEFAULT 0,
      weekly_interviews    INTEGER NOT NULL DEFAULT 0,
      shortlisted          INTEGER NOT NULL DEFAULT 0,
      rejected             INTEGER NOT NULL DEFAULT 0,
      last_updated         TEXT NOT NULL
   )",
];

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A record type that maps onto one tenant-scoped table.
trait Persist: Sync {
   const TABLE: &'static str;

   fn sheet_row_id(&self) -> &SheetRowId;

   fn insert(&self, tenant: TenantId) -> SqliteQuery<'_>;

   fn update(&self, tenant: TenantId) -> SqliteQuery<'_>;
}

impl Persist for CandidateRecord {
   const TABLE: &'static str = "candidates";

   fn sheet_row_id(&self) -> &SheetRowId {
      &self.sheet_row_id
   }

   fn insert(&self, tenant: TenantId) -> SqliteQuery<'_> {
      sqlx::query(
         "INSERT INTO candidates (user_id, sheet_row_id, name, email, mobile, summary, resume_text, \
          match_score, matching_skills, missing_skills, status, interview_date, transcript, \
          job_description) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
      )
      .bind(tenant.0)
      .bind(self.sheet_row_id.as_str())
      .bind(self.name.as_str())
      .bind(self.email.as_str())
      .bind(self.mobile.as_deref())
      .bind(self.summary.as_deref())
      .bind(self.resume_text.as_deref())
      .bind(self.match_score)
      .bind(self.matching_skills.as_deref())
      .bind(self.missing_skills.as_deref())
      .bind(self.status.as_str())
      .bind(self.interview_date.as_deref())
      .bind(self.transcript.as_deref())
      .bind(self.job_description.as_deref())
   }

   fn update(&self, tenant: TenantId) -> SqliteQuery<'_> {
      sqlx::query(
         "UPDATE candidates SET name = ?, email = ?, mobile = ?, summary = ?, resume_text = ?, \
          match_score = ?, matching_skills = ?, missing_skills = ?, status = ?, interview_date = ?, \
          transcript = ?, job_description = ?, updated_at = CURRENT_TIMESTAMP \
          WHERE user_id = ? AND sheet_row_id = ?",
      )
      .bind(self.name.as_str())
      .bind(self.email.as_str())
      .bind(self.mobile.as_deref())
      .bind(self.summary.as_deref())
      .bind(self.resume_text.as_deref())
      .bind(self.match_score)
      .bind(self.matching_skills.as_deref())
      .bind(self.missing_skills.as_deref())
      .bind(self.status.as_str())
      .bind(self.interview_date.as_deref())
      .bind(self.transcript.as_deref())
      .bind(self.job_description.as_deref())
      .bind(tenant.0)
      .bind(self.sheet_row_id.as_str())
   }
}

impl InsuranceRecord {
   fn bind_fields<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
      query
         .bind(self.name.as_str())
         .bind(self.mobile_number.as_str())
         .bind(self.email.as_str())
         .bind(self.product.as_str())
         .bind(self.vertical.as_str())
         .bind(self.current_policy_no.as_str())
         .bind(self.company.as_str())
         .bind(self.registration_no.as_str())
         .bind(self.premium)
         .bind(self.premium_mode.as_str())
         .bind(self.renewal_date.as_str())
         .bind(self.od_expiry_date.as_str())
         .bind(self.tp_expiry_date.as_str())
         .bind(self.insurance_activated_date.as_str())
         .bind(self.status.as_str())
         .bind(self.thank_you_sent.as_str())
         .bind(self.new_policy_no.as_str())
         .bind(self.new_company.as_str())
         .bind(self.policy_doc_link.as_str())
         .bind(self.reason.as_str())
         .bind(self.notes.as_str())
   }
}

impl Persist for InsuranceRecord {
   const TABLE: &'static str = "insurance_customers";

   fn sheet_row_id(&self) -> &SheetRowId {
      &self.sheet_row_id
   }

   fn insert(&self, tenant: TenantId) -> SqliteQuery<'_> {
      let query = sqlx::query(
         "INSERT INTO insurance_customers (user_id, sheet_row_id, name, mobile_number, email, \
          product, vertical, current_policy_no, company, registration_no, premium, premium_mode, \
          renewal_date, od_expiry_date, tp_expiry_date, insurance_activated_date, status, \
          thank_you_sent, new_policy_no, new_company, policy_doc_link, reason, notes) \
          VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
      )
      .bind(tenant.0)
      .bind(self.sheet_row_id.as_str());
      self.bind_fields(query)
   }

   fn update(&self, tenant: TenantId) -> SqliteQuery<'_> {
      let query = sqlx::query(
         "UPDATE insurance_customers SET name = ?, mobile_number = ?, email = ?, product = ?, \
          vertical = ?, current_policy_no = ?, company = ?, registration_no = ?, premium = ?, \
          premium_mode = ?, renewal_date = ?, od_expiry_date = ?, tp_expiry_date = ?, \
          insurance_activated_date = ?, status = ?, thank_you_sent = ?, new_policy_no = ?, \
          new_company = ?, policy_doc_link = ?, reason = ?, notes = ?, \
          updated_at = CURRENT_TIMESTAMP WHERE user_id = ? AND sheet_row_id = ?",
      );
      self
         .bind_fields(query)
         .bind(tenant.0)
         .bind(self.sheet_row_id.as_str())
   }
}

/// Runs one row write inside its own savepoint. Returns the affected row
/// count, or `None` when the write failed and was rolled back.
async fn write_row(
   tx: &mut Transaction<'_, Sqlite>,
   query: SqliteQuery<'_>,
   table: &str,
   id: &SheetRowId,
) -> Option<u64> {
   let result = async {
      let mut savepoint = Connection::begin(&mut **tx).await?;
      let done = query.execute(&mut *savepoint).await?;
      savepoint.commit().await?;
      Ok::<_, sqlx::Error>(done.rows_affected())
   }
   .await;

   match result {
      Ok(n) => Some(n),
      Err(e) => {
         tracing::warn!(table, sheet_row_id = %id, "skipping row: {e}");
         None
      },
   }
}

/// SQLite-backed store; one pool shared by the CLI, server and tests.
#[derive(Debug, Clone)]
pub struct SqliteStore {
   pool: Pool<Sqlite>,
}

impl SqliteStore {
   /// Opens (creating if missing) the database at `url` and migrates it.
   pub async fn connect(url: &str) -> Result<Self> {
      let path = url
         .strip_prefix("sqlite://")
         .or_else(|| url.strip_prefix("sqlite:"))
         .unwrap_or(url);
      let in_memory = path.starts_with(":memory:");
      if !in_memory && let Some(parent) = Path::new(path).parent() {
         std::fs::create_dir_all(parent)?;
      }

      let mut opts = SqliteConnectOptions::from_str(url)?
         .create_if_missing(true)
         .foreign_keys(true)
         .busy_timeout(Duration::from_secs(5));
      if !in_memory {
         opts = opts.journal_mode(SqliteJournalMode::Wal);
      }

      let pool = SqlitePoolOptions::new()
         .max_connections(1)
         .idle_timeout(None)
         .max_lifetime(None)
         .connect_with(opts)
         .await?;

      let store = Self { pool };
      store.migrate().await?;
      Ok(store)
   }

   /// Private database that lives as long as the store.
   pub async fn in_memory() -> Result<Self> {
      Self::connect("sqlite::memory:").await
   }

   pub const fn pool(&self) -> &Pool<Sqlite> {
      &self.pool
   }

   async fn migrate(&self) -> Result<()> {
      for statement in MIGRATIONS {
         sqlx::query(statement).execute(&self.pool).await?;
      }
      Ok(())
   }

   async fn apply_plan<R: Persist>(&self, tenant: TenantId, plan: &SyncPlan<R>) -> Result<SyncCounts> {
      let mut counts = SyncCounts::default();
      if plan.is_empty() {
         return Ok(counts);
      }
      let mut tx = self.pool.begin().await?;

      for record in &plan.inserts {
         match write_row(&mut tx, record.insert(tenant), R::TABLE, record.sheet_row_id()).await {
            Some(_) => counts.imported += 1,
            None => counts.skipped += 1,
         }
      }

      for record in &plan.updates {
         match write_row(&mut tx, record.update(tenant), R::TABLE, record.sheet_row_id()).await {
            Some(n) if n > 0 => counts.updated += 1,
            _ => counts.skipped += 1,
         }
      }

      let delete = format!("DELETE FROM {} WHERE user_id = ? AND sheet_row_id = ?", R::TABLE);
      for id in &plan.prune {
         let done = sqlx::query(&delete)
            .bind(tenant.0)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
         counts.deleted += done.rows_affected() as usize;
      }

      tx.commit().await?;
      Ok(counts)
   }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
   async fn tenant(&self, id: TenantId) -> Result<Option<Tenant>> {
      let tenant = sqlx::query_as::<_, Tenant>(
         "SELECT id, email, name, google_sheet_url AS sheet_url FROM users WHERE id = ?",
      )
      .bind(id.0)
      .fetch_optional(&self.pool)
      .await?;
      Ok(tenant)
   }

   async fn add_tenant(
      &self,
      email: &str,
      name: Option<&str>,
      sheet_url: Option<&str>,
   ) -> Result<Tenant> {
      let tenant = sqlx::query_as::<_, Tenant>(
         "INSERT INTO users (email, name, google_sheet_url) VALUES (?, ?, ?) \
          RETURNING id, email, name, google_sheet_url AS sheet_url",
      )
      .bind(email)
      .bind(name)
      .bind(sheet_url)
      .fetch_one(&self.pool)
      .await?;
      Ok(tenant)
   }

   async fn list_tenants(&self) -> Result<Vec<Tenant>> {
      let tenants = sqlx::query_as::<_, Tenant>(
         "SELECT id, email, name, google_sheet_url AS sheet_url FROM users ORDER BY id",
      )
      .fetch_all(&self.pool)
      .await?;
      Ok(tenants)
   }

   async fn existing_row_ids(
      &self,
      tenant: TenantId,
      vertical: Vertical,
   ) -> Result<HashSet<SheetRowId>> {
      let table = match vertical {
         Vertical::Recruiting => CandidateRecord::TABLE,
         Vertical::Insurance => InsuranceRecord::TABLE,
      };
      let rows: Vec<(SheetRowId,)> =
         sqlx::query_as(&format!("SELECT sheet_row_id FROM {table} WHERE user_id = ?"))
            .bind(tenant.0)
            .fetch_all(&self.pool)
            .await?;
      Ok(rows.into_iter().map(|(id,)| id).collect())
   }

   async fn apply_candidates(
      &self,
      tenant: TenantId,
      plan: &SyncPlan<CandidateRecord>,
   ) -> Result<SyncCounts> {
      self.apply_plan(tenant, plan).await
   }

   async fn apply_insurance(
      &self,
      tenant: TenantId,
      plan: &SyncPlan<InsuranceRecord>,
   ) -> Result<SyncCounts> {
      self.apply_plan(tenant, plan).await
   }

   async fn candidates(&self, tenant: TenantId) -> Result<Vec<Candidate>> {
      let rows = sqlx::query_as::<_, Candidate>(
         "SELECT * FROM candidates WHERE user_id = ? ORDER BY id",
      )
      .bind(tenant.0)
      .fetch_all(&self.pool)
      .await?;
      Ok(rows)
   }

   async fn insurance_customers(&self, tenant: TenantId) -> Result<Vec<InsuranceCustomer>> {
      let rows = sqlx::query_as::<_, InsuranceCustomer>(
         "SELECT * FROM insurance_customers WHERE user_id = ? ORDER BY id",
      )
      .bind(tenant.0)
      .fetch_all(&self.pool)
      .await?;
      Ok(rows)
   }

   async fn save_analytics(
      &self,
      tenant: TenantId,
      counts: &AggregateCounts,
      at: DateTime<Utc>,
   ) -> Result<()> {
      sqlx::query(
         "INSERT INTO client_analytics_cache (user_id, total, interviews_scheduled, \
          interviews_today, weekly_total, weekly_interviews, shortlisted, rejected, last_updated) \
          VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
          ON CONFLICT(user_id) DO UPDATE SET total = excluded.total, \
          interviews_scheduled = excluded.interviews_scheduled, \
          interviews_today = excluded.interviews_today, weekly_total = excluded.weekly_total, \
          weekly_interviews = excluded.weekly_interviews, shortlisted = excluded.shortlisted, \
          rejected = excluded.rejected, last_updated = excluded.last_updated",
      )
      .bind(tenant.0)
      .bind(counts.total)
      .bind(counts.interviews_scheduled)
      .bind(counts.interviews_today)
      .bind(counts.weekly_total)
      .bind(counts.weekly_interviews)
      .bind(counts.shortlisted)
      .bind(counts.rejected)
      .bind(at)
      .execute(&self.pool)
      .await?;
      Ok(())
   }

   async fn cached_analytics(&self, tenant: TenantId) -> Result<Option<CachedAnalytics>> {
      let row = sqlx::query_as::<_, CachedAnalytics>(
         "SELECT total, interviews_scheduled, interviews_today, weekly_total, weekly_interviews, \
          shortlisted, rejected, last_updated FROM client_analytics_cache WHERE user_id = ?",
      )
      .bind(tenant.0)
      .fetch_optional(&self.pool)
      .await?;
      Ok(row)
   }

   async fn all_cached_analytics(&self) -> Result<Vec<TenantAnalytics>> {
      let rows = sqlx::query_as::<_, TenantAnalytics>(
         "SELECT u.id AS tenant_id, u.email, u.name, \
          COALESCE(c.total, 0) AS total, \
          COALESCE(c.interviews_scheduled, 0) AS interviews_scheduled, \
          COALESCE(c.interviews_today, 0) AS interviews_today, \
          COALESCE(c.weekly_total, 0) AS weekly_total, \
          COALESCE(c.weekly_interviews, 0) AS weekly_interviews, \
          COALESCE(c.shortlisted, 0) AS shortlisted, \
          COALESCE(c.rejected, 0) AS rejected, \
          c.last_updated \
          FROM users u LEFT JOIN client_analytics_cache c ON c.user_id = u.id \
          ORDER BY u.id",
      )
      .fetch_all(&self.pool)
      .await?;
      Ok(rows)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[tokio::test]
   async fn tenants_round_trip_through_users_table() {
      let store = SqliteStore::in_memory().await.unwrap();
      let added = store
         .add_tenant("ops@kmginsurance.com", Some("KMG"), Some("https://x/spreadsheets/d/abc/edit"))
         .await
         .unwrap();
      let found = store.tenant(added.tenant_id()).await.unwrap().unwrap();
      assert_eq!(found, added);
      assert!(store.tenant(TenantId(99)).await.unwrap().is_none());
      assert_eq!(store.list_tenants().await.unwrap().len(), 1);
   }

   #[tokio::test]
   async fn analytics_cache_is_overwritten() {
      let store = SqliteStore::in_memory().await.unwrap();
      let tenant = store.add_tenant("hr@agency.in", None, None).await.unwrap().tenant_id();
      let first = AggregateCounts { total: 3, ..AggregateCounts::default() };
      let second = AggregateCounts { total: 5, rejected: 1, ..AggregateCounts::default() };

      store.save_analytics(tenant, &first, Utc::now()).await.unwrap();
      store.save_analytics(tenant, &second, Utc::now()).await.unwrap();

      let cached = store.cached_analytics(tenant).await.unwrap().unwrap();
      assert_eq!(cached.counts, second);
   }

   #[tokio::test]
   async fn empty_plan_is_a_no_op() {
      let store = SqliteStore::in_memory().await.unwrap();
      let tenant = store.add_tenant("hr@agency.in", None, None).await.unwrap().tenant_id();
      let plan = SyncPlan::<CandidateRecord>::default();
      assert!(plan.is_empty());

      let counts = store.apply_candidates(tenant, &plan).await.unwrap();

      assert_eq!(counts, SyncCounts::default());
   }

   #[tokio::test]
   async fn overview_lists_every_tenant_with_cached_counts() {
      let store = SqliteStore::in_memory().await.unwrap();
      let synced = store.add_tenant("hr@agency.in", Some("Agency"), None).await.unwrap().tenant_id();
      store.add_tenant("new@agency.in", None, None).await.unwrap();
      let counts = AggregateCounts { total: 4, shortlisted: 3, rejected: 1, ..AggregateCounts::default() };
      store.save_analytics(synced, &counts, Utc::now()).await.unwrap();

      let all = store.all_cached_analytics().await.unwrap();

      assert_eq!(all.len(), 2);
      assert_eq!(all[0].email, "hr@agency.in");
      assert_eq!(all[0].counts, counts);
      assert!(all[0].last_updated.is_some());
      assert_eq!(all[1].counts, AggregateCounts::default());
      assert!(all[1].last_updated.is_none());
   }

   #[tokio::test]
   async fn failing_row_is_skipped_without_aborting_the_plan() {
      let store = SqliteStore::in_memory().await.unwrap();
      let tenant = store.add_tenant("hr@agency.in", None, None).await.unwrap().tenant_id();
      let record = |id: &str, name: &str| CandidateRecord {
         sheet_row_id:    SheetRowId::from(id.to_string()),
         name:            name.to_string(),
         email:           format!("{name}@x.com"),
         mobile:          None,
         summary:         None,
         resume_text:     None,
         match_score:     None,
         matching_skills: None,
         missing_skills:  None,
         status:          "shortlisted".to_string(),
         interview_date:  None,
         transcript:      None,
         job_description: None,
      };
      // Same row id twice violates the (user_id, sheet_row_id) key.
      let plan = SyncPlan {
         inserts: vec![record("row_2", "a"), record("row_2", "b"), record("row_3", "c")],
         ..SyncPlan::default()
      };

      let counts = store.apply_candidates(tenant, &plan).await.unwrap();
      assert_eq!((counts.imported, counts.skipped), (2, 1));
      let names: Vec<_> = store
         .candidates(tenant)
         .await
         .unwrap()
         .into_iter()
         .map(|c| c.record.name)
         .collect();
      assert_eq!(names, ["a", "c"]);
   }
}
