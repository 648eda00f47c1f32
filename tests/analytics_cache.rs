mod support;

use chrono::{TimeZone, Utc};
use sheetsync::{
   Error,
   analytics::{self, AggregateCounts, NO_DATA_NOTE, STALE_NOTE},
   store::Store,
   sync::TargetOverride,
   types::TenantId,
};
use support::{CANDIDATE_HEADER, FakeSheets, TestReconciler, harness, sheet};

async fn refresh(reconciler: &TestReconciler, tenant: TenantId) -> sheetsync::Result<analytics::AnalyticsSnapshot> {
   analytics::refresh(reconciler.source(), reconciler.store(), reconciler.classifier(), tenant, "output").await
}

fn board() -> sheetsync::types::Grid {
   sheet(CANDIDATE_HEADER, &[
      &["Jane", "jane@x.com", "", "", "", "", "", "", "meet.google.com/a"],
      &["Raj", "raj@x.com", "", "", "", "", "", "", "zoom.us/j/1"],
      &["Mia", "mia@x.com"],
   ])
}

#[tokio::test]
async fn never_synced_tenant_reads_as_no_data() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;

   let snapshot = analytics::read_cached(reconciler.store(), tenant).await.unwrap();

   assert!(snapshot.is_empty_fallback());
   assert_eq!(snapshot.note.as_deref(), Some(NO_DATA_NOTE));
   assert_eq!(snapshot.counts, AggregateCounts::default());
   assert!(snapshot.last_updated.is_none());
}

#[tokio::test]
async fn sync_overwrites_the_cache_with_latest_counts() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   let stale = AggregateCounts { total: 40, rejected: 40, ..AggregateCounts::default() };
   let long_ago = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
   reconciler.store().save_analytics(tenant, &stale, long_ago).await.unwrap();

   reconciler.sync_candidates(tenant, &TargetOverride::default()).await.unwrap();

   let cached = analytics::read_cached(reconciler.store(), tenant).await.unwrap();
   assert!(cached.cached);
   assert_eq!(cached.counts.total, 3);
   assert_eq!(cached.counts.interviews_scheduled, 2);
   assert_eq!(cached.counts.shortlisted, 2);
   assert_eq!(cached.counts.rejected, 1);
   assert!(cached.last_updated.unwrap() > long_ago);
}

#[tokio::test]
async fn refresh_is_live_when_the_sheet_answers() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;

   let live = refresh(&reconciler, tenant).await.unwrap();

   assert!(!live.cached);
   assert!(live.note.is_none());
   assert_eq!(live.counts.total, 3);
   let cached = analytics::read_cached(reconciler.store(), tenant).await.unwrap();
   assert_eq!(cached.counts, live.counts);
}

#[tokio::test]
async fn refresh_falls_back_to_cache_with_a_stale_note() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   refresh(&reconciler, tenant).await.unwrap();

   fake.unreachable();
   let snapshot = refresh(&reconciler, tenant).await.unwrap();

   assert!(snapshot.cached);
   assert_eq!(snapshot.counts.total, 3);
   assert_eq!(snapshot.note.as_deref(), Some(STALE_NOTE));
}

#[tokio::test]
async fn refresh_needs_a_tenant_sheet_url() {
   let fake = FakeSheets::serving(board());
   let (reconciler, _) = harness(&fake, "hr@agency.in").await;
   let bare = reconciler.store().add_tenant("bare@x.in", None, None).await.unwrap().tenant_id();
   let broken = reconciler
      .store()
      .add_tenant("broken@x.in", None, Some("https://example.com/not-a-sheet"))
      .await
      .unwrap()
      .tenant_id();

   assert!(matches!(refresh(&reconciler, bare).await, Err(Error::NotConfigured(_))));
   assert!(matches!(refresh(&reconciler, broken).await, Err(Error::NotConfigured(_))));
   assert!(matches!(refresh(&reconciler, TenantId(404)).await, Err(Error::UnknownTenant(_))));
   assert_eq!(fake.api_calls(), 0);
}

#[tokio::test]
async fn cache_write_failure_does_not_fail_a_committed_sync() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   sqlx::query("DROP TABLE client_analytics_cache")
      .execute(reconciler.store().pool())
      .await
      .unwrap();

   let report = reconciler.sync_candidates(tenant, &TargetOverride::default()).await.unwrap();

   assert!(report.is_complete());
   assert_eq!(report.counts.imported, 3);
   assert_eq!(report.analytics.unwrap().counts.total, 3);
   assert_eq!(reconciler.store().candidates(tenant).await.unwrap().len(), 3);

   let live = refresh(&reconciler, tenant).await.unwrap();
   assert!(!live.cached);
   assert_eq!(live.counts.total, 3);
}

#[tokio::test]
async fn overview_covers_synced_and_never_synced_tenants() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   reconciler.store().add_tenant("fresh@x.in", Some("Fresh"), None).await.unwrap();
   reconciler.sync_candidates(tenant, &TargetOverride::default()).await.unwrap();

   let rows = analytics::overview(reconciler.store()).await.unwrap();

   assert_eq!(rows.len(), 2);
   assert_eq!(rows[0].tenant_id, tenant.0);
   assert_eq!(rows[0].counts.total, 3);
   assert!(rows[0].last_updated.is_some());
   assert_eq!(rows[1].name.as_deref(), Some("Fresh"));
   assert_eq!(rows[1].counts, AggregateCounts::default());
   assert!(rows[1].last_updated.is_none());
}
