mod support;

use sheetsync::{
   Error,
   sheets::{self, SheetSource},
   store::Store,
   types::{FetchSource, SyncStatus},
};
use support::{CANDIDATE_HEADER, FakeSheets, harness, sheet};

fn candidates() -> sheetsync::types::Grid {
   sheet(CANDIDATE_HEADER, &[
      &["Jane", "jane@x.com", "Python, SQL", "80%"],
      &["Raj", "raj@x.com", "Sales \"closer\""],
   ])
}

#[tokio::test]
async fn api_success_skips_csv() {
   let fake = FakeSheets::serving(candidates());
   let fetched = sheets::fetch_grid(&*fake, "sheet-123", "output", "K").await.unwrap();

   assert_eq!(fetched.source, FetchSource::Api);
   assert_eq!(fetched.grid, candidates());
   assert_eq!((fake.api_calls(), fake.csv_calls()), (1, 0));
   assert_eq!(fake.ranges.lock().as_slice(), ["output!A:K"]);
}

#[tokio::test]
async fn api_failure_falls_back_to_csv() {
   let fake = FakeSheets::serving(candidates());
   fake.set_api(false);

   let fetched = sheets::fetch_grid(&*fake, "sheet-123", "output", "K").await.unwrap();

   assert_eq!(fetched.source, FetchSource::Csv);
   assert_eq!(fetched.grid, candidates());
   assert_eq!((fake.api_calls(), fake.csv_calls()), (1, 1));
}

#[tokio::test]
async fn both_paths_failing_is_source_unreachable() {
   let fake = FakeSheets::serving(candidates());
   fake.unreachable();

   let err = sheets::fetch_grid(&*fake, "sheet-123", "output", "K").await.unwrap_err();

   assert!(matches!(err, Error::SourceUnreachable { .. }), "{err:?}");
   assert_eq!((fake.api_calls(), fake.csv_calls()), (1, 1));
}

#[tokio::test]
async fn sync_over_csv_fallback_imports_rows() {
   let fake = FakeSheets::serving(candidates());
   fake.set_api(false);
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;

   let report = reconciler.sync_candidates(tenant, &Default::default()).await.unwrap();

   assert_eq!(report.status, SyncStatus::Complete);
   assert_eq!(report.source, Some(FetchSource::Csv));
   assert_eq!(report.counts.imported, 2);
   let stored = reconciler.store().candidates(tenant).await.unwrap();
   assert_eq!(stored[0].record.summary.as_deref(), Some("Python, SQL"));
   assert_eq!(stored[0].record.match_score, Some(80));
   assert_eq!(stored[1].record.summary.as_deref(), Some("Sales \"closer\""));
}

#[tokio::test]
async fn trait_object_sources_are_usable() {
   let fake = FakeSheets::serving(candidates());
   let source: &dyn SheetSource = &*fake;
   let fetched = sheets::fetch_grid(source, "sheet-123", "output", "K").await.unwrap();
   assert_eq!(fetched.grid.len(), 3);
}
