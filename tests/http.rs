mod support;

use std::{net::SocketAddr, sync::Arc};

use serde_json::Value;
use sheetsync::cmd::serve;
use support::{CANDIDATE_HEADER, FakeSheets, TestReconciler, harness, sheet};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

struct Server {
   addr:   SocketAddr,
   stop:   Option<oneshot::Sender<()>>,
   handle: JoinHandle<()>,
   client: reqwest::Client,
}

impl Server {
   async fn start(reconciler: TestReconciler) -> Self {
      let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
      let addr = listener.local_addr().unwrap();
      let (stop, stopped) = oneshot::channel::<()>();
      let handle = tokio::spawn(async move {
         serve::serve(listener, Arc::new(reconciler), async move {
            let _ = stopped.await;
         })
         .await
         .unwrap();
      });
      Self { addr, stop: Some(stop), handle, client: reqwest::Client::new() }
   }

   fn url(&self, path: &str) -> String {
      format!("http://{}{path}", self.addr)
   }

   async fn post(&self, path: &str) -> (u16, Value) {
      let resp = self.client.post(self.url(path)).send().await.unwrap();
      (resp.status().as_u16(), resp.json().await.unwrap())
   }

   async fn get(&self, path: &str) -> (u16, Value) {
      let resp = self.client.get(self.url(path)).send().await.unwrap();
      (resp.status().as_u16(), resp.json().await.unwrap())
   }

   async fn stop(mut self) {
      if let Some(stop) = self.stop.take() {
         let _ = stop.send(());
      }
      self.handle.await.unwrap();
   }
}

fn board() -> sheetsync::types::Grid {
   sheet(CANDIDATE_HEADER, &[
      &["Jane", "jane@x.com", "", "", "", "", "", "", "meet.google.com/a"],
      &["Mia", "mia@x.com"],
   ])
}

#[tokio::test]
async fn health_answers_ok() {
   let fake = FakeSheets::serving(board());
   let (reconciler, _) = harness(&fake, "hr@agency.in").await;
   let server = Server::start(reconciler).await;

   let (status, body) = server.get("/health").await;

   assert_eq!(status, 200);
   assert_eq!(body["status"], "ok");
   server.stop().await;
}

#[tokio::test]
async fn candidate_sync_returns_the_report() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   let server = Server::start(reconciler).await;

   let (status, body) = server.post(&format!("/tenants/{tenant}/candidates/sync")).await;

   assert_eq!(status, 200);
   assert_eq!(body["status"], "complete");
   assert_eq!(body["imported"], 2);
   assert_eq!(body["message"], "Sync complete: 2 added");
   assert_eq!(body["analytics"]["interviews_scheduled"], 1);

   let (status, cached) = server.get(&format!("/tenants/{tenant}/analytics/cached")).await;
   assert_eq!(status, 200);
   assert_eq!(cached["cached"], true);
   assert_eq!(cached["total"], 2);
   server.stop().await;
}

#[tokio::test]
async fn unreachable_sheet_is_service_unavailable() {
   let fake = FakeSheets::serving(board());
   fake.unreachable();
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   let server = Server::start(reconciler).await;

   let (status, body) = server.post(&format!("/tenants/{tenant}/candidates/sync")).await;

   assert_eq!(status, 503);
   assert_eq!(body["status"], "source_unreachable");
   assert_eq!(body["analytics"]["note"], "No data available");
   server.stop().await;
}

#[tokio::test]
async fn unknown_tenant_is_not_found() {
   let fake = FakeSheets::serving(board());
   let (reconciler, _) = harness(&fake, "hr@agency.in").await;
   let server = Server::start(reconciler).await;

   let (status, body) = server.post("/tenants/404/insurance/sync").await;

   assert_eq!(status, 404);
   assert!(body["error"].as_str().unwrap().contains("unknown tenant"));
   server.stop().await;
}

#[tokio::test]
async fn override_query_reaches_the_fetch() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   let server = Server::start(reconciler).await;

   let (status, _) = server
      .post(&format!("/tenants/{tenant}/candidates/sync?spreadsheet_id=other&tab=Leads"))
      .await;

   assert_eq!(status, 200);
   assert_eq!(fake.ranges.lock().as_slice(), ["Leads!A:K"]);
   server.stop().await;
}

#[tokio::test]
async fn admin_overview_lists_every_tenant() {
   let fake = FakeSheets::serving(board());
   let (reconciler, tenant) = harness(&fake, "hr@agency.in").await;
   reconciler.sync_candidates(tenant, &Default::default()).await.unwrap();
   let server = Server::start(reconciler).await;

   let (status, body) = server.get("/analytics").await;

   assert_eq!(status, 200);
   let rows = body.as_array().unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["email"], "hr@agency.in");
   assert_eq!(rows[0]["total"], 2);
   assert!(rows[0]["last_updated"].is_string());
   server.stop().await;
}
