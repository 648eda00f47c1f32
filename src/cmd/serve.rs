//! HTTP server command.
//!
//! Serves the sync, export and analytics endpoints used by the dashboard.
//! When `auto_sync_interval_secs` is set, every tenant with a sheet URL is
//! also re-synced on that interval, one tenant at a time.

use std::{sync::Arc, time::Duration};

use axum::{
   Json, Router,
   extract::{Path, Query, State},
   http::StatusCode,
   response::{IntoResponse, Response},
   routing::{get, post},
};
use console::style;
use serde::Deserialize;
use tokio::{net::TcpListener, signal, sync::watch, time};

use crate::{
   Result, analytics, config,
   error::Error,
   export::ExportReport,
   sheets::SheetSource,
   store::Store,
   sync::{Reconciler, TargetOverride},
   types::{SyncReport, TenantId},
};

type Shared<S, St> = Arc<Reconciler<S, St>>;

/// Error body returned by every endpoint.
pub struct ApiError(Error);

impl From<Error> for ApiError {
   fn from(err: Error) -> Self {
      Self(err)
   }
}

impl IntoResponse for ApiError {
   fn into_response(self) -> Response {
      let status = match &self.0 {
         Error::UnknownTenant(_) => StatusCode::NOT_FOUND,
         Error::NotConfigured(_) | Error::HeaderMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
         Error::SyncInProgress(_) => StatusCode::CONFLICT,
         Error::SourceUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
         _ => StatusCode::INTERNAL_SERVER_ERROR,
      };
      if status.is_server_error() {
         tracing::error!("request failed: {}", self.0);
      }
      (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
   }
}

#[derive(Debug, Default, Deserialize)]
struct TargetQuery {
   spreadsheet_id: Option<String>,
   tab:            Option<String>,
}

impl From<TargetQuery> for TargetOverride {
   fn from(q: TargetQuery) -> Self {
      Self { spreadsheet_id: q.spreadsheet_id, tab: q.tab }
   }
}

fn report_response(report: SyncReport) -> Response {
   let status = if report.is_complete() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
   (status, Json(report)).into_response()
}

async fn health() -> Json<serde_json::Value> {
   Json(serde_json::json!({ "status": "ok" }))
}

async fn sync_candidates<S: SheetSource + 'static, St: Store + 'static>(
   State(reconciler): State<Shared<S, St>>,
   Path(id): Path<i64>,
   Query(target): Query<TargetQuery>,
) -> Result<Response, ApiError> {
   let report = reconciler.sync_candidates(TenantId(id), &target.into()).await?;
   Ok(report_response(report))
}

async fn sync_insurance<S: SheetSource + 'static, St: Store + 'static>(
   State(reconciler): State<Shared<S, St>>,
   Path(id): Path<i64>,
   Query(target): Query<TargetQuery>,
) -> Result<Response, ApiError> {
   let report = reconciler.sync_insurance(TenantId(id), &target.into()).await?;
   Ok(report_response(report))
}

async fn export_insurance<S: SheetSource + 'static, St: Store + 'static>(
   State(reconciler): State<Shared<S, St>>,
   Path(id): Path<i64>,
   Query(target): Query<TargetQuery>,
) -> Result<Json<ExportReport>, ApiError> {
   let report = reconciler.export_insurance(TenantId(id), &target.into()).await?;
   Ok(Json(report))
}

async fn live_analytics<S: SheetSource + 'static, St: Store + 'static>(
   State(reconciler): State<Shared<S, St>>,
   Path(id): Path<i64>,
) -> Result<Json<analytics::AnalyticsSnapshot>, ApiError> {
   let snapshot = analytics::refresh(
      reconciler.source(),
      reconciler.store(),
      reconciler.classifier(),
      TenantId(id),
      &reconciler.recruiting_defaults().tab,
   )
   .await?;
   Ok(Json(snapshot))
}

async fn analytics_overview<S: SheetSource + 'static, St: Store + 'static>(
   State(reconciler): State<Shared<S, St>>,
) -> Result<Json<Vec<analytics::TenantAnalytics>>, ApiError> {
   Ok(Json(analytics::overview(reconciler.store()).await?))
}

async fn cached_analytics<S: SheetSource + 'static, St: Store + 'static>(
   State(reconciler): State<Shared<S, St>>,
   Path(id): Path<i64>,
) -> Result<Json<analytics::AnalyticsSnapshot>, ApiError> {
   let snapshot = analytics::read_cached(reconciler.store(), TenantId(id)).await?;
   Ok(Json(snapshot))
}

/// Routes for one shared reconciler.
pub fn router<S, St>(reconciler: Shared<S, St>) -> Router
where
   S: SheetSource + 'static,
   St: Store + 'static,
{
   Router::new()
      .route("/health", get(health))
      .route("/analytics", get(analytics_overview::<S, St>))
      .route("/tenants/{id}/candidates/sync", post(sync_candidates::<S, St>))
      .route("/tenants/{id}/insurance/sync", post(sync_insurance::<S, St>))
      .route("/tenants/{id}/insurance/export", post(export_insurance::<S, St>))
      .route("/tenants/{id}/analytics", get(live_analytics::<S, St>))
      .route("/tenants/{id}/analytics/cached", get(cached_analytics::<S, St>))
      .with_state(reconciler)
}

/// Serves `reconciler` on `listener` until `shutdown` resolves.
pub async fn serve<S, St>(
   listener: TcpListener,
   reconciler: Shared<S, St>,
   shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()>
where
   S: SheetSource + 'static,
   St: Store + 'static,
{
   axum::serve(listener, router(reconciler))
      .with_graceful_shutdown(shutdown)
      .await?;
   Ok(())
}

async fn auto_sync<S, St>(reconciler: Shared<S, St>, every: Duration, mut stop: watch::Receiver<bool>)
where
   S: SheetSource + 'static,
   St: Store + 'static,
{
   let mut ticker = time::interval(every);
   ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
   loop {
      tokio::select! {
         _ = ticker.tick() => {
            match reconciler.sync_all().await {
               Ok(reports) => tracing::info!(tenants = reports.len(), "auto-sync pass complete"),
               Err(e) => tracing::warn!("auto-sync pass failed: {e}"),
            }
         }
         changed = stop.changed() => {
            if changed.is_err() || *stop.borrow() {
               break;
            }
         }
      }
   }
}

async fn shutdown_signal() {
   let ctrl_c = async {
      if let Err(e) = signal::ctrl_c().await {
         tracing::warn!("failed to listen for ctrl-c: {e}");
         std::future::pending::<()>().await;
      }
   };

   #[cfg(unix)]
   let terminate = async {
      match signal::unix::signal(signal::unix::SignalKind::terminate()) {
         Ok(mut sig) => {
            sig.recv().await;
         },
         Err(e) => {
            tracing::warn!("failed to listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
         },
      }
   };

   #[cfg(not(unix))]
   let terminate = std::future::pending::<()>();

   tokio::select! {
      () = ctrl_c => {},
      () = terminate => {},
   }
   tracing::info!("shutting down");
}

/// Executes the serve command.
pub async fn execute(port: Option<u16>) -> Result<()> {
   let cfg = config::get()?;
   let reconciler = Arc::new(super::reconciler(cfg).await?);
   let address = port.map_or_else(|| cfg.listen_address(), |p| format!("{}:{p}", cfg.bind_address));
   let listener = TcpListener::bind(&address).await?;

   let (stop_tx, stop_rx) = watch::channel(false);
   let auto = (cfg.auto_sync_interval_secs > 0).then(|| {
      let every = Duration::from_secs(cfg.auto_sync_interval_secs);
      tracing::info!(interval_secs = cfg.auto_sync_interval_secs, "auto-sync enabled");
      tokio::spawn(auto_sync(Arc::clone(&reconciler), every, stop_rx))
   });

   println!("{} listening on {}", style("sheetsync").bold(), style(&address).cyan());
   serve(listener, reconciler, shutdown_signal()).await?;

   let _ = stop_tx.send(true);
   if let Some(handle) = auto {
      let _ = handle.await;
   }
   println!("{}", style("Server stopped").dim());
   Ok(())
}
