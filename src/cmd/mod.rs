//! CLI command implementations for sheetsync.
//!
//! Each module corresponds to a subcommand. They all share one
//! [`Reconciler`] built from the global configuration.

pub mod analytics;
pub mod export;
pub mod serve;
pub mod sync;
pub mod tenant;

use console::style;

use crate::{
   Result,
   config::Config,
   sheets::GoogleSheets,
   store::SqliteStore,
   sync::Reconciler,
   types::TenantId,
};

/// The production wiring: Google Sheets over HTTP into SQLite.
pub type AppReconciler = Reconciler<GoogleSheets, SqliteStore>;

/// Builds the sheet client and store once for the lifetime of a command.
pub async fn reconciler(config: &Config) -> Result<AppReconciler> {
   let store = SqliteStore::connect(&config.database_url).await?;
   let sheets = GoogleSheets::new(&config.google, config.http_timeout())?;
   if !sheets.can_read() {
      tracing::info!("no Google credentials configured, reads use the public CSV export");
   }
   Ok(Reconciler::new(sheets, store, config))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
   println!("{}", serde_json::to_string_pretty(value)?);
   Ok(())
}

fn tenant_label(tenant: TenantId) -> String {
   style(format!("tenant {tenant}")).cyan().to_string()
}
