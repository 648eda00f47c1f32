//! `sheetsync sync` command.

use console::style;

use super::{print_json, tenant_label};
use crate::{
   Result, config,
   error::{Error, SOURCE_UNREACHABLE_EXIT},
   sync::TargetOverride,
   types::{FetchSource, SyncReport, TenantId, Vertical},
};

/// Runs one reconciliation and prints the report.
///
/// An unreachable sheet is reported and exits with a non-zero code; local
/// data is left as it was.
pub async fn execute(
   vertical: Vertical,
   tenant: i64,
   spreadsheet_id: Option<String>,
   tab: Option<String>,
   json: bool,
) -> Result<()> {
   let cfg = config::get()?;
   let reconciler = super::reconciler(cfg).await?;
   let tenant = TenantId(tenant);
   let overrides = TargetOverride { spreadsheet_id, tab };

   let report = match vertical {
      Vertical::Recruiting => reconciler.sync_candidates(tenant, &overrides).await?,
      Vertical::Insurance => reconciler.sync_insurance(tenant, &overrides).await?,
   };

   if json {
      print_json(&report)?;
   } else {
      print_report(&report);
   }

   if report.is_complete() {
      Ok(())
   } else {
      Err(Error::Reported {
         message:   report.message.clone(),
         exit_code: SOURCE_UNREACHABLE_EXIT,
      })
   }
}

fn print_report(report: &SyncReport) {
   let label = tenant_label(report.tenant);
   if !report.is_complete() {
      println!("{} {label}: {}", style("✗").red(), report.message);
      if let Some(err) = &report.error {
         println!("  {}", style(err).dim());
      }
      if let Some(snapshot) = &report.analytics {
         println!(
            "  {}",
            style(format!("cached analytics: {} rows", snapshot.counts.total)).dim()
         );
      }
      return;
   }

   println!("{} {label}: {}", style("✓").green(), report.message);
   let source = report.source.map_or("unknown", |s| match s {
      FetchSource::Api => "sheets api",
      FetchSource::Csv => "csv export",
   });
   println!(
      "  {}",
      style(format!(
         "{} via {source}: {} added, {} updated, {} deleted, {} skipped",
         report.vertical.as_str(),
         report.counts.imported,
         report.counts.updated,
         report.counts.deleted,
         report.counts.skipped
      ))
      .dim()
   );
}
