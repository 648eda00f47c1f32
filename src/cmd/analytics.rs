//! `sheetsync analytics` command.

use console::style;

use super::{print_json, tenant_label};
use crate::{
   Result,
   analytics::{self, AnalyticsSnapshot, TenantAnalytics},
   config,
   types::TenantId,
};

/// Prints dashboard counters, live from the sheet unless `cached` is set.
pub async fn execute(tenant: i64, cached: bool, json: bool) -> Result<()> {
   let cfg = config::get()?;
   let reconciler = super::reconciler(cfg).await?;
   let tenant = TenantId(tenant);

   let snapshot = if cached {
      analytics::read_cached(reconciler.store(), tenant).await?
   } else {
      analytics::refresh(
         reconciler.source(),
         reconciler.store(),
         reconciler.classifier(),
         tenant,
         &reconciler.recruiting_defaults().tab,
      )
      .await?
   };

   if json {
      return print_json(&snapshot);
   }
   print_snapshot(tenant, &snapshot);
   Ok(())
}

/// Prints the cached counters of every tenant.
pub async fn overview(json: bool) -> Result<()> {
   let cfg = config::get()?;
   let reconciler = super::reconciler(cfg).await?;
   let rows = analytics::overview(reconciler.store()).await?;

   if json {
      return print_json(&rows);
   }
   if rows.is_empty() {
      println!("{}", style("No tenants").dim());
      return Ok(());
   }
   for row in &rows {
      print_overview_row(row);
   }
   Ok(())
}

fn print_overview_row(row: &TenantAnalytics) {
   let updated = row
      .last_updated
      .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M UTC").to_string());
   println!(
      "  {:>4}  {:<28} total {:>4}  interviews {:>4}  {}",
      row.tenant_id,
      row.email,
      style(row.counts.total).bold(),
      row.counts.interviews_scheduled,
      style(format!("updated {updated}")).dim()
   );
}

fn print_snapshot(tenant: TenantId, snapshot: &AnalyticsSnapshot) {
   let origin = if snapshot.cached { "cached" } else { "live" };
   println!("{} {}", tenant_label(tenant), style(format!("({origin})")).dim());
   if let Some(note) = &snapshot.note {
      println!("  {}", style(note).yellow());
   }
   let c = &snapshot.counts;
   let rows = [
      ("total", c.total),
      ("interviews scheduled", c.interviews_scheduled),
      ("interviews today", c.interviews_today),
      ("this week", c.weekly_total),
      ("interviews this week", c.weekly_interviews),
      ("shortlisted", c.shortlisted),
      ("rejected", c.rejected),
   ];
   for (label, value) in rows {
      println!("  {:<22} {}", label, style(value).bold());
   }
   if let Some(at) = snapshot.last_updated {
      println!("  {}", style(format!("updated {}", at.format("%Y-%m-%d %H:%M UTC"))).dim());
   }
}
