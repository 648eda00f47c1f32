//! `sheetsync export` command.

use console::style;

use super::tenant_label;
use crate::{
   Result, config,
   error::Error,
   export, schema,
   store::Store,
   sync::TargetOverride,
   types::TenantId,
};

/// Writes stored insurance customers back to the sheet, or prints them as
/// CSV when `csv` is set.
pub async fn execute(
   tenant: i64,
   csv: bool,
   spreadsheet_id: Option<String>,
   tab: Option<String>,
) -> Result<()> {
   let cfg = config::get()?;
   let reconciler = super::reconciler(cfg).await?;
   let tenant = TenantId(tenant);

   if csv {
      let store = reconciler.store();
      let record = store.tenant(tenant).await?.ok_or(Error::UnknownTenant(tenant))?;
      let customers = store.insurance_customers(tenant).await?;
      let layout = schema::resolve_insurance(&record.email);
      println!("{}", export::render_csv(layout, &customers));
      return Ok(());
   }

   if !reconciler.source().can_write() {
      return Err(Error::NotConfigured(
         "exporting requires google.access_token; use --csv to print instead".to_string(),
      ));
   }
   let report = reconciler
      .export_insurance(tenant, &TargetOverride { spreadsheet_id, tab })
      .await?;
   println!(
      "{} {}: exported {} customers to {}",
      style("✓").green(),
      tenant_label(tenant),
      report.exported,
      style(format!("{}!A2", report.tab)).dim()
   );
   Ok(())
}
