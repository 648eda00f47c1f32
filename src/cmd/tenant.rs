//! `sheetsync tenant` commands.

use console::style;

use super::print_json;
use crate::{Result, config, sheets, store::Store};

pub async fn add(email: String, name: Option<String>, sheet_url: Option<String>) -> Result<()> {
   let cfg = config::get()?;
   let reconciler = super::reconciler(cfg).await?;

   if let Some(url) = sheet_url.as_deref()
      && sheets::extract_sheet_id(url).is_none()
   {
      eprintln!("{}", style(format!("warning: no spreadsheet id found in {url}")).yellow());
   }

   let tenant = reconciler
      .store()
      .add_tenant(&email, name.as_deref(), sheet_url.as_deref())
      .await?;
   println!("{} added tenant {} ({})", style("✓").green(), tenant.id, tenant.email);
   Ok(())
}

pub async fn list(json: bool) -> Result<()> {
   let cfg = config::get()?;
   let reconciler = super::reconciler(cfg).await?;
   let tenants = reconciler.store().list_tenants().await?;

   if json {
      return print_json(&tenants);
   }
   if tenants.is_empty() {
      println!("{}", style("No tenants").dim());
      return Ok(());
   }
   for tenant in tenants {
      let sheet = tenant
         .sheet_url
         .as_deref()
         .and_then(sheets::extract_sheet_id)
         .unwrap_or("-");
      println!(
         "  {:>4}  {}  {}",
         tenant.id,
         tenant.email,
         style(format!("sheet: {sheet}")).dim()
      );
   }
   Ok(())
}
