//! Pushes local insurance customers back into the tenant's sheet.

use serde::{Deserialize, Serialize};

use crate::{
   Result,
   error::{Error, SheetsError},
   records::InsuranceCustomer,
   schema::{InsuranceField, Schema},
   sheets::{SheetSource, csv},
   types::{Grid, SheetTarget, TenantId},
};

/// Rows below the header that an export replaces.
pub const CLEAR_RANGE: &str = "A2:Y1000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
   pub tenant:         TenantId,
   pub spreadsheet_id: String,
   pub tab:            String,
   pub exported:       usize,
}

/// Lays customers out in the schema's column order.
pub fn render_rows(schema: &Schema<InsuranceField>, customers: &[InsuranceCustomer]) -> Grid {
   let width = schema.width();
   customers
      .iter()
      .map(|customer| {
         let mut cells = vec![String::new(); width];
         for column in schema.columns {
            cells[column.index] = customer.record.field_text(column.field);
         }
         cells
      })
      .collect()
}

pub fn render_csv(schema: &Schema<InsuranceField>, customers: &[InsuranceCustomer]) -> String {
   csv::serialize(&render_rows(schema, customers))
}

/// Clears the data rows of the target tab and writes `customers` from `A2`.
///
/// With no customers the sheet is left as is.
pub async fn push_insurance<S: SheetSource + ?Sized>(
   source: &S,
   schema: &Schema<InsuranceField>,
   tenant: TenantId,
   target: &SheetTarget,
   customers: &[InsuranceCustomer],
) -> Result<ExportReport> {
   let rows = render_rows(schema, customers);
   if !rows.is_empty() {
      let tab = &target.tab;
      source
         .clear_values(&target.spreadsheet_id, &format!("{tab}!{CLEAR_RANGE}"))
         .await
         .map_err(write_error)?;
      source
         .update_values(&target.spreadsheet_id, &format!("{tab}!A2"), &rows)
         .await
         .map_err(write_error)?;
   }
   tracing::info!(%tenant, schema = schema.name, exported = rows.len(), "exported insurance customers");
   Ok(ExportReport {
      tenant,
      spreadsheet_id: target.spreadsheet_id.clone(),
      tab: target.tab.clone(),
      exported: customers.len(),
   })
}

fn write_error(e: SheetsError) -> Error {
   match e {
      SheetsError::NotConfigured => {
         Error::NotConfigured("exporting requires a Google Sheets access token".to_string())
      },
      other => other.into(),
   }
}
