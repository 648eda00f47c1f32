//! Google Sheets client over reqwest.
//!
//! Reads go through the v4 values API when a bearer token or API key is
//! configured; the public `gviz` CSV export needs neither. Writes need a
//! bearer token.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::SheetSource;
use crate::{
   config::GoogleConfig,
   error::{Result, SheetsError},
   types::Grid,
};

#[derive(Debug, Clone)]
enum Credentials {
   Bearer(String),
   ApiKey(String),
   None,
}

/// Spreadsheet client built once at startup and shared by every run.
#[derive(Debug, Clone)]
pub struct GoogleSheets {
   client:      Client,
   credentials: Credentials,
   api_base:    String,
   export_base: String,
}

#[derive(Deserialize)]
struct ValueRange {
   #[serde(default)]
   values: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct ValueUpdate<'a> {
   values: &'a Grid,
}

fn cell_text(value: serde_json::Value) -> String {
   match value {
      serde_json::Value::String(s) => s,
      serde_json::Value::Null => String::new(),
      other => other.to_string(),
   }
}

impl GoogleSheets {
   pub fn new(config: &GoogleConfig, timeout: Duration) -> Result<Self, SheetsError> {
      let client = Client::builder().timeout(timeout).build()?;
      let credentials = match (&config.access_token, &config.api_key) {
         (Some(token), _) if !token.is_empty() => Credentials::Bearer(token.clone()),
         (_, Some(key)) if !key.is_empty() => Credentials::ApiKey(key.clone()),
         _ => Credentials::None,
      };
      Ok(Self {
         client,
         credentials,
         api_base: config.api_base_url.trim_end_matches('/').to_string(),
         export_base: config.export_base_url.trim_end_matches('/').to_string(),
      })
   }

   pub const fn can_read(&self) -> bool {
      !matches!(self.credentials, Credentials::None)
   }

   pub const fn can_write(&self) -> bool {
      matches!(self.credentials, Credentials::Bearer(_))
   }

   fn url(base: &str, segments: &[&str]) -> Result<Url, SheetsError> {
      let mut url = Url::parse(base).map_err(|e| SheetsError::InvalidUrl(format!("{base}: {e}")))?;
      url.path_segments_mut()
         .map_err(|()| SheetsError::InvalidUrl(base.to_string()))?
         .extend(segments);
      Ok(url)
   }

   fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, SheetsError> {
      Self::url(&self.api_base, &[spreadsheet_id, "values", range])
   }

   fn authorize(&self, request: RequestBuilder, write: bool) -> Result<RequestBuilder, SheetsError> {
      match &self.credentials {
         Credentials::Bearer(token) => Ok(request.bearer_auth(token)),
         Credentials::ApiKey(key) if !write => Ok(request.query(&[("key", key)])),
         _ => Err(SheetsError::NotConfigured),
      }
   }

   async fn send(request: RequestBuilder) -> Result<reqwest::Response, SheetsError> {
      let response = request.send().await?;
      let status = response.status();
      if !status.is_success() {
         return Err(SheetsError::StatusCode(status.as_u16()));
      }
      Ok(response)
   }
}

#[async_trait::async_trait]
impl SheetSource for GoogleSheets {
   async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Grid, SheetsError> {
      let url = self.values_url(spreadsheet_id, range)?;
      let request = self.authorize(self.client.get(url), false)?;
      let body: ValueRange = Self::send(request).await?.json().await?;
      Ok(body
         .values
         .into_iter()
         .map(|row| row.into_iter().map(cell_text).collect())
         .collect())
   }

   async fn get_csv(&self, spreadsheet_id: &str, tab: &str) -> Result<String, SheetsError> {
      let url = Self::url(&self.export_base, &[spreadsheet_id, "gviz", "tq"])?;
      let request = self.client.get(url).query(&[("tqx", "out:csv"), ("sheet", tab)]);
      Ok(Self::send(request).await?.text().await?)
   }

   async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsError> {
      let url = Self::url(&self.api_base, &[spreadsheet_id, "values", &format!("{range}:clear")])?;
      let request = self.authorize(self.client.post(url), true)?;
      Self::send(request.json(&serde_json::json!({}))).await?;
      Ok(())
   }

   async fn update_values(
      &self,
      spreadsheet_id: &str,
      range: &str,
      rows: &Grid,
   ) -> Result<(), SheetsError> {
      let url = self.values_url(spreadsheet_id, range)?;
      let request = self
         .authorize(self.client.put(url), true)?
         .query(&[("valueInputOption", "RAW")])
         .json(&ValueUpdate { values: rows });
      Self::send(request).await?;
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn client(token: Option<&str>, key: Option<&str>) -> GoogleSheets {
      let config = GoogleConfig {
         access_token: token.map(str::to_string),
         api_key: key.map(str::to_string),
         ..GoogleConfig::default()
      };
      GoogleSheets::new(&config, Duration::from_secs(1)).unwrap()
   }

   #[test]
   fn credentials_decide_read_and_write_access() {
      let anon = client(None, None);
      assert!(!anon.can_read() && !anon.can_write());

      let key = client(None, Some("k"));
      assert!(key.can_read() && !key.can_write());

      let token = client(Some("t"), Some("k"));
      assert!(token.can_read() && token.can_write());
   }

   #[test]
   fn values_url_encodes_range() {
      let sheets = client(None, None);
      let url = sheets.values_url("abc", "My Tab!A:K").unwrap();
      assert_eq!(
         url.as_str(),
         "https://sheets.googleapis.com/v4/spreadsheets/abc/values/My%20Tab!A:K"
      );
   }

   #[tokio::test]
   async fn reads_without_credentials_are_not_configured() {
      let sheets = client(None, None);
      let err = sheets.get_values("abc", "output!A:K").await.unwrap_err();
      assert!(matches!(err, SheetsError::NotConfigured));
   }
}
