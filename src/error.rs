use std::io;

use thiserror::Error;

use crate::types::TenantId;

/// Main error type for the sheetsync application.
///
/// This enum represents all possible errors that can occur throughout the
/// application, including I/O, storage, spreadsheet access, configuration,
/// and the tenant-level conditions the reconciler surfaces to its callers.
#[derive(Debug, Error)]
pub enum Error {
   /// I/O error occurred during file or network operations.
   #[error("io error: {0}")]
   Io(#[from] io::Error),

   /// Error occurred in the SQL store.
   #[error("store error: {0}")]
   Store(#[from] sqlx::Error),

   /// Spreadsheet API or export request failed.
   #[error("sheets error: {0}")]
   Sheets(#[from] SheetsError),

   /// Configuration-related error occurred.
   #[error("config error: {0}")]
   Config(#[from] ConfigError),

   /// JSON serialization or deserialization error occurred.
   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   /// Both the authenticated API and the public CSV export failed.
   #[error("source unreachable: {reason}")]
   SourceUnreachable { reason: String },

   /// The header row no longer matches the column offsets of the schema.
   #[error(
      "header mismatch in {schema} schema at column {column}: expected '{expected}', found \
       '{found}'"
   )]
   HeaderMismatch { schema: &'static str, column: usize, expected: &'static str, found: String },

   /// The tenant id does not exist in the tenant directory.
   #[error("unknown tenant: {0}")]
   UnknownTenant(TenantId),

   /// The tenant has no spreadsheet configured for the requested vertical.
   #[error("not configured: {0}")]
   NotConfigured(String),

   /// Another reconciliation for the same tenant is running.
   #[error("sync already in progress for tenant {0} (busy)")]
   SyncInProgress(TenantId),

   /// Error already reported to the user (e.g., JSON output emitted).
   #[error("{message}")]
   Reported { message: String, exit_code: i32 },
}

/// Exit code of a run that could not reach the sheet.
pub const SOURCE_UNREACHABLE_EXIT: i32 = 11;

impl Error {
   pub const fn exit_code(&self) -> i32 {
      match self {
         Self::Reported { exit_code, .. } => *exit_code,
         Self::SyncInProgress(_) => 10,
         Self::SourceUnreachable { .. } => SOURCE_UNREACHABLE_EXIT,
         Self::HeaderMismatch { .. } => 12,
         Self::NotConfigured(_) | Self::UnknownTenant(_) => 13,
         _ => 1,
      }
   }
}

/// Errors that can occur while talking to the spreadsheet provider.
#[derive(Debug, Error)]
pub enum SheetsError {
   /// No credentials are configured for the authenticated API.
   #[error("authenticated sheets access is not configured")]
   NotConfigured,

   /// HTTP request failed (network error, timeout, etc.).
   #[error("request failed: {0}")]
   Request(#[from] reqwest::Error),

   /// Received an invalid or unexpected HTTP status code.
   #[error("invalid status code: {0}")]
   StatusCode(u16),

   /// The request URL could not be built from the spreadsheet id or range.
   #[error("invalid url: {0}")]
   InvalidUrl(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
   /// Config value is out of range or malformed.
   #[error("invalid config: {0}")]
   Invalid(String),

   /// Figment failed to merge or extract the layered config.
   #[error("failed to load config: {0}")]
   Load(#[from] Box<figment::Error>),
}

/// Standard result type using [`enum@Error`] as the default error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
