use clap::{Parser, Subcommand};
use sheetsync::{Error, Result, cmd, types::Vertical};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the sheetsync application
#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Mirror tenant Google Sheets into the dashboard database")]
#[command(version)]
struct Cli {
   #[command(subcommand)]
   command: Cmd,
}

/// Available subcommands for sheetsync
#[derive(Subcommand)]
enum Cmd {
   #[command(about = "Reconcile a tenant's sheet into local records")]
   Sync {
      #[command(subcommand)]
      vertical: SyncTarget,
   },

   #[command(about = "Show dashboard analytics for a tenant")]
   Analytics {
      #[arg(help = "Tenant id", required_unless_present = "all")]
      tenant: Option<i64>,

      #[arg(long, conflicts_with = "tenant", help = "Cached counters for every tenant")]
      all: bool,

      #[arg(long, help = "Read the cached counters without fetching the sheet")]
      cached: bool,

      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Write local records back to the tenant's sheet")]
   Export {
      #[command(subcommand)]
      vertical: ExportTarget,
   },

   #[command(about = "Manage tenants")]
   Tenant {
      #[command(subcommand)]
      action: TenantCmd,
   },

   #[command(about = "Run the HTTP API")]
   Serve {
      #[arg(short, long, env = "SHEETSYNC_PORT", help = "Port to listen on")]
      port: Option<u16>,
   },
}

#[derive(clap::Args)]
struct TargetArgs {
   #[arg(help = "Tenant id")]
   tenant: i64,

   #[arg(long, help = "Spreadsheet id (default: tenant sheet URL, then config)")]
   spreadsheet_id: Option<String>,

   #[arg(long, help = "Tab name (default: from config)")]
   tab: Option<String>,
}

#[derive(Subcommand)]
enum SyncTarget {
   #[command(about = "Recruiting candidates")]
   Candidates {
      #[command(flatten)]
      target: TargetArgs,

      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Insurance customers")]
   Insurance {
      #[command(flatten)]
      target: TargetArgs,

      #[arg(long, help = "JSON output")]
      json: bool,
   },
}

#[derive(Subcommand)]
enum ExportTarget {
   #[command(about = "Insurance customers")]
   Insurance {
      #[command(flatten)]
      target: TargetArgs,

      #[arg(long, help = "Print CSV instead of writing to the sheet")]
      csv: bool,
   },
}

#[derive(Subcommand)]
enum TenantCmd {
   #[command(about = "Register a tenant")]
   Add {
      #[arg(help = "Tenant email (selects the insurance sheet layout)")]
      email: String,

      #[arg(long, help = "Display name")]
      name: Option<String>,

      #[arg(long, help = "Google Sheet URL")]
      sheet_url: Option<String>,
   },

   #[command(about = "List tenants")]
   List {
      #[arg(long, help = "JSON output")]
      json: bool,
   },
}

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
      .init();

   let cli = Cli::parse();
   if let Err(err) = run(cli).await {
      if !matches!(err, Error::Reported { .. }) {
         eprintln!("{err}");
      }
      std::process::exit(err.exit_code());
   }
}

async fn run(cli: Cli) -> Result<()> {
   match cli.command {
      Cmd::Sync { vertical: SyncTarget::Candidates { target, json } } => {
         cmd::sync::execute(
            Vertical::Recruiting,
            target.tenant,
            target.spreadsheet_id,
            target.tab,
            json,
         )
         .await
      },
      Cmd::Sync { vertical: SyncTarget::Insurance { target, json } } => {
         cmd::sync::execute(
            Vertical::Insurance,
            target.tenant,
            target.spreadsheet_id,
            target.tab,
            json,
         )
         .await
      },
      Cmd::Analytics { tenant: None, json, .. } => cmd::analytics::overview(json).await,
      Cmd::Analytics { tenant: Some(tenant), cached, json, .. } => {
         cmd::analytics::execute(tenant, cached, json).await
      },
      Cmd::Export { vertical: ExportTarget::Insurance { target, csv } } => {
         cmd::export::execute(target.tenant, csv, target.spreadsheet_id, target.tab).await
      },
      Cmd::Tenant { action: TenantCmd::Add { email, name, sheet_url } } => {
         cmd::tenant::add(email, name, sheet_url).await
      },
      Cmd::Tenant { action: TenantCmd::List { json } } => cmd::tenant::list(json).await,
      Cmd::Serve { port } => cmd::serve::execute(port).await,
   }
}
