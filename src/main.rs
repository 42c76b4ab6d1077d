use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_td_collector::collector::{self, Destination, Source, YearMonth};
use rust_td_collector::config::Config;
use rust_td_collector::portal_client::PortalClient;
use rust_td_collector::sheets::SheetStore;
use rust_td_collector::workbook::{WorkbookStore, HISTORICAL_FILE, ONGOING_FILE};

#[derive(Debug, Parser)]
#[command(name = "td-collector", version, about = "Collects dealer-portal sales orders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download one month of orders into a workbook or the spreadsheet.
    DownloadData {
        #[arg(long, value_enum, default_value_t = SourceArg::Historical)]
        source: SourceArg,
        /// Month as YYYYMM. Defaults to the current month.
        #[arg(long)]
        yearmonth: Option<String>,
        /// Merge into the configured Google Sheet instead of a local file.
        #[arg(long)]
        gsheet: bool,
        /// Merge over the existing local workbook.
        #[arg(long)]
        merge: bool,
    },
    /// Export all in-progress orders to ongoing.xlsx.
    Ongoing,
    /// Export completed orders of a month to historical.xlsx.
    Historical { year: i32, month: u32 },
    /// Log the staff count on a fixed interval.
    PollStaff {
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
    /// List staff, optionally filtered by name prefix.
    Staff {
        #[arg(long)]
        name_prefix: Option<String>,
    },
    /// Print the raw staff detail record.
    StaffDetail { staff_id: i64 },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Ongoing,
    Historical,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Ongoing => Source::Ongoing,
            SourceArg::Historical => Source::Historical,
        }
    }
}

/// Main entry point for the collector.
///
/// Initializes logging, loads configuration from the environment and runs
/// the selected command to completion.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_td_collector=info,td_collector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    let client = PortalClient::new(&config)?;

    match cli.command {
        Command::DownloadData {
            source,
            yearmonth,
            gsheet,
            merge,
        } => {
            let month = match yearmonth {
                Some(raw) => YearMonth::parse(&raw)?,
                None => YearMonth::current()?,
            };
            if gsheet {
                let sheet = SheetStore::new(&config.sheets)?;
                collector::download_data(&client, source.into(), month, Destination::Sheet(&sheet))
                    .await?;
            } else {
                let store = WorkbookStore::for_month(&month.label());
                collector::download_data(
                    &client,
                    source.into(),
                    month,
                    Destination::Workbook { store, merge },
                )
                .await?;
            }
        }
        Command::Ongoing => {
            collector::ongoing(&client, &WorkbookStore::new(ONGOING_FILE)).await?;
        }
        Command::Historical { year, month } => {
            let month = YearMonth::new(year, month)?;
            collector::historical(&client, month, &WorkbookStore::new(HISTORICAL_FILE)).await?;
        }
        Command::PollStaff { interval_secs } => {
            if let Err(e) =
                collector::poll_staff(&client, Duration::from_secs(interval_secs)).await
            {
                tracing::error!("Staff polling stopped: {}", e);
                std::process::exit(1);
            }
        }
        Command::Staff { name_prefix } => {
            let staffs = collector::list_staff(&client, name_prefix.as_deref()).await?;
            for staff in &staffs {
                println!("{}\t{}", staff.staff_id, staff.staff_name);
            }
            tracing::info!("Total staffs: {}", staffs.len());
        }
        Command::StaffDetail { staff_id } => {
            let detail = collector::staff_detail(&client, staff_id).await?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
    }

    Ok(())
}
