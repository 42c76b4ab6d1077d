//! Run orchestration behind each CLI command.

use crate::enrichment::process_order;
use crate::errors::{AppError, ResultExt};
use crate::merge::{Dataset, MergeOutcome};
use crate::models::{DateWindow, OnWayFlag, OrderFilter, Staff};
use crate::portal_client::PortalClient;
use crate::sheets::SheetStore;
use crate::workbook::WorkbookStore;
use chrono::{Datelike, Local, NaiveDate};
use serde_json::Value;
use std::time::Duration;

pub const MIN_YEAR: i32 = 2025;
pub const MAX_YEAR: i32 = 2100;

/// Which orders a download covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// In-progress orders, regardless of creation date.
    Ongoing,
    /// Completed orders created within the selected month.
    Historical,
}

/// A validated calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(AppError::InvalidInput(format!(
                "Year must be in between {} and {}",
                MIN_YEAR, MAX_YEAR
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(AppError::InvalidInput(
                "Month must be in between 1 and 12".to_string(),
            ));
        }
        Ok(Self { year, month })
    }

    /// Parses `YYYYMM`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::InvalidInput(
                "Year month must be in YYYYMM format".to_string(),
            ));
        }
        let year = raw[0..4].parse().map_err(|_| {
            AppError::InvalidInput("Year month must be in YYYYMM format".to_string())
        })?;
        let month = raw[4..6].parse().map_err(|_| {
            AppError::InvalidInput("Year month must be in YYYYMM format".to_string())
        })?;
        Self::new(year, month)
    }

    pub fn current() -> Result<Self, AppError> {
        let today = Local::now().date_naive();
        Self::new(today.year(), today.month())
    }

    pub fn label(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    fn last_day(&self) -> u32 {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .map(|d| d.day())
            .unwrap_or(28)
    }

    /// `createdDate` window from the first second to the last second of
    /// the month.
    pub fn window(&self) -> DateWindow {
        let label = self.label();
        DateWindow {
            from: format!("{}01000000", label),
            to: format!("{}{:02}235959", label, self.last_day()),
        }
    }
}

/// Fetches and enriches every order of every staff member.
///
/// Records are upserted into `dataset`, so a stored dataset is merged and
/// a fresh one is deduplicated by order id.
pub async fn collect_orders(
    client: &PortalClient,
    on_way: OnWayFlag,
    window: Option<&DateWindow>,
    dataset: &mut Dataset,
) -> Result<MergeStats, AppError> {
    let staffs = client.all_staff().await?;
    let mut stats = MergeStats::default();

    for (idx, staff) in staffs.iter().enumerate() {
        let filter = OrderFilter {
            staff_id: staff.staff_id,
            on_way,
            window: window.cloned(),
        };
        let orders = client.all_orders(&filter).await?;
        tracing::info!(
            "Progress {}/{}: [{}] {} with order {} counts",
            idx + 1,
            staffs.len(),
            staff.staff_id,
            staff.staff_name,
            orders.len()
        );

        for order in &orders {
            let record = process_order(client, staff, order).await?;
            stats.record(dataset.upsert(record));
        }
    }

    tracing::info!(
        "Merged run: {} inserted, {} updated, {} kept",
        stats.inserted,
        stats.updated,
        stats.kept
    );
    Ok(stats)
}

/// Counts of merge outcomes over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    pub kept: usize,
}

impl MergeStats {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Kept => self.kept += 1,
        }
    }
}

fn source_filter(source: Source, month: YearMonth) -> (OnWayFlag, Option<DateWindow>) {
    match source {
        Source::Ongoing => (OnWayFlag::Ongoing, None),
        Source::Historical => (OnWayFlag::Completed, Some(month.window())),
    }
}

/// Where `download_data` stores its result.
pub enum Destination<'a> {
    /// Merge into the spreadsheet and write it back.
    Sheet(&'a SheetStore),
    /// Export to a workbook, optionally merging over its current content.
    Workbook { store: WorkbookStore, merge: bool },
}

pub async fn download_data(
    client: &PortalClient,
    source: Source,
    month: YearMonth,
    destination: Destination<'_>,
) -> Result<MergeStats, AppError> {
    let (on_way, window) = source_filter(source, month);
    match &window {
        Some(w) => tracing::info!("Downloading data for {:?} from {} to {}", source, w.from, w.to),
        None => tracing::info!("Downloading data for {:?}", source),
    }

    match destination {
        Destination::Sheet(sheet) => {
            let mut dataset = Dataset::from_table(&sheet.read().await?);
            if dataset.is_empty() {
                tracing::info!("Sheet has no stored rows");
            } else {
                tracing::info!("Loaded {} stored rows from sheet", dataset.len());
            }
            let stats = collect_orders(client, on_way, window.as_ref(), &mut dataset).await?;
            sheet.write(&dataset.to_table()).await?;
            Ok(stats)
        }
        Destination::Workbook { store, merge } => {
            let mut dataset = if merge {
                Dataset::from_table(&store.read()?)
            } else {
                Dataset::new()
            };
            let stats = collect_orders(client, on_way, window.as_ref(), &mut dataset).await?;
            store.write(&dataset.to_table())?;
            Ok(stats)
        }
    }
}

/// In-progress orders exported to `store`.
pub async fn ongoing(client: &PortalClient, store: &WorkbookStore) -> Result<MergeStats, AppError> {
    let mut dataset = Dataset::new();
    let stats = collect_orders(client, OnWayFlag::Ongoing, None, &mut dataset).await?;
    store.write(&dataset.to_table())?;
    Ok(stats)
}

/// Completed orders of `month` exported to `store`.
pub async fn historical(
    client: &PortalClient,
    month: YearMonth,
    store: &WorkbookStore,
) -> Result<MergeStats, AppError> {
    let window = month.window();
    tracing::info!("{} -> {}", window.from, window.to);
    let mut dataset = Dataset::new();
    let stats = collect_orders(client, OnWayFlag::Completed, Some(&window), &mut dataset).await?;
    store.write(&dataset.to_table())?;
    Ok(stats)
}

/// Staff whose name starts with `prefix` (all staff when `None`).
pub async fn list_staff(client: &PortalClient, prefix: Option<&str>) -> Result<Vec<Staff>, AppError> {
    let staffs = client.all_staff().await?;
    Ok(match prefix {
        Some(prefix) => staffs
            .into_iter()
            .filter(|s| s.staff_name.starts_with(prefix))
            .collect(),
        None => staffs,
    })
}

/// Raw profile of one staff member.
pub async fn staff_detail(client: &PortalClient, staff_id: i64) -> Result<Value, AppError> {
    client
        .staff_detail(staff_id)
        .await
        .with_context(|| format!("Failed to fetch staff detail for {}", staff_id))
}

/// Logs the staff count every `interval` until a fetch fails.
pub async fn poll_staff(client: &PortalClient, interval: Duration) -> Result<(), AppError> {
    loop {
        match client.all_staff().await {
            Ok(staffs) => tracing::info!("Total staffs detected: {}", staffs.len()),
            Err(e) => {
                tracing::warn!("Staff poll failed: {}", e);
                return Err(e);
            }
        }
        tokio::time::sleep(interval).await;
    }
}
