//! Local `.xlsx` export and read-back.

use crate::errors::AppError;
use crate::table::Table;
use calamine::{open_workbook, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

pub const ONGOING_FILE: &str = "ongoing.xlsx";
pub const HISTORICAL_FILE: &str = "historical.xlsx";

/// A single-sheet workbook on disk.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    path: PathBuf,
}

impl WorkbookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<YYYYMM>.xlsx` for a monthly download.
    pub fn for_month(yearmonth: &str) -> Self {
        Self::new(format!("{}.xlsx", yearmonth))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the first worksheet. A missing file is an empty table.
    pub fn read(&self) -> Result<Table, AppError> {
        if !self.path.exists() {
            tracing::info!("{} does not exist yet", self.path.display());
            return Ok(Table::default());
        }

        let mut workbook: Xlsx<_> = open_workbook(&self.path)?;
        let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
            return Ok(Table::default());
        };
        let range = workbook.worksheet_range(&sheet_name)?;

        let values = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        Ok(Table::from_values(values))
    }

    /// Replaces the file with `table`, header in the first row.
    pub fn write(&self, table: &Table) -> Result<(), AppError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        for (row_idx, row) in table.to_values().iter().enumerate() {
            let row_num = u32::try_from(row_idx)
                .map_err(|_| AppError::Workbook("Too many rows for a worksheet".to_string()))?;
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let col_num = u16::try_from(col_idx)
                    .map_err(|_| AppError::Workbook("Too many columns for a worksheet".to_string()))?;
                worksheet.write_string(row_num, col_num, cell)?;
            }
        }

        workbook.save(&self.path)?;
        tracing::info!("✓ Wrote {} rows to {}", table.rows.len(), self.path.display());
        Ok(())
    }
}
