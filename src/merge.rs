//! Incremental merge of freshly fetched orders into a stored dataset.
//!
//! Last writer wins on `updated_date`. The comparison trusts the
//! portal-reported timestamp; a stale, missing or unparseable timestamp on
//! either side keeps the stored row.

use crate::models::FlatOrderRecord;
use crate::table::Table;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// What `Dataset::upsert` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Kept,
}

/// Where an output column takes its cells from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    /// Index into [`FlatOrderRecord::COLUMNS`].
    Field(usize),
    /// Index into a row's carried-over cells.
    Extra(usize),
}

/// Ordered collection of records, unique by `order_id`.
///
/// A dataset loaded from a table keeps that table's column layout. Columns
/// the record type does not know are carried through per row, and known
/// columns missing from the stored header are appended after it.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<FlatOrderRecord>,
    extras: Vec<Vec<String>>,
    columns: Vec<Column>,
    extra_names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            extras: Vec::new(),
            columns: (0..FlatOrderRecord::COLUMNS.len()).map(Column::Field).collect(),
            extra_names: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads stored rows. Rows without an order id are skipped; a repeated
    /// id is merged like any other incoming record.
    pub fn from_table(table: &Table) -> Self {
        let mut columns = Vec::with_capacity(table.header.len());
        let mut extra_names = Vec::new();
        let mut extra_positions = Vec::new();
        for (pos, name) in table.header.iter().enumerate() {
            let field = FlatOrderRecord::COLUMNS.iter().position(|c| c == name);
            match field {
                Some(i) if !columns.contains(&Column::Field(i)) => columns.push(Column::Field(i)),
                _ => {
                    columns.push(Column::Extra(extra_names.len()));
                    extra_names.push(name.clone());
                    extra_positions.push(pos);
                }
            }
        }
        for i in 0..FlatOrderRecord::COLUMNS.len() {
            if !columns.contains(&Column::Field(i)) {
                columns.push(Column::Field(i));
            }
        }

        let mut dataset = Self {
            columns,
            extra_names,
            ..Self::default()
        };
        let mut skipped = 0usize;
        for row in &table.rows {
            match FlatOrderRecord::from_cells(&table.header, row) {
                Some(record) => {
                    let extras = extra_positions
                        .iter()
                        .map(|&pos| row.get(pos).cloned().unwrap_or_default())
                        .collect();
                    dataset.upsert_with_extras(record, extras);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} stored rows without an order_id", skipped);
        }
        dataset
    }

    /// Header in output order, then one row per record.
    pub fn to_table(&self) -> Table {
        let header = self
            .columns
            .iter()
            .map(|column| match *column {
                Column::Field(i) => FlatOrderRecord::COLUMNS[i].to_string(),
                Column::Extra(j) => self.extra_names[j].clone(),
            })
            .collect();
        let rows = self
            .records
            .iter()
            .zip(&self.extras)
            .map(|(record, extras)| {
                let cells = record.to_cells();
                self.columns
                    .iter()
                    .map(|column| match *column {
                        Column::Field(i) => cells[i].clone(),
                        Column::Extra(j) => extras[j].clone(),
                    })
                    .collect()
            })
            .collect();
        Table { header, rows }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, order_id: &str) -> Option<&FlatOrderRecord> {
        self.index.get(order_id).map(|&pos| &self.records[pos])
    }

    pub fn records(&self) -> &[FlatOrderRecord] {
        &self.records
    }

    /// Inserts a new key, or updates the stored record when `record` is
    /// strictly newer. Fields `record` leaves unset keep their stored value.
    pub fn upsert(&mut self, record: FlatOrderRecord) -> MergeOutcome {
        let extras = vec![String::new(); self.extra_names.len()];
        self.upsert_with_extras(record, extras)
    }

    fn upsert_with_extras(&mut self, record: FlatOrderRecord, extras: Vec<String>) -> MergeOutcome {
        match self.index.get(&record.order_id) {
            None => {
                self.index.insert(record.order_id.clone(), self.records.len());
                self.records.push(record);
                self.extras.push(extras);
                MergeOutcome::Inserted
            }
            Some(&pos) => {
                let existing = &mut self.records[pos];
                if is_newer(record.updated_date.as_deref(), existing.updated_date.as_deref()) {
                    existing.update_from(&record);
                    MergeOutcome::Updated
                } else {
                    MergeOutcome::Kept
                }
            }
        }
    }
}

impl FromIterator<FlatOrderRecord> for Dataset {
    fn from_iter<I: IntoIterator<Item = FlatOrderRecord>>(iter: I) -> Self {
        let mut dataset = Self::new();
        for record in iter {
            dataset.upsert(record);
        }
        dataset
    }
}

/// True only when both timestamps parse and `candidate` is strictly later.
pub fn is_newer(candidate: Option<&str>, existing: Option<&str>) -> bool {
    match (
        candidate.and_then(parse_timestamp),
        existing.and_then(parse_timestamp),
    ) {
        (Some(new), Some(old)) => new > old,
        _ => false,
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y%m%d%H%M%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

/// Parses the timestamp shapes seen in portal and sheet data.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
