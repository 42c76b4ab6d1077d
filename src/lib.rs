//! TD Order Collector Library
//!
//! This library provides the building blocks of the dealer-portal order
//! collector: the signed portal client, request pacing and retries,
//! pagination, order enrichment, incremental merging and the spreadsheet
//! and workbook sinks.
//!
//! # Modules
//!
//! - `core`: Domain logic (enrichment, merge, models, errors).
//! - `integrations`: External services (portal, Google Sheets, workbooks).
//! - `collector`: Jobs behind each CLI command.
//! - `config`: Configuration management.
//! - `enrichment`: Flattening of orders into sheet rows.
//! - `errors`: Error handling types.
//! - `merge`: Last-writer-wins merge keyed by order id.
//! - `models`: Portal payloads and the flat record.
//! - `pagination`: Page-by-page fetching.
//! - `portal_client`: Signed dealer-portal API client.
//! - `serde_utils`: Lenient deserializers for portal JSON.
//! - `sheets`: Google Sheets values API sink.
//! - `signing`: Request signature computation.
//! - `table`: Tabular values and A1 ranges.
//! - `throttle`: Rate limiter and retry policy.
//! - `workbook`: Local `.xlsx` sink.

pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and the binary
pub mod collector;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod merge;
pub mod models;
pub mod pagination;
pub mod portal_client;
pub mod serde_utils;
pub mod sheets;
pub mod signing;
pub mod table;
pub mod throttle;
pub mod workbook;
