/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use rust_td_collector::merge::{Dataset, MergeOutcome};
use rust_td_collector::models::{FlatOrderRecord, StaffListRequest};
use rust_td_collector::signing::{sanitize_json, Signer};
use rust_td_collector::table::{column_index, column_letters, A1Range, Table};

fn record(order_id: &str, updated: String, status: &str) -> FlatOrderRecord {
    FlatOrderRecord {
        updated_date: Some(updated),
        status: Some(status.to_string()),
        ..FlatOrderRecord::new(order_id)
    }
}

fn day(offset: u32) -> String {
    let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        + chrono::Duration::days(i64::from(offset));
    date.format("%Y-%m-%d %H:%M:%S").to_string()
}

// Property: signatures are a pure function of method, path and body
proptest! {
    #[test]
    fn signcode_is_deterministic(page_size in 1usize..500, page_num in 1u32..1000, path in "/[a-z]{1,12}/[a-zA-Z]{1,16}") {
        let signer = Signer::new("32BytesString");
        let body = StaffListRequest { page_size, page_num };
        let first = signer.signcode("post", &path, &body).unwrap();
        let second = signer.signcode("POST", &path, &body).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), 64);
        prop_assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signcode_changes_with_page(page_size in 1usize..500, page_num in 1u32..1000) {
        let signer = Signer::new("32BytesString");
        let a = signer.signcode("post", "/saleschannel/qryStaffList", &StaffListRequest { page_size, page_num }).unwrap();
        let b = signer.signcode("post", "/saleschannel/qryStaffList", &StaffListRequest { page_size, page_num: page_num + 1 }).unwrap();
        prop_assert_ne!(a, b);
    }

    #[test]
    fn signcode_changes_with_secret(secret in "[A-Za-z0-9]{1,32}") {
        prop_assume!(secret != "32BytesString");
        let body = StaffListRequest { page_size: 50, page_num: 1 };
        let a = Signer::new("32BytesString").signcode("post", "/p", &body).unwrap();
        let b = Signer::new(secret).signcode("post", "/p", &body).unwrap();
        prop_assert_ne!(a, b);
    }

    #[test]
    fn sanitized_json_is_alphanumeric(json in "\\PC*") {
        prop_assert!(sanitize_json(&json).chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

// Property: the merge keeps the strictly newer record per order id
proptest! {
    #[test]
    fn merge_is_last_writer_wins(stored in 0u32..365, incoming in 0u32..365) {
        let mut dataset = Dataset::new();
        dataset.upsert(record("X", day(stored), "STORED"));
        let outcome = dataset.upsert(record("X", day(incoming), "INCOMING"));

        let kept = dataset.get("X").unwrap();
        if incoming > stored {
            prop_assert_eq!(outcome, MergeOutcome::Updated);
            prop_assert_eq!(kept.status.as_deref(), Some("INCOMING"));
        } else {
            prop_assert_eq!(outcome, MergeOutcome::Kept);
            prop_assert_eq!(kept.status.as_deref(), Some("STORED"));
        }
        prop_assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn merge_result_is_unique_per_order(ids in proptest::collection::vec(0u8..20, 0..60)) {
        let dataset: Dataset = ids
            .iter()
            .enumerate()
            .map(|(i, id)| record(&id.to_string(), day(i as u32), "S"))
            .collect();

        let mut distinct = ids.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(dataset.len(), distinct.len());
    }

    #[test]
    fn sheet_table_reload_keeps_records(ids in proptest::collection::btree_set("[0-9]{6,16}", 0..20)) {
        let dataset: Dataset = ids.iter().map(|id| record(id, day(1), "S")).collect();
        let reloaded = Dataset::from_table(&Table::from_values(dataset.to_table().to_values()));
        prop_assert_eq!(reloaded.records(), dataset.records());
    }
}

// Property: A1 columns are bijective base-26
proptest! {
    #[test]
    fn column_letters_round_trip(index in 1u32..=18_278) {
        let letters = column_letters(index);
        prop_assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
        prop_assert_eq!(column_index(&letters), Some(index));
    }

    #[test]
    fn block_spans_requested_shape(start_row in 1u32..1000, offset in 0u32..1000, rows in 1u32..500, cols in 1u32..60) {
        let range = A1Range::parse(&format!("Sheet1!A{}", start_row)).unwrap();
        let block = range.block(offset, rows, cols);
        let expected = format!(
            "Sheet1!A{}:{}{}",
            start_row + offset,
            column_letters(cols),
            start_row + offset + rows - 1
        );
        prop_assert_eq!(block, expected);
    }

    #[test]
    fn range_parsing_never_panics(range in "\\PC*") {
        let _ = A1Range::parse(&range);
    }
}
