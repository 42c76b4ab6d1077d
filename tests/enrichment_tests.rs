/// Unit tests for enrichment logic
/// Maps portal order details onto flat rows using JSON fixtures
use rust_td_collector::enrichment::{flatten_order, residential_voice_number};
use rust_td_collector::models::{FlatOrderRecord, OrderDetail, OrderSummary, Staff};
use serde_json::json;

fn staff() -> Staff {
    Staff {
        staff_id: 621394,
        staff_name: "NURUL AINI".to_string(),
    }
}

fn summary() -> OrderSummary {
    OrderSummary {
        order_id: "2506000073552841".to_string(),
        order_nbr: "1-1234567890".to_string(),
    }
}

fn full_detail() -> OrderDetail {
    serde_json::from_value(json!({
        "orderId": 2506000073552841u64,
        "stateName": "Completed",
        "acceptDate": "2025-06-02 09:15:00",
        "stateDate": "2025-06-09 16:40:12",
        "eventTypeName": "New Registration",
        "orderItemList": [
            {"serviceType": 51, "mainOfferName": "Unifi 500Mbps Bundle"},
            {"serviceType": "79", "accNbr": "nurul@unifi", "acctNbr": 1000123456u64},
            {"serviceType": 80, "prefix": "03", "accNbr": "87654321"},
            {"serviceType": 924, "feeList": [{"priceName": "DMS Basic RM10"}, {"priceName": "DMS Extra"}]},
            {"serviceType": 888, "offerInstList": [
                {"offerType": "1", "offerName": "Base Plan"},
                {"offerType": 4, "offerName": "Cloud Storage 1TB"}
            ]},
            {"serviceType": 15, "mainOfferName": "Uni5G Postpaid 99"},
            {"serviceType": 999, "mainOfferName": "Ignored"}
        ],
        "installationInfoList": [{
            "custContactDto": {
                "contactName": "Ahmad",
                "email": "ahmad@example.com",
                "contactNbr": "0123456789"
            },
            "appointmentInfo": {
                "appointmentStartTime": "2025-06-05 09:00:00",
                "appointmentEndTime": "2025-06-05 12:00:00"
            },
            "displayAddress": "12 Jalan Ampang, 50450 Kuala Lumpur"
        }],
        "custInfo": {
            "custName": "Ahmad Bin Ismail",
            "certTypeName": "MyKad",
            "certNbr": "850101-10-1234"
        }
    }))
    .unwrap()
}

#[cfg(test)]
mod field_mapping_tests {
    use super::*;

    #[test]
    fn test_full_order_maps_every_column() {
        let record = flatten_order(&staff(), &summary(), &full_detail());

        assert_eq!(record.order_id, "2506000073552841");
        assert_eq!(record.staff_name.as_deref(), Some("NURUL AINI"));
        assert_eq!(record.status.as_deref(), Some("Completed"));
        assert_eq!(record.created_date.as_deref(), Some("2025-06-02 09:15:00"));
        assert_eq!(record.updated_date.as_deref(), Some("2025-06-09 16:40:12"));
        assert_eq!(record.installation_contact_name.as_deref(), Some("Ahmad"));
        assert_eq!(record.installation_contact_email.as_deref(), Some("ahmad@example.com"));
        assert_eq!(record.installation_contact_phone.as_deref(), Some("0123456789"));
        assert_eq!(record.installation_start_time.as_deref(), Some("2025-06-05 09:00:00"));
        assert_eq!(record.installation_end_time.as_deref(), Some("2025-06-05 12:00:00"));
        assert_eq!(
            record.installation_address.as_deref(),
            Some("12 Jalan Ampang, 50450 Kuala Lumpur")
        );
        assert_eq!(record.customer_name.as_deref(), Some("Ahmad Bin Ismail"));
        assert_eq!(record.customer_id_type.as_deref(), Some("MyKad"));
        assert_eq!(record.customer_id.as_deref(), Some("850101-10-1234"));
        assert_eq!(record.bundle_name.as_deref(), Some("Unifi 500Mbps Bundle"));
        assert_eq!(record.tm_account_id.as_deref(), Some("nurul@unifi"));
        assert_eq!(record.account_nbr.as_deref(), Some("1000123456"));
        assert_eq!(record.residential_number.as_deref(), Some("0387654321"));
        assert_eq!(record.event_type_name.as_deref(), Some("New Registration"));
        assert_eq!(record.dms_item.as_deref(), Some("DMS Basic RM10"));
        assert_eq!(record.cloud_storage_item.as_deref(), Some("Cloud Storage 1TB"));
        assert_eq!(record.uni5g_items.as_deref(), Some("Uni5G Postpaid 99"));
    }

    #[test]
    fn test_cells_follow_column_order() {
        let record = flatten_order(&staff(), &summary(), &full_detail());
        let cells = record.to_cells();

        assert_eq!(cells.len(), FlatOrderRecord::COLUMNS.len());
        assert_eq!(cells[0], "2506000073552841");
        assert_eq!(cells[1], "NURUL AINI");
        assert_eq!(cells[14], "Unifi 500Mbps Bundle");
        assert_eq!(cells[21], "Uni5G Postpaid 99");
    }
}

#[cfg(test)]
mod missing_data_tests {
    use super::*;

    #[test]
    fn test_empty_detail_keeps_summary_id_and_staff() {
        let detail: OrderDetail = serde_json::from_value(json!({})).unwrap();
        let record = flatten_order(&staff(), &summary(), &detail);

        assert_eq!(record.order_id, "2506000073552841");
        assert_eq!(record.staff_name.as_deref(), Some("NURUL AINI"));
        assert_eq!(record.status, None);
        assert_eq!(record.installation_address, None);
        assert_eq!(record.bundle_name, None);
        assert_eq!(record.customer_name, None);
    }

    #[test]
    fn test_null_lists_and_objects_are_absent() {
        let detail: OrderDetail = serde_json::from_value(json!({
            "orderId": "2506000073552841",
            "stateName": null,
            "orderItemList": null,
            "installationInfoList": null,
            "custInfo": null
        }))
        .unwrap();
        let record = flatten_order(&staff(), &summary(), &detail);

        assert_eq!(record.status, None);
        assert_eq!(record.tm_account_id, None);
        assert_eq!(record.customer_id, None);
    }

    #[test]
    fn test_installation_without_contact() {
        let detail: OrderDetail = serde_json::from_value(json!({
            "installationInfoList": [{"displayAddress": "Lot 5, Shah Alam"}]
        }))
        .unwrap();
        let record = flatten_order(&staff(), &summary(), &detail);

        assert_eq!(record.installation_address.as_deref(), Some("Lot 5, Shah Alam"));
        assert_eq!(record.installation_contact_name, None);
        assert_eq!(record.installation_start_time, None);
    }

    #[test]
    fn test_multiple_installations_use_first() {
        let detail: OrderDetail = serde_json::from_value(json!({
            "installationInfoList": [
                {"displayAddress": "First"},
                {"displayAddress": "Second"}
            ]
        }))
        .unwrap();
        let record = flatten_order(&staff(), &summary(), &detail);

        assert_eq!(record.installation_address.as_deref(), Some("First"));
    }

    #[test]
    fn test_voice_number_without_prefix_is_absent() {
        let detail: OrderDetail = serde_json::from_value(json!({
            "orderItemList": [{"serviceType": 80, "accNbr": "87654321"}]
        }))
        .unwrap();
        let voice = detail.order_item_list.first().unwrap();

        assert_eq!(residential_voice_number(voice), None);
    }

    #[test]
    fn test_cloud_storage_without_offer_type_four() {
        let detail: OrderDetail = serde_json::from_value(json!({
            "orderItemList": [{"serviceType": 888, "offerInstList": [{"offerType": "1", "offerName": "Base"}]}]
        }))
        .unwrap();
        let record = flatten_order(&staff(), &summary(), &detail);

        assert_eq!(record.cloud_storage_item, None);
    }
}
