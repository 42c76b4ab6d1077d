use crate::serde_utils::{lenient_i64, lenient_string, null_as_default, required_string};
use serde::{Deserialize, Serialize};

// ============ Portal Requests ============

/// Body of the staff listing call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffListRequest {
    pub page_size: usize,
    pub page_num: u32,
}

/// Body of the order listing call. Field order is part of the signature.
#[derive(Debug, Clone, Serialize)]
pub struct OrderListRequest {
    #[serde(rename = "dPartyCode")]
    pub d_party_code: i64,
    #[serde(rename = "pageSize")]
    pub page_size: usize,
    #[serde(rename = "onWayFlag")]
    pub on_way_flag: OnWayFlag,
    #[serde(rename = "pageNum")]
    pub page_num: u32,
    #[serde(rename = "dPartyType")]
    pub d_party_type: &'static str,
    #[serde(rename = "extData")]
    pub ext_data: ExtData,
    #[serde(rename = "createdDateFrom", skip_serializing_if = "Option::is_none")]
    pub created_date_from: Option<String>,
    #[serde(rename = "createdDateTo", skip_serializing_if = "Option::is_none")]
    pub created_date_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtData {
    pub senario: &'static str,
}

impl Default for ExtData {
    fn default() -> Self {
        Self {
            senario: "esales-monthly-order",
        }
    }
}

/// Body of the order detail call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailRequest {
    pub cust_order_id: String,
    pub cust_order_nbr: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDetailRequest {
    pub staff_id: i64,
}

/// Distinguishes in-progress (`Y`) from completed (`N`) orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OnWayFlag {
    #[serde(rename = "Y")]
    Ongoing,
    #[serde(rename = "N")]
    Completed,
}

/// Optional `createdDate` window, both ends as `YYYYMMDDHHMMSS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub from: String,
    pub to: String,
}

/// Filters for one staff member's order listing.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub staff_id: i64,
    pub on_way: OnWayFlag,
    pub window: Option<DateWindow>,
}

impl OrderFilter {
    pub fn request(&self, page_size: usize, page_num: u32) -> OrderListRequest {
        OrderListRequest {
            d_party_code: self.staff_id,
            page_size,
            on_way_flag: self.on_way,
            page_num,
            d_party_type: "E",
            ext_data: ExtData::default(),
            created_date_from: self.window.as_ref().map(|w| w.from.clone()),
            created_date_to: self.window.as_ref().map(|w| w.to.clone()),
        }
    }
}

// ============ Portal Responses ============

/// A sales agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    #[serde(deserialize_with = "required_i64")]
    pub staff_id: i64,
    #[serde(default)]
    pub staff_name: String,
}

fn required_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    lenient_i64(deserializer)?.ok_or_else(|| serde::de::Error::custom("staffId is null"))
}

/// Listing record for an order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(deserialize_with = "required_string")]
    pub order_id: String,
    #[serde(deserialize_with = "required_string")]
    pub order_nbr: String,
}

/// Full order record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub accept_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub event_type_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_item_list: Vec<OrderItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub installation_info_list: Vec<InstallationInfo>,
    #[serde(default)]
    pub cust_info: Option<CustInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub service_type: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub main_offer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub acc_nbr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub acct_nbr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fee_list: Vec<Fee>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub offer_inst_list: Vec<OfferInst>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    #[serde(default, deserialize_with = "lenient_string")]
    pub price_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferInst {
    #[serde(default, deserialize_with = "lenient_string")]
    pub offer_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub offer_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationInfo {
    #[serde(default)]
    pub cust_contact_dto: Option<ContactInfo>,
    #[serde(default)]
    pub appointment_info: Option<AppointmentInfo>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_nbr: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub appointment_start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub appointment_end_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub cust_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cert_type_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cert_nbr: Option<String>,
}

/// Line-item classification codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Bundle,
    Internet,
    ResidentialVoice,
    Dms,
    CloudStorage,
    Uni5g,
}

impl ServiceType {
    pub fn code(self) -> i64 {
        match self {
            ServiceType::Bundle => 51,
            ServiceType::Internet => 79,
            ServiceType::ResidentialVoice => 80,
            ServiceType::Dms => 924,
            ServiceType::CloudStorage => 888,
            ServiceType::Uni5g => 15,
        }
    }
}

impl OrderDetail {
    /// First line item of the given service type.
    pub fn item(&self, service: ServiceType) -> Option<&OrderItem> {
        self.order_item_list
            .iter()
            .find(|item| item.service_type == Some(service.code()))
    }

    pub fn installation(&self) -> Option<&InstallationInfo> {
        self.installation_info_list.first()
    }
}

// ============ Flattened Rows ============

/// One enriched order, as stored in the sheet or workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatOrderRecord {
    pub order_id: String,
    #[serde(rename = "staffName")]
    pub staff_name: Option<String>,
    pub status: Option<String>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
    pub installation_contact_name: Option<String>,
    pub installation_contact_email: Option<String>,
    pub installation_contact_phone: Option<String>,
    pub installation_start_time: Option<String>,
    pub installation_end_time: Option<String>,
    pub installation_address: Option<String>,
    pub customer_name: Option<String>,
    pub customer_id_type: Option<String>,
    pub customer_id: Option<String>,
    pub bundle_name: Option<String>,
    pub tm_account_id: Option<String>,
    pub account_nbr: Option<String>,
    pub residential_number: Option<String>,
    pub event_type_name: Option<String>,
    pub dms_item: Option<String>,
    pub cloud_storage_item: Option<String>,
    pub uni5g_items: Option<String>,
}

impl FlatOrderRecord {
    /// Persisted column order. `order_id` comes first.
    pub const COLUMNS: [&'static str; 22] = [
        "order_id",
        "staffName",
        "status",
        "created_date",
        "updated_date",
        "installation_contact_name",
        "installation_contact_email",
        "installation_contact_phone",
        "installation_start_time",
        "installation_end_time",
        "installation_address",
        "customer_name",
        "customer_id_type",
        "customer_id",
        "bundle_name",
        "tm_account_id",
        "account_nbr",
        "residential_number",
        "event_type_name",
        "dms_item",
        "cloud_storage_item",
        "uni5g_items",
    ];

    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            ..Self::default()
        }
    }

    fn optional_fields(&self) -> [&Option<String>; 21] {
        [
            &self.staff_name,
            &self.status,
            &self.created_date,
            &self.updated_date,
            &self.installation_contact_name,
            &self.installation_contact_email,
            &self.installation_contact_phone,
            &self.installation_start_time,
            &self.installation_end_time,
            &self.installation_address,
            &self.customer_name,
            &self.customer_id_type,
            &self.customer_id,
            &self.bundle_name,
            &self.tm_account_id,
            &self.account_nbr,
            &self.residential_number,
            &self.event_type_name,
            &self.dms_item,
            &self.cloud_storage_item,
            &self.uni5g_items,
        ]
    }

    fn optional_fields_mut(&mut self) -> [&mut Option<String>; 21] {
        [
            &mut self.staff_name,
            &mut self.status,
            &mut self.created_date,
            &mut self.updated_date,
            &mut self.installation_contact_name,
            &mut self.installation_contact_email,
            &mut self.installation_contact_phone,
            &mut self.installation_start_time,
            &mut self.installation_end_time,
            &mut self.installation_address,
            &mut self.customer_name,
            &mut self.customer_id_type,
            &mut self.customer_id,
            &mut self.bundle_name,
            &mut self.tm_account_id,
            &mut self.account_nbr,
            &mut self.residential_number,
            &mut self.event_type_name,
            &mut self.dms_item,
            &mut self.cloud_storage_item,
            &mut self.uni5g_items,
        ]
    }

    /// Cell values in [`Self::COLUMNS`] order, `None` as empty string.
    pub fn to_cells(&self) -> Vec<String> {
        std::iter::once(self.order_id.clone())
            .chain(
                self.optional_fields()
                    .into_iter()
                    .map(|v| v.clone().unwrap_or_default()),
            )
            .collect()
    }

    /// Reads a row by column name. Unknown columns are ignored and empty
    /// cells become `None`. Returns `None` when no `order_id` cell is set.
    pub fn from_cells(header: &[String], row: &[String]) -> Option<Self> {
        let mut record = Self::default();
        for (name, cell) in header.iter().zip(row) {
            let Some(pos) = Self::COLUMNS.iter().position(|c| c == name) else {
                continue;
            };
            if pos == 0 {
                record.order_id = cell.trim().to_string();
            } else if !cell.is_empty() {
                *record.optional_fields_mut()[pos - 1] = Some(cell.clone());
            }
        }
        (!record.order_id.is_empty()).then_some(record)
    }

    /// Overwrites fields with every value `newer` has set. Unset fields keep
    /// their current values.
    pub fn update_from(&mut self, newer: &FlatOrderRecord) {
        for (slot, value) in self
            .optional_fields_mut()
            .into_iter()
            .zip(newer.optional_fields())
        {
            if value.is_some() {
                *slot = value.clone();
            }
        }
    }
}
