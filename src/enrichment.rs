/// Order enrichment: detail lookup plus flattening into a sheet row.
///
/// 1. Fetch the order detail (retried and rate limited by the client)
/// 2. Pick one line item per known service type
/// 3. Pick the installation entry
/// 4. Map everything onto a `FlatOrderRecord`
use crate::errors::{AppError, ResultExt};
use crate::models::{FlatOrderRecord, OrderDetail, OrderItem, OrderSummary, ServiceType, Staff};
use crate::portal_client::PortalClient;

/// Offer type of the cloud storage add-on inside `offerInstList`.
const CLOUD_STORAGE_OFFER_TYPE: &str = "4";

/// Fetches the detail of `order` and flattens it.
///
/// Failures are logged with the staff member and order id and returned with
/// that context; the caller decides whether the run continues.
pub async fn process_order(
    client: &PortalClient,
    staff: &Staff,
    order: &OrderSummary,
) -> Result<FlatOrderRecord, AppError> {
    let result = client.order_detail(order).await;
    match result {
        Ok(detail) => Ok(flatten_order(staff, order, &detail)),
        Err(e) => {
            tracing::error!(
                "Failed to process order {} for {} ({}): {}",
                order.order_id,
                staff.staff_name,
                staff.staff_id,
                e
            );
            Err(e).with_context(|| {
                format!(
                    "order {} of staff {} ({})",
                    order.order_id, staff.staff_name, staff.staff_id
                )
            })
        }
    }
}

/// Maps an order detail onto the flat row. Pure; absent data stays `None`.
pub fn flatten_order(staff: &Staff, order: &OrderSummary, detail: &OrderDetail) -> FlatOrderRecord {
    if detail.installation_info_list.len() != 1 {
        tracing::warn!(
            "No installation possible for {} - {} ({} installation entries)",
            staff.staff_name,
            detail.order_id.as_deref().unwrap_or(&order.order_id),
            detail.installation_info_list.len()
        );
    }

    let installation = detail.installation();
    let contact = installation.and_then(|i| i.cust_contact_dto.as_ref());
    let appointment = installation.and_then(|i| i.appointment_info.as_ref());
    let customer = detail.cust_info.as_ref();

    let internet = detail.item(ServiceType::Internet);

    FlatOrderRecord {
        order_id: detail
            .order_id
            .clone()
            .unwrap_or_else(|| order.order_id.clone()),
        staff_name: Some(staff.staff_name.clone()).filter(|name| !name.is_empty()),
        status: detail.state_name.clone(),
        created_date: detail.accept_date.clone(),
        updated_date: detail.state_date.clone(),
        installation_contact_name: contact.and_then(|c| c.contact_name.clone()),
        installation_contact_email: contact.and_then(|c| c.email.clone()),
        installation_contact_phone: contact.and_then(|c| c.contact_nbr.clone()),
        installation_start_time: appointment.and_then(|a| a.appointment_start_time.clone()),
        installation_end_time: appointment.and_then(|a| a.appointment_end_time.clone()),
        installation_address: installation.and_then(|i| i.display_address.clone()),
        customer_name: customer.and_then(|c| c.cust_name.clone()),
        customer_id_type: customer.and_then(|c| c.cert_type_name.clone()),
        customer_id: customer.and_then(|c| c.cert_nbr.clone()),
        bundle_name: detail
            .item(ServiceType::Bundle)
            .and_then(|i| i.main_offer_name.clone()),
        tm_account_id: internet.and_then(|i| i.acc_nbr.clone()),
        account_nbr: internet.and_then(|i| i.acct_nbr.clone()),
        residential_number: detail
            .item(ServiceType::ResidentialVoice)
            .and_then(residential_voice_number),
        event_type_name: detail.event_type_name.clone(),
        dms_item: detail.item(ServiceType::Dms).and_then(dms_fee_name),
        cloud_storage_item: detail
            .item(ServiceType::CloudStorage)
            .and_then(cloud_storage_offer_name),
        uni5g_items: detail
            .item(ServiceType::Uni5g)
            .and_then(|i| i.main_offer_name.clone()),
    }
}

/// `prefix + accNbr`, only when both are present.
pub fn residential_voice_number(item: &OrderItem) -> Option<String> {
    match (&item.prefix, &item.acc_nbr) {
        (Some(prefix), Some(acc_nbr)) => Some(format!("{}{}", prefix, acc_nbr)),
        _ => None,
    }
}

fn dms_fee_name(item: &OrderItem) -> Option<String> {
    item.fee_list.first().and_then(|fee| fee.price_name.clone())
}

fn cloud_storage_offer_name(item: &OrderItem) -> Option<String> {
    item.offer_inst_list
        .iter()
        .find(|offer| offer.offer_type.as_deref() == Some(CLOUD_STORAGE_OFFER_TYPE))
        .and_then(|offer| offer.offer_name.clone())
}
