use crate::config::Config;
use crate::errors::AppError;
use crate::models::{
    OrderDetail, OrderDetailRequest, OrderFilter, OrderSummary, Staff, StaffDetailRequest,
    StaffListRequest,
};
use crate::pagination::paginate;
use crate::signing::Signer;
use crate::throttle::{RateLimiter, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub const ORDER_LIST_PATH: &str = "/cee/order/v2/getCeeOrderList";
pub const ORDER_DETAIL_PATH: &str = "/cee/order/v2/getCeeOrderDetail";
pub const STAFF_DETAIL_PATH: &str = "/saleschannel/getStaffDetail";
pub const STAFF_LIST_PATH: &str = "/saleschannel/qryStaffList";

/// Per-endpoint pacing state.
#[derive(Debug)]
struct Limiters {
    order_list: RateLimiter,
    order_detail: RateLimiter,
    staff_detail: RateLimiter,
    staff_list: RateLimiter,
}

impl Limiters {
    fn per_second(calls_per_second: f64) -> Self {
        Self {
            order_list: RateLimiter::per_second(calls_per_second),
            order_detail: RateLimiter::per_second(calls_per_second),
            staff_detail: RateLimiter::per_second(calls_per_second),
            staff_list: RateLimiter::per_second(calls_per_second),
        }
    }
}

/// Client for the dealer portal's signed REST API.
///
/// Each endpoint has its own rate limiter. The order detail call is also
/// retried on HTTP status errors, with pacing applied on every attempt.
pub struct PortalClient {
    client: reqwest::Client,
    base_url: String,
    cookie: String,
    signer: Signer,
    page_size: usize,
    limiters: Limiters,
    detail_retry: RetryPolicy,
}

impl PortalClient {
    /// Creates a new `PortalClient` from loaded configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create portal client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.portal_base_url.trim_end_matches('/').to_string(),
            cookie: config.cookie.clone(),
            signer: Signer::new(config.sign_secret.clone()),
            page_size: config.page_size,
            limiters: Limiters::per_second(config.calls_per_second),
            detail_retry: RetryPolicy::fixed(config.detail_retry_tries, config.detail_retry_delay),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetches one page of the staff list.
    pub async fn staff_page(&self, page_num: u32) -> Result<Vec<Staff>, AppError> {
        let body = StaffListRequest {
            page_size: self.page_size,
            page_num,
        };
        self.limiters
            .staff_list
            .run(|| self.post_data(STAFF_LIST_PATH, &body))
            .await
    }

    /// Fetches every staff member.
    pub async fn all_staff(&self) -> Result<Vec<Staff>, AppError> {
        paginate(self.page_size, |page_num| self.staff_page(page_num)).await
    }

    /// Fetches one page of a staff member's orders.
    pub async fn order_page(
        &self,
        filter: &OrderFilter,
        page_num: u32,
    ) -> Result<Vec<OrderSummary>, AppError> {
        let body = filter.request(self.page_size, page_num);
        self.limiters
            .order_list
            .run(|| self.post_data(ORDER_LIST_PATH, &body))
            .await
    }

    /// Fetches every order matching `filter`.
    pub async fn all_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, AppError> {
        paginate(self.page_size, |page_num| self.order_page(filter, page_num)).await
    }

    /// Fetches the full record of one order.
    pub async fn order_detail(&self, order: &OrderSummary) -> Result<OrderDetail, AppError> {
        let body = &OrderDetailRequest {
            cust_order_id: order.order_id.clone(),
            cust_order_nbr: order.order_nbr.clone(),
        };
        let limiter = &self.limiters.order_detail;
        self.detail_retry
            .run(
                move || limiter.run(move || self.post_data(ORDER_DETAIL_PATH, body)),
                AppError::is_http_status,
            )
            .await
    }

    /// Fetches a staff member's profile as raw JSON.
    pub async fn staff_detail(&self, staff_id: i64) -> Result<Value, AppError> {
        let body = StaffDetailRequest { staff_id };
        self.limiters
            .staff_detail
            .run(|| self.post_data(STAFF_DETAIL_PATH, &body))
            .await
    }

    /// Signs and posts `body`, returning the envelope's `data` member.
    async fn post_data<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let signcode = self.signer.signcode("post", path, body)?;
        tracing::debug!("POST {}", path);

        let response = self
            .client
            .post(&url)
            .header("Cookie", &self.cookie)
            .header("signcode", signcode)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Portal request to {} failed: {}", path, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read {} response: {}", path, e)))?;

        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let mut envelope: Value = serde_json::from_str(&text)
            .map_err(|e| AppError::Decode(format!("{} returned invalid JSON: {}", path, e)))?;
        let data = match envelope.get_mut("data") {
            Some(data) => data.take(),
            None => return Err(AppError::MissingData(text)),
        };

        serde_json::from_value(data)
            .map_err(|e| AppError::Decode(format!("Unexpected {} payload: {}", path, e)))
    }
}
