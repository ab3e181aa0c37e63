use std::fmt::Display;

use quickcart_engine::{
    db_types::OrderStatusType,
    order_objects::{OrderQueryFilter, Pagination},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Query parameters for the order search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderSearchParams {
    pub search_text: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<OrderStatusType>,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

impl OrderSearchParams {
    pub fn into_query(self) -> (OrderQueryFilter, Pagination) {
        let filter = OrderQueryFilter {
            search_text: self.search_text,
            customer_id: self.customer_id,
            status: self.status,
        };
        let default = Pagination::default();
        let pagination = Pagination::new(self.page.unwrap_or(default.page), self.size.unwrap_or(default.size));
        (filter, pagination)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusParams {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRemarkParams {
    pub remark: String,
}

/// Request body for the token-issuing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub customer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}
